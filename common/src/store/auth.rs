use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use crate::error::ApiError;
use crate::{SessionToken, UserId, log, warn_log};
use super::{KeyValueStore, StoreSettings, simulate_latency};

pub const SESSION_KEY: &str = "snake_user";

const SEED_PASSWORD: &str = "password";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub created_at: NaiveDate,
}

#[derive(Clone, Debug, Serialize)]
pub struct AuthSession {
    pub user: User,
    pub token: SessionToken,
}

struct Account {
    user: User,
    password_digest: String,
}

fn digest(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

fn seeded_accounts() -> Vec<Account> {
    [
        ("1", "SnakeMaster", "master@snake.io", (2024, 1, 1)),
        ("2", "PixelViper", "viper@snake.io", (2024, 1, 5)),
        ("3", "NeonSlither", "neon@snake.io", (2024, 1, 10)),
    ]
    .into_iter()
    .map(|(id, username, email, (y, m, d))| Account {
        user: User {
            id: UserId::new(id),
            username: username.to_string(),
            email: email.to_string(),
            created_at: NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default(),
        },
        password_digest: digest(SEED_PASSWORD),
    })
    .collect()
}

/// Accounts, bearer tokens and the locally persisted session.
pub struct AuthService {
    accounts: Mutex<Vec<Account>>,
    tokens: Mutex<HashMap<SessionToken, UserId>>,
    next_id: AtomicU64,
    session_store: Arc<dyn KeyValueStore>,
    min_password_length: usize,
    min_login_password_length: usize,
    latency: Duration,
}

impl AuthService {
    pub fn new(session_store: Arc<dyn KeyValueStore>, settings: &StoreSettings) -> Self {
        let accounts = seeded_accounts();
        Self {
            next_id: AtomicU64::new(accounts.len() as u64 + 1),
            accounts: Mutex::new(accounts),
            tokens: Mutex::new(HashMap::new()),
            session_store,
            min_password_length: settings.min_password_length,
            min_login_password_length: settings.min_login_password_length,
            latency: settings.latency(),
        }
    }

    /// Checks credentials without touching the local session.
    pub async fn verify_credentials(&self, email: &str, password: &str) -> Result<User, ApiError> {
        simulate_latency(self.latency).await;

        if password.len() < self.min_login_password_length {
            return Err(ApiError::InvalidCredentials);
        }

        let accounts = self.accounts.lock().await;
        let account = accounts
            .iter()
            .find(|a| a.user.email == email)
            .ok_or(ApiError::InvalidCredentials)?;
        if account.password_digest != digest(password) {
            return Err(ApiError::InvalidCredentials);
        }
        Ok(account.user.clone())
    }

    /// Creates an account without touching the local session.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, ApiError> {
        simulate_latency(self.latency).await;

        let mut accounts = self.accounts.lock().await;
        if accounts.iter().any(|a| a.user.email == email) {
            return Err(ApiError::DuplicateEmail);
        }
        if accounts.iter().any(|a| a.user.username == username) {
            return Err(ApiError::DuplicateUsername);
        }
        if password.len() < self.min_password_length {
            return Err(ApiError::WeakPassword(self.min_password_length));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let user = User {
            id: UserId::new(id.to_string()),
            username: username.to_string(),
            email: email.to_string(),
            created_at: Utc::now().date_naive(),
        };
        accounts.push(Account {
            user: user.clone(),
            password_digest: digest(password),
        });
        log!("User {} signed up", user.username);
        Ok(user)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession, ApiError> {
        let user = self.verify_credentials(email, password).await?;
        self.persist_session(Some(&user))?;
        let token = self.create_token(&user).await;
        log!("User {} logged in", user.username);
        Ok(AuthSession { user, token })
    }

    pub async fn signup(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, ApiError> {
        let user = self.register(username, email, password).await?;
        self.persist_session(Some(&user))?;
        let token = self.create_token(&user).await;
        Ok(AuthSession { user, token })
    }

    pub async fn logout(&self) -> Result<(), ApiError> {
        simulate_latency(self.latency).await;
        self.persist_session(None)
    }

    pub async fn current_user(&self) -> Option<User> {
        simulate_latency(self.latency).await;
        self.get_session()
    }

    /// Locally persisted session; a corrupt entry reads as no session.
    pub fn get_session(&self) -> Option<User> {
        let stored = self.session_store.get(SESSION_KEY)?;
        match serde_json::from_str(&stored) {
            Ok(user) => Some(user),
            Err(e) => {
                warn_log!("Ignoring corrupt stored session: {}", e);
                None
            }
        }
    }

    pub fn persist_session(&self, user: Option<&User>) -> Result<(), ApiError> {
        let result = match user {
            Some(user) => {
                let encoded =
                    serde_json::to_string(user).map_err(|e| ApiError::Storage(e.to_string()))?;
                self.session_store.set(SESSION_KEY, &encoded)
            }
            None => self.session_store.remove(SESSION_KEY),
        };
        result.map_err(ApiError::Storage)
    }

    /// Issues a bearer token for `user`, revoking any token issued earlier.
    pub async fn create_token(&self, user: &User) -> SessionToken {
        let token = SessionToken::generate();
        let mut tokens = self.tokens.lock().await;
        tokens.retain(|_, owner| *owner != user.id);
        tokens.insert(token.clone(), user.id.clone());
        token
    }

    pub async fn user_for_token(&self, token: &SessionToken) -> Option<User> {
        let user_id = self.tokens.lock().await.get(token).cloned()?;
        self.accounts
            .lock()
            .await
            .iter()
            .find(|a| a.user.id == user_id)
            .map(|a| a.user.clone())
    }

    pub async fn revoke_token(&self, token: &SessionToken) -> bool {
        self.tokens.lock().await.remove(token).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn service() -> (AuthService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (AuthService::new(store.clone(), &StoreSettings::default()), store)
    }

    #[tokio::test]
    async fn test_login_seeded_user() {
        let (auth, _) = service();
        let session = auth.login("master@snake.io", "password").await.unwrap();
        assert_eq!(session.user.username, "SnakeMaster");
        assert_eq!(auth.get_session(), Some(session.user.clone()));
        assert_eq!(auth.user_for_token(&session.token).await, Some(session.user));
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let (auth, store) = service();
        for (email, password) in [
            ("nobody@snake.io", "password"),
            ("master@snake.io", "abc"),
            ("master@snake.io", "wrong-password"),
        ] {
            assert_eq!(
                auth.login(email, password).await.unwrap_err(),
                ApiError::InvalidCredentials
            );
        }
        assert_eq!(store.get(SESSION_KEY), None);
    }

    #[tokio::test]
    async fn test_signup_validation_order() {
        let (auth, _) = service();
        assert_eq!(
            auth.signup("Someone", "master@snake.io", "x").await.unwrap_err(),
            ApiError::DuplicateEmail
        );
        assert_eq!(
            auth.signup("SnakeMaster", "new@snake.io", "longenough").await.unwrap_err(),
            ApiError::DuplicateUsername
        );
        let err = auth.signup("Fresh", "fresh@snake.io", "12345").await.unwrap_err();
        assert_eq!(err, ApiError::WeakPassword(6));
        assert_eq!(err.to_string(), "Password must be at least 6 characters");
        assert_eq!(auth.get_session(), None);
    }

    #[tokio::test]
    async fn test_signup_then_login() {
        let (auth, _) = service();
        let created = auth.signup("Fresh", "fresh@snake.io", "secret1").await.unwrap();
        assert_eq!(created.user.id, UserId::new("4"));
        assert_eq!(auth.get_session(), Some(created.user.clone()));

        auth.logout().await.unwrap();
        assert_eq!(auth.current_user().await, None);

        let again = auth.login("fresh@snake.io", "secret1").await.unwrap();
        assert_eq!(again.user, created.user);
        assert_ne!(again.token, created.token);
    }

    #[tokio::test]
    async fn test_passwords_stored_as_digests() {
        let (auth, _) = service();
        auth.signup("Fresh", "fresh@snake.io", "secret1").await.unwrap();
        let accounts = auth.accounts.lock().await;
        let account = accounts.iter().find(|a| a.user.username == "Fresh").unwrap();
        assert_eq!(account.password_digest.len(), 64);
        assert_ne!(account.password_digest, "secret1");
    }

    #[tokio::test]
    async fn test_revoked_token_no_longer_resolves() {
        let (auth, _) = service();
        let session = auth.login("neon@snake.io", "password").await.unwrap();
        assert!(auth.revoke_token(&session.token).await);
        assert!(!auth.revoke_token(&session.token).await);
        assert_eq!(auth.user_for_token(&session.token).await, None);
    }

    #[tokio::test]
    async fn test_new_login_replaces_previous_token() {
        let (auth, _) = service();
        let first = auth.login("neon@snake.io", "password").await.unwrap();
        let other = auth.login("viper@snake.io", "password").await.unwrap();
        let second = auth.login("neon@snake.io", "password").await.unwrap();

        assert_eq!(auth.user_for_token(&first.token).await, None);
        assert_eq!(auth.user_for_token(&second.token).await, Some(second.user));
        assert_eq!(auth.user_for_token(&other.token).await, Some(other.user));
        assert_eq!(auth.tokens.lock().await.len(), 2);
    }

    #[test]
    fn test_corrupt_session_reads_as_none() {
        let (auth, store) = service();
        store.set(SESSION_KEY, "{not json").unwrap();
        assert_eq!(auth.get_session(), None);
    }

    #[test]
    fn test_session_wire_shape() {
        let (auth, store) = service();
        let user = User {
            id: UserId::new("9"),
            username: "Tester".to_string(),
            email: "t@snake.io".to_string(),
            created_at: NaiveDate::from_ymd_opt(2024, 2, 3).unwrap(),
        };
        auth.persist_session(Some(&user)).unwrap();
        let stored = store.get(SESSION_KEY).unwrap();
        assert!(stored.contains("\"createdAt\":\"2024-02-03\""));
        auth.persist_session(None).unwrap();
        assert_eq!(store.get(SESSION_KEY), None);
    }
}
