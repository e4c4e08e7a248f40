mod auth;
mod high_scores;
mod leaderboard;
mod spectate;

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::{
    ConfigContentProvider, ConfigSerializer, FileContentConfigProvider, Validate,
    YamlConfigSerializer,
};

pub use auth::{AuthService, AuthSession, SESSION_KEY, User};
pub use high_scores::{GameApi, HighScoreStore};
pub use leaderboard::{Leaderboard, LeaderboardEntry, LeaderboardService};
pub use spectate::SpectateRepository;

/// String key-value persistence behind sessions and high scores.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), String>;
    fn remove(&self, key: &str) -> Result<(), String>;

    /// Reads `key` and writes what `apply` returns under one lock, so no other
    /// write lands in between. `None` from `apply` leaves the entry alone.
    fn update(
        &self,
        key: &str,
        apply: &mut dyn FnMut(Option<&str>) -> Option<String>,
    ) -> Result<(), String>;
}

#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), String> {
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), String> {
        self.entries().remove(key);
        Ok(())
    }

    fn update(
        &self,
        key: &str,
        apply: &mut dyn FnMut(Option<&str>) -> Option<String>,
    ) -> Result<(), String> {
        let mut entries = self.entries();
        if let Some(value) = apply(entries.get(key).map(String::as_str)) {
            entries.insert(key.to_string(), value);
        }
        Ok(())
    }
}

/// Key-value map mirrored to a YAML document. Every write rewrites the whole
/// document; a failed write leaves the in-memory map unchanged.
pub struct FileStore<P = FileContentConfigProvider>
where
    P: ConfigContentProvider,
{
    provider: P,
    serializer: YamlConfigSerializer,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore<FileContentConfigProvider> {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, String> {
        Self::with_provider(FileContentConfigProvider::new(path))
    }
}

impl<P> FileStore<P>
where
    P: ConfigContentProvider,
{
    pub fn with_provider(provider: P) -> Result<Self, String> {
        let serializer = YamlConfigSerializer::new();
        let entries = match provider.get_config_content()? {
            Some(content) if !content.trim().is_empty() => serializer.deserialize(&content)?,
            _ => BTreeMap::new(),
        };
        Ok(Self {
            provider,
            serializer,
            entries: Mutex::new(entries),
        })
    }

    fn rewrite(
        &self,
        apply: impl FnOnce(&mut BTreeMap<String, String>) -> bool,
    ) -> Result<(), String> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = entries.clone();
        if !apply(&mut next) {
            return Ok(());
        }
        let content = self.serializer.serialize(&next)?;
        self.provider.set_config_content(&content)?;
        *entries = next;
        Ok(())
    }
}

impl<P> KeyValueStore for FileStore<P>
where
    P: ConfigContentProvider + Send + Sync,
{
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), String> {
        self.rewrite(|entries| {
            entries.insert(key.to_string(), value.to_string());
            true
        })
    }

    fn remove(&self, key: &str) -> Result<(), String> {
        self.rewrite(|entries| entries.remove(key).is_some())
    }

    fn update(
        &self,
        key: &str,
        apply: &mut dyn FnMut(Option<&str>) -> Option<String>,
    ) -> Result<(), String> {
        self.rewrite(|entries| match apply(entries.get(key).map(String::as_str)) {
            Some(value) => {
                entries.insert(key.to_string(), value);
                true
            }
            None => false,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub leaderboard_capacity: usize,
    pub min_password_length: usize,
    pub min_login_password_length: usize,
    /// Artificial delay applied to every async repository call.
    pub latency_ms: u64,
    /// Sessions and high scores go here when set; otherwise memory only.
    pub data_file: Option<PathBuf>,
}

impl StoreSettings {
    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            leaderboard_capacity: 10,
            min_password_length: 6,
            min_login_password_length: 4,
            latency_ms: 0,
            data_file: None,
        }
    }
}

impl Validate for StoreSettings {
    fn validate(&self) -> Result<(), String> {
        if self.leaderboard_capacity == 0 {
            return Err("leaderboard_capacity must be greater than 0".to_string());
        }
        if self.min_login_password_length > self.min_password_length {
            return Err(
                "min_login_password_length must not exceed min_password_length".to_string(),
            );
        }
        if self.latency_ms > 10_000 {
            return Err("latency_ms must not exceed 10000".to_string());
        }
        Ok(())
    }
}

pub(crate) async fn simulate_latency(latency: Duration) {
    if !latency.is_zero() {
        tokio::time::sleep(latency).await;
    }
}
