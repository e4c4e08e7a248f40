use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::cors::{Any, CorsLayer};

use common::context::AppContext;
use common::games::snake::{ActivePlayer, GameMode};
use common::store::{AuthSession, LeaderboardEntry, User};
use common::{ApiError, PlayerId, SessionToken, log};

#[derive(Clone)]
pub struct WebServerState {
    pub context: Arc<AppContext>,
}

/// `ApiError` rendered as `{"detail": message}` with a matching status.
#[derive(Debug)]
pub struct HttpError(pub ApiError);

impl HttpError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            ApiError::InvalidCredentials | ApiError::NotAuthenticated => StatusCode::UNAUTHORIZED,
            ApiError::DuplicateEmail | ApiError::DuplicateUsername | ApiError::WeakPassword(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::PlayerNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ApiError> for HttpError {
    fn from(err: ApiError) -> Self {
        Self(err)
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut response = (status, Json(json!({ "detail": self.0.to_string() }))).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, header::HeaderValue::from_static("Bearer"));
        }
        response
    }
}

type HttpResult<T> = Result<T, HttpError>;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct ModeFilter {
    pub mode: Option<GameMode>,
}

#[derive(Deserialize)]
pub struct ModeQuery {
    pub mode: GameMode,
}

#[derive(Deserialize)]
pub struct ScoreSubmission {
    pub score: u32,
    pub mode: GameMode,
}

pub fn router(state: WebServerState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/auth/login", post(login))
        .route("/api/auth/signup", post(signup))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/me", get(me))
        .route("/api/leaderboard", get(get_leaderboard).post(submit_score))
        .route("/api/spectate/active", get(active_players))
        .route("/api/spectate/player/{player_id}", get(player_state))
        .route("/api/game/highscore", get(get_high_score).post(save_high_score))
        .layer(cors)
        .with_state(state)
}

pub async fn run_web_server(
    context: Arc<AppContext>,
    addr: SocketAddr,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), String> {
    let app = router(WebServerState { context });

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| format!("Failed to bind {}: {}", addr, e))?;
    log!("Web server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| format!("Web server error: {}", e))
}

fn bearer_token(headers: &HeaderMap) -> Option<SessionToken> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(SessionToken::new(token))
}

async fn authenticated(
    state: &WebServerState,
    headers: &HeaderMap,
) -> HttpResult<(User, SessionToken)> {
    let token = bearer_token(headers).ok_or(ApiError::NotAuthenticated)?;
    let user = state
        .context
        .auth
        .user_for_token(&token)
        .await
        .ok_or(ApiError::NotAuthenticated)?;
    Ok((user, token))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn login(
    State(state): State<WebServerState>,
    Json(request): Json<LoginRequest>,
) -> HttpResult<Json<AuthSession>> {
    let auth = &state.context.auth;
    let user = auth.verify_credentials(&request.email, &request.password).await?;
    let token = auth.create_token(&user).await;
    log!("User {} logged in over HTTP", user.username);
    Ok(Json(AuthSession { user, token }))
}

async fn signup(
    State(state): State<WebServerState>,
    Json(request): Json<SignupRequest>,
) -> HttpResult<(StatusCode, Json<AuthSession>)> {
    let auth = &state.context.auth;
    let user = auth
        .register(&request.username, &request.email, &request.password)
        .await?;
    let token = auth.create_token(&user).await;
    Ok((StatusCode::CREATED, Json(AuthSession { user, token })))
}

async fn logout(
    State(state): State<WebServerState>,
    headers: HeaderMap,
) -> HttpResult<Json<Value>> {
    let (_, token) = authenticated(&state, &headers).await?;
    state.context.auth.revoke_token(&token).await;
    Ok(Json(json!({ "message": "Logout successful" })))
}

async fn me(State(state): State<WebServerState>, headers: HeaderMap) -> HttpResult<Json<User>> {
    let (user, _) = authenticated(&state, &headers).await?;
    Ok(Json(user))
}

async fn get_leaderboard(
    State(state): State<WebServerState>,
    Query(filter): Query<ModeFilter>,
) -> Json<Vec<LeaderboardEntry>> {
    Json(state.context.leaderboard.get_all(filter.mode).await)
}

async fn submit_score(
    State(state): State<WebServerState>,
    headers: HeaderMap,
    Json(submission): Json<ScoreSubmission>,
) -> HttpResult<Json<Option<LeaderboardEntry>>> {
    let (user, _) = authenticated(&state, &headers).await?;
    let entry = state
        .context
        .leaderboard
        .submit_score_as(&user.username, submission.score, submission.mode)
        .await;
    Ok(Json(entry))
}

async fn active_players(State(state): State<WebServerState>) -> Json<Vec<ActivePlayer>> {
    Json(state.context.spectate.get_active_players().await)
}

async fn player_state(
    State(state): State<WebServerState>,
    Path(player_id): Path<String>,
) -> HttpResult<Json<ActivePlayer>> {
    let player = state
        .context
        .spectate
        .get_player_state(&PlayerId::new(player_id))
        .await?;
    Ok(Json(player))
}

async fn get_high_score(
    State(state): State<WebServerState>,
    headers: HeaderMap,
    Query(query): Query<ModeQuery>,
) -> HttpResult<Json<Value>> {
    let (user, _) = authenticated(&state, &headers).await?;
    let score = state
        .context
        .game
        .for_owner(user.id.as_str())
        .get_high_score(query.mode);
    Ok(Json(json!({ "score": score })))
}

async fn save_high_score(
    State(state): State<WebServerState>,
    headers: HeaderMap,
    Json(submission): Json<ScoreSubmission>,
) -> HttpResult<Json<Value>> {
    let (user, _) = authenticated(&state, &headers).await?;
    let stored = state
        .context
        .game
        .for_owner(user.id.as_str())
        .save_high_score(submission.mode, submission.score)
        .await?;
    Ok(Json(json!({ "message": "Score saved", "score": stored })))
}
