use thiserror::Error;

use crate::PlayerId;

/// Failures surfaced to callers of the auth, leaderboard, spectate and
/// high-score APIs. Display strings are shown to the user as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Email already registered")]
    DuplicateEmail,
    #[error("Username already taken")]
    DuplicateUsername,
    #[error("Password must be at least {0} characters")]
    WeakPassword(usize),
    #[error("Must be logged in to submit score")]
    NotAuthenticated,
    #[error("Player {0} not found")]
    PlayerNotFound(PlayerId),
    #[error("Storage error: {0}")]
    Storage(String),
}
