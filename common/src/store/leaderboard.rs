use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::ApiError;
use crate::games::snake::GameMode;
use crate::log;
use super::{AuthService, StoreSettings, simulate_latency};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub id: String,
    pub rank: usize,
    pub username: String,
    pub score: u32,
    pub mode: GameMode,
    pub date: NaiveDate,
}

/// Single global top-N list across both modes, sorted by score descending.
#[derive(Clone, Debug)]
pub struct Leaderboard {
    entries: Vec<LeaderboardEntry>,
    capacity: usize,
    next_id: u64,
}

impl Leaderboard {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity,
            next_id: 1,
        }
    }

    pub fn seeded(capacity: usize) -> Self {
        let mut board = Self::new(capacity);
        let seed = [
            ("SnakeMaster", 2450, GameMode::Walls, 28),
            ("PixelViper", 2100, GameMode::PassThrough, 29),
            ("NeonSlither", 1850, GameMode::Walls, 30),
            ("ByteCrawler", 1720, GameMode::PassThrough, 27),
            ("GridGhost", 1650, GameMode::Walls, 26),
            ("ArcadeAce", 1580, GameMode::PassThrough, 25),
            ("RetroRacer", 1490, GameMode::Walls, 24),
            ("NightCrawler", 1350, GameMode::PassThrough, 23),
            ("DigitalDragon", 1280, GameMode::Walls, 22),
            ("CyberSerpent", 1150, GameMode::PassThrough, 21),
        ];
        for (username, score, mode, day) in seed {
            let date = NaiveDate::from_ymd_opt(2024, 12, day).unwrap_or_default();
            board.submit(username, score, mode, date);
        }
        board
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn qualifies(&self, score: u32) -> bool {
        if self.entries.len() < self.capacity {
            return true;
        }
        self.entries.last().is_some_and(|lowest| score > lowest.score)
    }

    /// Inserts the score if it makes the list. Ties keep insertion order, so
    /// a new entry ranks below existing entries with the same score.
    pub fn submit(
        &mut self,
        username: &str,
        score: u32,
        mode: GameMode,
        date: NaiveDate,
    ) -> Option<LeaderboardEntry> {
        if !self.qualifies(score) {
            return None;
        }

        let id = self.next_id.to_string();
        self.next_id += 1;
        self.entries.push(LeaderboardEntry {
            id: id.clone(),
            rank: 0,
            username: username.to_string(),
            score,
            mode,
            date,
        });

        self.entries.sort_by(|a, b| b.score.cmp(&a.score));
        self.entries.truncate(self.capacity);
        for (index, entry) in self.entries.iter_mut().enumerate() {
            entry.rank = index + 1;
        }

        self.entries.iter().find(|e| e.id == id).cloned()
    }

    pub fn entries(&self, mode: Option<GameMode>) -> Vec<LeaderboardEntry> {
        self.entries
            .iter()
            .filter(|e| mode.is_none_or(|m| e.mode == m))
            .cloned()
            .collect()
    }
}

pub struct LeaderboardService {
    board: Mutex<Leaderboard>,
    auth: Arc<AuthService>,
    latency: Duration,
}

impl LeaderboardService {
    pub fn new(board: Leaderboard, auth: Arc<AuthService>, settings: &StoreSettings) -> Self {
        Self {
            board: Mutex::new(board),
            auth,
            latency: settings.latency(),
        }
    }

    pub async fn get_all(&self, mode: Option<GameMode>) -> Vec<LeaderboardEntry> {
        simulate_latency(self.latency).await;
        self.board.lock().await.entries(mode)
    }

    /// Submits as the locally persisted session user.
    pub async fn submit_score(
        &self,
        score: u32,
        mode: GameMode,
    ) -> Result<Option<LeaderboardEntry>, ApiError> {
        simulate_latency(self.latency).await;
        let user = self.auth.get_session().ok_or(ApiError::NotAuthenticated)?;
        Ok(self.record(&user.username, score, mode).await)
    }

    /// Submits on behalf of an already authenticated user (bearer token).
    pub async fn submit_score_as(
        &self,
        username: &str,
        score: u32,
        mode: GameMode,
    ) -> Option<LeaderboardEntry> {
        simulate_latency(self.latency).await;
        self.record(username, score, mode).await
    }

    async fn record(&self, username: &str, score: u32, mode: GameMode) -> Option<LeaderboardEntry> {
        let today = Utc::now().date_naive();
        let entry = self.board.lock().await.submit(username, score, mode, today);
        match entry {
            Some(ref entry) => log!(
                "{} entered the leaderboard at rank {} with {} ({})",
                username,
                entry.rank,
                score,
                mode
            ),
            None => log!("Score {} by {} did not qualify", score, username),
        }
        entry
    }
}
