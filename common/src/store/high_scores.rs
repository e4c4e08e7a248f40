use std::sync::Arc;
use std::time::Duration;

use crate::error::ApiError;
use crate::games::snake::{GameMode, HighScorePersistence};
use crate::{error_log, log};
use super::{KeyValueStore, simulate_latency};

/// Per-mode best scores under `snake_highscore_<mode>`, or
/// `snake_highscore_<owner>_<mode>` when scoped to a user.
#[derive(Clone)]
pub struct HighScoreStore {
    store: Arc<dyn KeyValueStore>,
    owner: Option<String>,
}

impl HighScoreStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store, owner: None }
    }

    pub fn for_owner(&self, owner: impl Into<String>) -> Self {
        Self {
            store: Arc::clone(&self.store),
            owner: Some(owner.into()),
        }
    }

    fn key(&self, mode: GameMode) -> String {
        match self.owner {
            Some(ref owner) => format!("snake_highscore_{}_{}", owner, mode),
            None => format!("snake_highscore_{}", mode),
        }
    }

    /// Stored best, or 0 when nothing (or garbage) is stored.
    pub fn get(&self, mode: GameMode) -> u32 {
        parse_score(self.store.get(&self.key(mode)).as_deref())
    }

    /// Keeps the maximum of the stored and the offered score; returns the
    /// value stored afterwards. The compare and the write happen under the
    /// store's lock.
    pub fn save(&self, mode: GameMode, score: u32) -> Result<u32, ApiError> {
        let mut best = score;
        let mut raised = false;
        self.store
            .update(&self.key(mode), &mut |current| {
                let current = parse_score(current);
                raised = score > current;
                best = current.max(score);
                raised.then(|| score.to_string())
            })
            .map_err(ApiError::Storage)?;
        if raised {
            log!("New {} high score: {}", mode, score);
        }
        Ok(best)
    }
}

fn parse_score(value: Option<&str>) -> u32 {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(0)
}

impl HighScorePersistence for HighScoreStore {
    fn high_score(&self, mode: GameMode) -> u32 {
        self.get(mode)
    }

    fn save_high_score(&self, mode: GameMode, score: u32) {
        if let Err(e) = self.save(mode, score) {
            error_log!("Failed to save {} high score: {}", mode, e);
        }
    }
}

/// `game.*` calls: synchronous reads, asynchronous monotonic saves.
#[derive(Clone)]
pub struct GameApi {
    high_scores: HighScoreStore,
    latency: Duration,
}

impl GameApi {
    pub fn new(high_scores: HighScoreStore, latency: Duration) -> Self {
        Self {
            high_scores,
            latency,
        }
    }

    pub fn for_owner(&self, owner: impl Into<String>) -> Self {
        Self {
            high_scores: self.high_scores.for_owner(owner),
            latency: self.latency,
        }
    }

    pub fn high_scores(&self) -> &HighScoreStore {
        &self.high_scores
    }

    pub fn get_high_score(&self, mode: GameMode) -> u32 {
        self.high_scores.get(mode)
    }

    pub async fn save_high_score(&self, mode: GameMode, score: u32) -> Result<u32, ApiError> {
        simulate_latency(self.latency).await;
        self.high_scores.save(mode, score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    struct FailingStore;

    impl KeyValueStore for FailingStore {
        fn get(&self, _key: &str) -> Option<String> {
            Some("40".to_string())
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), String> {
            Err("disk full".to_string())
        }

        fn remove(&self, _key: &str) -> Result<(), String> {
            Err("disk full".to_string())
        }

        fn update(
            &self,
            _key: &str,
            _apply: &mut dyn FnMut(Option<&str>) -> Option<String>,
        ) -> Result<(), String> {
            Err("disk full".to_string())
        }
    }

    /// Holds every read-modify-write long enough for another thread to try
    /// its own in between.
    struct SlowStore {
        inner: MemoryStore,
    }

    impl KeyValueStore for SlowStore {
        fn get(&self, key: &str) -> Option<String> {
            let value = self.inner.get(key);
            std::thread::sleep(Duration::from_millis(20));
            value
        }

        fn set(&self, key: &str, value: &str) -> Result<(), String> {
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), String> {
            self.inner.remove(key)
        }

        fn update(
            &self,
            key: &str,
            apply: &mut dyn FnMut(Option<&str>) -> Option<String>,
        ) -> Result<(), String> {
            self.inner.update(key, &mut |current| {
                std::thread::sleep(Duration::from_millis(20));
                apply(current)
            })
        }
    }

    fn store() -> HighScoreStore {
        HighScoreStore::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_monotonic_max() {
        let scores = store();
        assert_eq!(scores.save(GameMode::Walls, 100).unwrap(), 100);
        assert_eq!(scores.save(GameMode::Walls, 50).unwrap(), 100);
        assert_eq!(scores.get(GameMode::Walls), 100);
    }

    #[test]
    fn test_modes_do_not_share_storage() {
        let scores = store();
        scores.save(GameMode::Walls, 100).unwrap();
        assert_eq!(scores.get(GameMode::PassThrough), 0);
        scores.save(GameMode::PassThrough, 30).unwrap();
        assert_eq!(scores.get(GameMode::Walls), 100);
        assert_eq!(scores.get(GameMode::PassThrough), 30);
    }

    #[test]
    fn test_owner_scoped_keys() {
        let backing = Arc::new(MemoryStore::new());
        let shared = HighScoreStore::new(backing.clone());
        let alice = shared.for_owner("1");
        alice.save(GameMode::Walls, 70).unwrap();

        assert_eq!(shared.get(GameMode::Walls), 0);
        assert_eq!(backing.get("snake_highscore_1_walls").as_deref(), Some("70"));
        shared.save(GameMode::PassThrough, 5).unwrap();
        assert_eq!(backing.get("snake_highscore_pass-through").as_deref(), Some("5"));
    }

    #[test]
    fn test_garbage_reads_as_zero() {
        let backing = Arc::new(MemoryStore::new());
        backing.set("snake_highscore_walls", "lots").unwrap();
        assert_eq!(HighScoreStore::new(backing).get(GameMode::Walls), 0);
    }

    #[test]
    fn test_failed_save_leaves_value() {
        let scores = HighScoreStore::new(Arc::new(FailingStore));
        assert_eq!(
            scores.save(GameMode::Walls, 90),
            Err(ApiError::Storage("disk full".to_string()))
        );
        assert_eq!(scores.get(GameMode::Walls), 40);
        // Best-effort path swallows the error.
        scores.save_high_score(GameMode::Walls, 90);
    }

    #[test]
    fn test_concurrent_saves_keep_the_maximum() {
        let scores = HighScoreStore::new(Arc::new(SlowStore {
            inner: MemoryStore::new(),
        }));
        let barrier = Arc::new(std::sync::Barrier::new(2));

        let workers: Vec<_> = [200, 100]
            .into_iter()
            .map(|score| {
                let scores = scores.clone();
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    scores.save(GameMode::Walls, score).unwrap()
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!(scores.get(GameMode::Walls), 200);
    }

    #[tokio::test]
    async fn test_game_api_async_save() {
        let api = GameApi::new(store(), Duration::ZERO);
        assert_eq!(api.get_high_score(GameMode::Walls), 0);
        api.save_high_score(GameMode::Walls, 100).await.unwrap();
        api.save_high_score(GameMode::Walls, 50).await.unwrap();
        assert_eq!(api.get_high_score(GameMode::Walls), 100);
        assert_eq!(api.for_owner("7").get_high_score(GameMode::Walls), 0);
    }
}
