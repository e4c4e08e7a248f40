use std::time::Duration;

use tokio::sync::Mutex;

use crate::PlayerId;
use crate::error::ApiError;
use crate::games::SessionRng;
use crate::games::snake::{ActivePlayer, SpectatorSettings, simulate_step, spawn_bot};
use crate::id_generator::generate_bot_name;
use super::simulate_latency;

const SEED_NAMES: [&str; 3] = ["LivePlayer1", "GamerX99", "SnakeNinja"];

struct Feed {
    players: Vec<ActivePlayer>,
    rng: SessionRng,
}

/// Live bot games for the spectate view. Only the background ticker calls
/// `step_all`; readers get snapshots.
pub struct SpectateRepository {
    feed: Mutex<Feed>,
    settings: SpectatorSettings,
    latency: Duration,
}

impl SpectateRepository {
    pub fn new(settings: SpectatorSettings, mut rng: SessionRng, latency: Duration) -> Self {
        let players = (0..settings.bot_count)
            .map(|i| {
                let username = match SEED_NAMES.get(i) {
                    Some(name) => name.to_string(),
                    None => generate_bot_name(&mut rng),
                };
                spawn_bot(PlayerId::new(format!("p{}", i + 1)), username, &settings, &mut rng)
            })
            .collect();

        Self {
            feed: Mutex::new(Feed { players, rng }),
            settings,
            latency,
        }
    }

    pub fn settings(&self) -> &SpectatorSettings {
        &self.settings
    }

    pub async fn get_active_players(&self) -> Vec<ActivePlayer> {
        simulate_latency(self.latency).await;
        self.feed.lock().await.players.clone()
    }

    pub async fn get_player_state(&self, id: &PlayerId) -> Result<ActivePlayer, ApiError> {
        simulate_latency(self.latency).await;
        self.feed
            .lock()
            .await
            .players
            .iter()
            .find(|p| &p.id == id)
            .cloned()
            .ok_or_else(|| ApiError::PlayerNotFound(id.clone()))
    }

    /// Advances every bot by one simulation step.
    pub async fn step_all(&self) {
        let mut feed = self.feed.lock().await;
        let Feed { players, rng } = &mut *feed;
        for player in players.iter_mut() {
            *player = simulate_step(player, &self.settings, rng);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repository(bot_count: usize) -> SpectateRepository {
        let settings = SpectatorSettings {
            bot_count,
            ..SpectatorSettings::default()
        };
        SpectateRepository::new(settings, SessionRng::new(77), Duration::ZERO)
    }

    #[tokio::test]
    async fn test_seeded_feed() {
        let repo = repository(3);
        let players = repo.get_active_players().await;
        let names: Vec<_> = players.iter().map(|p| p.username.as_str()).collect();
        assert_eq!(names, ["LivePlayer1", "GamerX99", "SnakeNinja"]);
        assert_eq!(players[0].id, PlayerId::new("p1"));
    }

    #[tokio::test]
    async fn test_extra_bots_get_generated_names() {
        let repo = repository(5);
        let players = repo.get_active_players().await;
        assert_eq!(players.len(), 5);
        assert!(players[3..].iter().all(|p| !SEED_NAMES.contains(&p.username.as_str())));
    }

    #[tokio::test]
    async fn test_player_lookup() {
        let repo = repository(3);
        let player = repo.get_player_state(&PlayerId::new("p2")).await.unwrap();
        assert_eq!(player.username, "GamerX99");

        let missing = PlayerId::new("p404");
        assert_eq!(
            repo.get_player_state(&missing).await.unwrap_err(),
            ApiError::PlayerNotFound(missing)
        );
    }

    #[tokio::test]
    async fn test_step_all_moves_bots() {
        let repo = repository(3);
        let before = repo.get_active_players().await;
        for _ in 0..5 {
            repo.step_all().await;
        }
        let after = repo.get_active_players().await;
        assert_eq!(after.len(), before.len());
        assert!(
            before
                .iter()
                .zip(&after)
                .any(|(b, a)| b.snake != a.snake || a.is_crashed())
        );
    }
}
