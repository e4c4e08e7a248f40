use std::sync::Arc;

use crate::games::SessionRng;
use crate::games::snake::{
    GameMode, GameSettings, HighScorePersistence, SessionController, SpectatorSettings,
};
use crate::log;
use crate::store::{
    AuthService, GameApi, HighScoreStore, KeyValueStore, Leaderboard, LeaderboardService,
    SpectateRepository, StoreSettings,
};

/// Settings consumed by [`AppContext::init`].
#[derive(Clone, Debug, Default)]
pub struct ContextConfig {
    pub game: GameSettings,
    pub spectator: SpectatorSettings,
    pub store: StoreSettings,
}

/// Process-wide owner of every repository. Built once at startup and shared
/// by reference; nothing here lives in module-level statics.
pub struct AppContext {
    pub auth: Arc<AuthService>,
    pub leaderboard: LeaderboardService,
    pub spectate: SpectateRepository,
    pub game: GameApi,
    config: ContextConfig,
    rng: std::sync::Mutex<SessionRng>,
}

impl AppContext {
    pub fn init(
        config: ContextConfig,
        store: Arc<dyn KeyValueStore>,
        mut rng: SessionRng,
    ) -> Arc<Self> {
        log!("Initialising context with seed {}", rng.seed());

        let auth = Arc::new(AuthService::new(Arc::clone(&store), &config.store));
        let leaderboard = LeaderboardService::new(
            Leaderboard::seeded(config.store.leaderboard_capacity),
            Arc::clone(&auth),
            &config.store,
        );
        let spectate = SpectateRepository::new(
            config.spectator.clone(),
            rng.fork(),
            config.store.latency(),
        );
        let game = GameApi::new(HighScoreStore::new(store), config.store.latency());

        Arc::new(Self {
            auth,
            leaderboard,
            spectate,
            game,
            config,
            rng: std::sync::Mutex::new(rng),
        })
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Session controller wired to the shared high-score store, with its own
    /// random stream.
    pub fn new_session(&self, mode: GameMode) -> SessionController {
        let rng = self
            .rng
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .fork();
        let persistence: Arc<dyn HighScorePersistence> = Arc::new(self.game.high_scores().clone());
        SessionController::new(mode, self.config.game.clone(), rng, persistence)
    }
}
