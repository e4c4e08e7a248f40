mod bot_controller;
pub mod engine;
mod game_state;
mod session;
mod settings;
mod snake;
mod spectator;
mod types;

pub use bot_controller::BotController;
pub use engine::{Step, spawn_food, step_snake};
pub use game_state::{GameState, TickOutcome};
pub use session::{FrameOutcome, GameRunner, HighScorePersistence, SessionController};
pub use settings::{GameSettings, SpectatorSettings};
pub use snake::Snake;
pub use spectator::{ActivePlayer, simulate_step, spawn_bot};
pub use types::{DeathReason, Direction, GameMode, GameStatus, Position};
