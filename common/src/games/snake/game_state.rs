use std::time::Duration;

use serde::Serialize;

use crate::games::SessionRng;
use crate::log;
use super::engine::{self, Step};
use super::settings::GameSettings;
use super::snake::Snake;
use super::types::{DeathReason, Direction, GameMode, GameStatus, Position};

const INITIAL_LENGTH: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    Moved,
    Ate,
    Collided(DeathReason),
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub snake: Snake,
    pub food: Position,
    /// Direction committed by the last tick.
    pub direction: Direction,
    /// Buffered input applied on the next tick.
    pub next_direction: Direction,
    pub score: u32,
    pub high_score: u32,
    pub status: GameStatus,
    pub mode: GameMode,
    pub grid_size: i32,
    /// Tick interval in milliseconds.
    pub speed: u64,
    #[serde(skip)]
    pub death_reason: Option<DeathReason>,
}

impl GameState {
    /// Fresh idle state: a three-segment snake in the middle of the grid
    /// heading right, food somewhere off the snake.
    pub fn new(
        mode: GameMode,
        high_score: u32,
        settings: &GameSettings,
        rng: &mut SessionRng,
    ) -> Self {
        let grid_size = settings.grid_size;
        let center = grid_size / 2;
        let snake = Snake::new(
            Position::new(center, center),
            Direction::Right,
            INITIAL_LENGTH,
            grid_size,
        );
        let food = engine::spawn_food(&snake, grid_size, rng).unwrap_or(snake.tail());

        Self {
            snake,
            food,
            direction: Direction::Right,
            next_direction: Direction::Right,
            score: 0,
            high_score,
            status: GameStatus::Idle,
            mode,
            grid_size,
            speed: settings.initial_speed_ms,
            death_reason: None,
        }
    }

    pub fn speed(&self) -> Duration {
        Duration::from_millis(self.speed)
    }

    /// Computes the next tick. `self` is never modified; a collision returns
    /// the current snake, food and score with the status set to game-over.
    pub fn advance(
        &self,
        requested: Direction,
        settings: &GameSettings,
        rng: &mut SessionRng,
    ) -> (GameState, TickOutcome) {
        let direction = if requested.is_opposite(&self.direction) {
            self.direction
        } else {
            requested
        };

        let mut next = self.clone();
        let outcome = match engine::step_snake(
            &self.snake,
            self.food,
            direction,
            self.mode,
            self.grid_size,
            rng,
        ) {
            Step::Collided(reason) => {
                next.status = GameStatus::GameOver;
                next.death_reason = Some(reason);
                log!(
                    "Game over ({:?}) in {} mode with score {}",
                    reason,
                    self.mode,
                    self.score
                );
                return (next, TickOutcome::Collided(reason));
            }
            Step::Moved(snake) => {
                next.snake = snake;
                TickOutcome::Moved
            }
            Step::Ate { snake, food } => {
                next.snake = snake;
                next.food = food;
                next.score += settings.food_reward;
                next.speed = self
                    .speed
                    .saturating_sub(settings.speed_step_ms)
                    .max(settings.min_speed_ms);
                log!("Food eaten: score {}, speed {}ms", next.score, next.speed);
                TickOutcome::Ate
            }
        };

        next.direction = direction;
        next.next_direction = direction;
        next.high_score = next.high_score.max(next.score);
        (next, outcome)
    }
}
