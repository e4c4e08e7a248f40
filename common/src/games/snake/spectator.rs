use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::PlayerId;
use crate::games::SessionRng;
use super::bot_controller::BotController;
use super::engine::{self, Step};
use super::settings::SpectatorSettings;
use super::snake::Snake;
use super::types::{Direction, GameMode, Position};

const MIN_SPAWN_SCORE: u32 = 50;
const MAX_SPAWN_SCORE: u32 = 549;

/// A bot game shown in the spectate feed.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivePlayer {
    pub id: PlayerId,
    pub username: String,
    pub score: u32,
    pub mode: GameMode,
    pub snake: Snake,
    pub food: Position,
    pub direction: Direction,
    pub started_at: DateTime<Utc>,
    #[serde(skip)]
    pub grid_size: i32,
    /// Set while a crashed bot sits frozen; counts steps until respawn.
    #[serde(skip)]
    pub respawn_in: Option<u32>,
}

impl ActivePlayer {
    pub fn is_crashed(&self) -> bool {
        self.respawn_in.is_some()
    }
}

/// Fresh bot: horizontal body of random length trailing behind a random
/// left/right heading, random mode and starting score, food off the body.
pub fn spawn_bot(
    id: PlayerId,
    username: impl Into<String>,
    settings: &SpectatorSettings,
    rng: &mut SessionRng,
) -> ActivePlayer {
    let grid_size = settings.grid_size;
    let length = rng.random_range(settings.min_length..=settings.max_length);
    let tail_span = length as i32 - 1;

    let direction = if rng.chance(0.5) {
        Direction::Right
    } else {
        Direction::Left
    };
    let head_x = match direction {
        Direction::Right => rng.random_range(tail_span..grid_size),
        _ => rng.random_range(0..grid_size - tail_span),
    };
    let head = Position::new(head_x, rng.random_range(0..grid_size));
    let snake = Snake::new(head, direction, length, grid_size);
    let food = engine::spawn_food(&snake, grid_size, rng).unwrap_or(head);

    let mode = if rng.chance(0.5) {
        GameMode::Walls
    } else {
        GameMode::PassThrough
    };

    ActivePlayer {
        id,
        username: username.into(),
        score: rng.random_range(MIN_SPAWN_SCORE..=MAX_SPAWN_SCORE),
        mode,
        snake,
        food,
        direction,
        started_at: Utc::now(),
        grid_size,
        respawn_in: None,
    }
}

/// One simulation step. Bots follow the same boundary, collision and food
/// rules as human games; a crash freezes the bot for
/// `respawn_delay_steps` steps, after which it respawns under the same
/// identity.
pub fn simulate_step(
    player: &ActivePlayer,
    settings: &SpectatorSettings,
    rng: &mut SessionRng,
) -> ActivePlayer {
    if let Some(remaining) = player.respawn_in {
        if remaining <= 1 {
            return spawn_bot(player.id.clone(), player.username.clone(), settings, rng);
        }
        let mut frozen = player.clone();
        frozen.respawn_in = Some(remaining - 1);
        return frozen;
    }

    let direction =
        BotController::choose_direction(player.snake.head(), player.food, player.direction, rng);

    let mut next = player.clone();
    match engine::step_snake(
        &player.snake,
        player.food,
        direction,
        player.mode,
        player.grid_size,
        rng,
    ) {
        Step::Collided(_) => {
            next.respawn_in = Some(settings.respawn_delay_steps);
        }
        Step::Moved(snake) => {
            next.snake = snake;
            next.direction = direction;
        }
        Step::Ate { snake, food } => {
            next.snake = snake;
            next.food = food;
            next.direction = direction;
            next.score += settings.food_reward;
        }
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> SpectatorSettings {
        SpectatorSettings::default()
    }

    fn is_contiguous(player: &ActivePlayer) -> bool {
        let cells = player.snake.to_vec();
        cells.windows(2).all(|pair| {
            let dx = (pair[0].x - pair[1].x).rem_euclid(player.grid_size);
            let dy = (pair[0].y - pair[1].y).rem_euclid(player.grid_size);
            let unit = |d: i32| d == 1 || d == player.grid_size - 1;
            (dx == 0 && unit(dy)) || (dy == 0 && unit(dx))
        })
    }

    #[test]
    fn test_spawned_bots_are_well_formed() {
        let mut rng = SessionRng::new(4);
        for i in 0..200 {
            let bot = spawn_bot(PlayerId::new(format!("p{i}")), "bot", &settings(), &mut rng);
            assert!((3..=7).contains(&bot.snake.len()));
            assert!((50..=549).contains(&bot.score));
            assert!(bot.snake.segments().all(|p| p.in_bounds(20)));
            assert!(!bot.snake.contains(bot.food));
            assert!(is_contiguous(&bot));
            assert!(!bot.is_crashed());

            // The body trails behind the heading.
            let behind = bot.snake.head().step(bot.direction.opposite());
            assert_eq!(bot.snake.to_vec()[1], behind);
        }
    }

    #[test]
    fn test_steps_keep_body_contiguous() {
        let mut rng = SessionRng::new(12);
        let settings = settings();
        let mut bot = spawn_bot(PlayerId::new("p1"), "LivePlayer1", &settings, &mut rng);
        for _ in 0..500 {
            let next = simulate_step(&bot, &settings, &mut rng);
            assert!(is_contiguous(&next));
            assert!(next.snake.segments().all(|p| p.in_bounds(20)));
            if !bot.is_crashed() {
                assert!(!next.direction.is_opposite(&bot.direction));
            }
            assert_eq!(next.id, bot.id);
            bot = next;
        }
    }

    #[test]
    fn test_wall_crash_freezes_then_respawns() {
        let settings = SpectatorSettings {
            respawn_delay_steps: 2,
            ..settings()
        };
        let mut rng = SessionRng::new(3);
        let mut bot = spawn_bot(PlayerId::new("p2"), "GamerX99", &settings, &mut rng);
        bot.mode = GameMode::Walls;
        bot.direction = Direction::Right;
        bot.snake = Snake::from_segments([
            Position::new(19, 4),
            Position::new(18, 4),
            Position::new(17, 4),
        ]);
        // Heuristic turns up toward the food; inertia sends it into the wall.
        bot.food = Position::new(19, 0);

        let mut crashed = bot.clone();
        for _ in 0..100 {
            crashed = simulate_step(&bot, &settings, &mut rng);
            if crashed.is_crashed() {
                break;
            }
        }
        assert!(crashed.is_crashed(), "bot at the wall never crashed");
        assert_eq!(crashed.snake, bot.snake);

        let frozen = simulate_step(&crashed, &settings, &mut rng);
        assert_eq!(frozen.respawn_in, Some(1));
        assert_eq!(frozen.snake, bot.snake);

        let respawned = simulate_step(&frozen, &settings, &mut rng);
        assert!(!respawned.is_crashed());
        assert_eq!(respawned.id, bot.id);
        assert_eq!(respawned.username, "GamerX99");
    }

    #[test]
    fn test_pass_through_bot_wraps() {
        let mut rng = SessionRng::new(6);
        let mut bot = spawn_bot(PlayerId::new("p3"), "SnakeNinja", &settings(), &mut rng);
        bot.mode = GameMode::PassThrough;
        bot.direction = Direction::Right;
        bot.snake = Snake::from_segments([
            Position::new(19, 4),
            Position::new(18, 4),
            Position::new(17, 4),
        ]);
        bot.food = Position::new(3, 4);

        // Food is behind on the x axis, so the only non-reversing candidate
        // set is empty and the bot keeps heading right.
        let next = simulate_step(&bot, &settings(), &mut rng);
        assert_eq!(next.snake.head(), Position::new(0, 4));
        assert!(!next.is_crashed());
    }

    #[test]
    fn test_eating_grows_and_scores() {
        let mut rng = SessionRng::new(10);
        let mut bot = spawn_bot(PlayerId::new("p4"), "bot", &settings(), &mut rng);
        bot.mode = GameMode::Walls;
        bot.direction = Direction::Right;
        bot.snake = Snake::from_segments([
            Position::new(5, 5),
            Position::new(4, 5),
            Position::new(3, 5),
        ]);
        bot.food = Position::new(6, 5);
        bot.score = 100;

        let next = simulate_step(&bot, &settings(), &mut rng);
        assert_eq!(next.snake.len(), 4);
        assert_eq!(next.score, 110);
        assert!(!next.snake.contains(next.food));
    }

    #[test]
    fn test_wire_shape() {
        let mut rng = SessionRng::new(1);
        let bot = spawn_bot(PlayerId::new("p1"), "LivePlayer1", &settings(), &mut rng);
        let json = serde_json::to_value(&bot).unwrap();
        assert_eq!(json["id"], "p1");
        assert!(json.get("startedAt").is_some());
        assert!(json.get("respawnIn").is_none());
        assert!(json["snake"].as_array().is_some_and(|s| s.len() >= 3));
    }
}
