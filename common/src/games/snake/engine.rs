use crate::games::SessionRng;

use super::snake::Snake;
use super::types::{DeathReason, Direction, GameMode, Position};

const FOOD_SAMPLE_ATTEMPTS: usize = 100;

/// Result of moving a snake one cell. Collisions leave the input untouched.
#[derive(Clone, Debug)]
pub enum Step {
    Collided(DeathReason),
    Moved(Snake),
    Ate { snake: Snake, food: Position },
}

/// Candidate head after one move, or the wall it ran into.
pub fn next_head(
    head: Position,
    direction: Direction,
    mode: GameMode,
    grid_size: i32,
) -> Result<Position, DeathReason> {
    let candidate = head.step(direction);
    match mode {
        GameMode::PassThrough => Ok(candidate.wrapped(grid_size)),
        GameMode::Walls if candidate.in_bounds(grid_size) => Ok(candidate),
        GameMode::Walls => Err(DeathReason::WallCollision),
    }
}

/// Boundary, self-collision, growth and food rules shared by human sessions
/// and spectated bots.
///
/// Self-collision is checked against the snake before its tail moves, so
/// stepping onto the current tail cell is fatal even though the tail would
/// vacate it.
pub fn step_snake(
    snake: &Snake,
    food: Position,
    direction: Direction,
    mode: GameMode,
    grid_size: i32,
    rng: &mut SessionRng,
) -> Step {
    let head = match next_head(snake.head(), direction, mode, grid_size) {
        Ok(head) => head,
        Err(reason) => return Step::Collided(reason),
    };

    if snake.contains(head) {
        return Step::Collided(DeathReason::SelfCollision);
    }

    let ate = head == food;
    let mut moved = snake.clone();
    moved.push_head(head, ate);

    if !ate {
        return Step::Moved(moved);
    }

    // A full board has nowhere left to put food; it stays under the head.
    let food = spawn_food(&moved, grid_size, rng).unwrap_or(head);
    Step::Ate { snake: moved, food }
}

/// Uniformly random free cell, or `None` when the snake covers the grid.
///
/// Rejection sampling first; a crowded board falls back to picking among the
/// remaining free cells so the call always terminates.
pub fn spawn_food(snake: &Snake, grid_size: i32, rng: &mut SessionRng) -> Option<Position> {
    for _ in 0..FOOD_SAMPLE_ATTEMPTS {
        let candidate = Position::new(
            rng.random_range(0..grid_size),
            rng.random_range(0..grid_size),
        );
        if !snake.contains(candidate) {
            return Some(candidate);
        }
    }

    let free: Vec<Position> = (0..grid_size)
        .flat_map(|y| (0..grid_size).map(move |x| Position::new(x, y)))
        .filter(|cell| !snake.contains(*cell))
        .collect();
    rng.choose(&free).copied()
}
