use crate::games::SessionRng;
use super::types::{Direction, Position};

const KEEP_DIRECTION_CHANCE: f64 = 0.3;

pub struct BotController;

impl BotController {
    /// Greedy-with-inertia steering for spectated bots. Wrap-around and
    /// obstacles are ignored; the engine decides what the move costs.
    pub fn choose_direction(
        head: Position,
        food: Position,
        current: Direction,
        rng: &mut SessionRng,
    ) -> Direction {
        if rng.chance(KEEP_DIRECTION_CHANCE) {
            return current;
        }

        let candidates = Self::toward_food(head, food, current);
        rng.choose(&candidates).copied().unwrap_or(current)
    }

    fn toward_food(head: Position, food: Position, current: Direction) -> Vec<Direction> {
        let dx = food.x - head.x;
        let dy = food.y - head.y;

        let mut directions = Vec::with_capacity(2);
        if dx > 0 {
            directions.push(Direction::Right);
        }
        if dx < 0 {
            directions.push(Direction::Left);
        }
        if dy > 0 {
            directions.push(Direction::Down);
        }
        if dy < 0 {
            directions.push(Direction::Up);
        }
        directions.retain(|d| !d.is_opposite(&current));
        directions
    }
}
