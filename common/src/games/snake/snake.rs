use std::collections::{HashSet, VecDeque};

use serde::{Serialize, Serializer};

use super::types::{Direction, Position};

/// Snake body, head first. `body_set` mirrors `body` for O(1) occupancy checks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snake {
    body: VecDeque<Position>,
    body_set: HashSet<Position>,
}

impl Snake {
    /// Builds a straight snake of `length` segments whose head is `head` and
    /// whose body trails away from `direction`, wrapping on the grid.
    pub fn new(head: Position, direction: Direction, length: usize, grid_size: i32) -> Self {
        let trailing = direction.opposite();
        let mut segments = Vec::with_capacity(length.max(1));
        let mut current = head;
        segments.push(current);
        for _ in 1..length {
            current = current.step(trailing).wrapped(grid_size);
            segments.push(current);
        }
        Self::from_segments(segments)
    }

    /// Panics on an empty segment list; a snake always has a head.
    pub fn from_segments(segments: impl IntoIterator<Item = Position>) -> Self {
        let body: VecDeque<Position> = segments.into_iter().collect();
        assert!(!body.is_empty(), "snake needs at least one segment");
        let body_set = body.iter().copied().collect();
        Self { body, body_set }
    }

    pub fn head(&self) -> Position {
        *self.body.front().expect("Snake body should never be empty")
    }

    pub fn tail(&self) -> Position {
        *self.body.back().expect("Snake body should never be empty")
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    pub fn contains(&self, position: Position) -> bool {
        self.body_set.contains(&position)
    }

    pub fn segments(&self) -> impl Iterator<Item = Position> + '_ {
        self.body.iter().copied()
    }

    pub fn to_vec(&self) -> Vec<Position> {
        self.segments().collect()
    }

    /// Prepends `head`; drops the tail unless the snake grows this move.
    pub(crate) fn push_head(&mut self, head: Position, grow: bool) {
        self.body.push_front(head);
        self.body_set.insert(head);
        if !grow
            && let Some(tail) = self.body.pop_back()
        {
            self.body_set.remove(&tail);
        }
    }
}

impl Serialize for Snake {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.body.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_trails_behind_head() {
        let snake = Snake::new(Position::new(10, 10), Direction::Right, 3, 20);
        assert_eq!(
            snake.to_vec(),
            vec![Position::new(10, 10), Position::new(9, 10), Position::new(8, 10)]
        );
    }

    #[test]
    fn test_new_wraps_on_edge() {
        let snake = Snake::new(Position::new(0, 0), Direction::Down, 3, 20);
        assert_eq!(
            snake.to_vec(),
            vec![Position::new(0, 0), Position::new(0, 19), Position::new(0, 18)]
        );
    }

    #[test]
    fn test_push_head_moves_and_grows() {
        let mut snake = Snake::new(Position::new(5, 5), Direction::Right, 3, 20);
        snake.push_head(Position::new(6, 5), false);
        assert_eq!(snake.len(), 3);
        assert!(!snake.contains(Position::new(3, 5)));
        assert_eq!(snake.tail(), Position::new(4, 5));

        snake.push_head(Position::new(7, 5), true);
        assert_eq!(snake.len(), 4);
        assert_eq!(snake.head(), Position::new(7, 5));
        assert_eq!(snake.tail(), Position::new(4, 5));
    }

    #[test]
    fn test_serializes_as_position_list() {
        let snake = Snake::from_segments([Position::new(1, 2), Position::new(0, 2)]);
        assert_eq!(
            serde_json::to_string(&snake).unwrap(),
            r#"[{"x":1,"y":2},{"x":0,"y":2}]"#
        );
    }
}
