use std::collections::VecDeque;

use super::grid::Cell;
use super::item::Direction;

/// Turns buffered ahead of the next ticks.
pub const MAX_QUEUED_TURNS: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct Snake {
    /// Head first.
    body: VecDeque<Cell>,
    heading: Direction,
    turns: VecDeque<Direction>,
    pending_growth: usize,
}

impl Snake {
    pub fn new(body: Vec<Cell>, heading: Direction) -> Self {
        assert!(!body.is_empty(), "snake needs at least one cell");
        Snake {
            body: body.into(),
            heading,
            turns: VecDeque::new(),
            pending_growth: 0,
        }
    }

    pub fn head(&self) -> Cell {
        self.body[0]
    }

    pub fn tail(&self) -> Cell {
        self.body[self.body.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        self.body.iter().copied()
    }

    pub fn heading(&self) -> Direction {
        self.heading
    }

    pub fn pending_growth(&self) -> usize {
        self.pending_growth
    }

    /// Queues a turn. Repeats and reversals of the last queued heading are dropped.
    pub fn steer(&mut self, direction: Direction) -> bool {
        let last = self.turns.back().copied().unwrap_or(self.heading);
        if direction == last || direction == last.opposite() || self.turns.len() >= MAX_QUEUED_TURNS {
            return false;
        }
        self.turns.push_back(direction);
        true
    }

    /// The heading the next move will use.
    pub fn next_heading(&self) -> Direction {
        self.turns.front().copied().unwrap_or(self.heading)
    }

    pub fn next_head(&self) -> Cell {
        let (dx, dy) = self.next_heading().delta();
        self.head().offset(dx, dy)
    }

    /// The tail cell the next move frees, unless the snake is growing.
    pub fn vacating_tail(&self) -> Option<Cell> {
        if self.pending_growth == 0 {
            Some(self.tail())
        } else {
            None
        }
    }

    pub fn grow(&mut self, segments: usize) {
        self.pending_growth += segments;
    }

    /// Moves one cell along the next heading. Returns the new head and the freed tail cell.
    pub fn advance(&mut self) -> (Cell, Option<Cell>) {
        let head = self.next_head();
        if let Some(turn) = self.turns.pop_front() {
            self.heading = turn;
        }

        let vacated = if self.pending_growth > 0 {
            self.pending_growth -= 1;
            None
        } else {
            self.body.pop_back()
        };
        self.body.push_front(head);
        (head, vacated)
    }
}
