//! Puzzle bookkeeping: a tree root with a spaced-repetition schedule.

use chrono::{DateTime, NaiveTime, TimeDelta, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::move_tree::NodeId;

pub type PuzzleId = usize;

/// Whether a puzzle can be attempted, edited, or neither, today.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    Solvable,
    Editable,
    Locked,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Puzzle {
    pub id: PuzzleId,
    /// Root node of the puzzle's line.
    pub board: NodeId,
    pub due: DateTime<Utc>,
    pub solved: DateTime<Utc>,
    /// Wrong moves in the current attempt.
    pub strikes: u16,
    pub finished: bool,
}

impl Puzzle {
    pub fn new(id: PuzzleId, board: NodeId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            board,
            due: now,
            solved: now - TimeDelta::days(1),
            strikes: 0,
            finished: false,
        }
    }

    /// Schedule the next attempt. The fewer strikes, the longer the gap:
    /// none doubles the previous interval, one keeps it, two halves it (at
    /// least a day), more resets it to a day.
    pub fn reschedule(&mut self, now: DateTime<Utc>) {
        let day = TimeDelta::days(1);
        let interval = self.due - self.solved;
        self.due = match self.strikes {
            0 => now + interval * 2,
            1 => now + interval,
            2 => now + day.max(interval / 2),
            _ => now + day,
        };
        self.solved = now;
        self.finished = true;
    }

    pub fn phase(&self, now: DateTime<Utc>) -> Phase {
        let today = now.date_naive();
        if self.due < now || self.due.date_naive() == today {
            Phase::Solvable
        } else if self.solved.date_naive() == today {
            Phase::Editable
        } else {
            Phase::Locked
        }
    }

    /// Due by the end of today, or already solved today.
    pub fn on_today(&self, now: DateTime<Utc>) -> bool {
        let start = now.date_naive().and_time(NaiveTime::MIN).and_utc();
        let end = start + TimeDelta::days(1);
        self.due <= end || (start <= self.solved && self.solved <= end)
    }
}
