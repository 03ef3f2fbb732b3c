use serde::{Deserialize, Serialize};

use crate::types::User;

/// What the user did with the current candidate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Swipe {
    Like,
    Pass,
}

/// Candidate deck for the discovery view.
///
/// Swipes advance the cursor before any request is made and are never rolled
/// back by a failed request.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryDeck {
    candidates: Vec<User>,
    cursor: usize,
}

impl DiscoveryDeck {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a fresh feed and start from its first candidate.
    pub fn replace(&mut self, candidates: Vec<User>) {
        self.candidates = candidates;
        self.cursor = 0;
    }

    pub fn current(&self) -> Option<&User> {
        self.candidates.get(self.cursor)
    }

    /// Move past the current candidate.
    ///
    /// Returns the candidate swiped on, or `None` once the deck is exhausted.
    pub fn advance_optimistic(&mut self, swipe: Swipe) -> Option<(Swipe, User)> {
        let user = self.current()?.clone();
        self.cursor += 1;
        Some((swipe, user))
    }

    /// Step back to the previous candidate. Returns `false` at the start.
    pub fn rewind(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        true
    }

    pub fn remaining(&self) -> usize {
        self.candidates.len().saturating_sub(self.cursor)
    }

    pub fn is_exhausted(&self) -> bool {
        self.current().is_none()
    }
}
