//! Bounded conversation log with a movable cursor
//!
//! Append-only and size-bounded: once the cap is reached the oldest
//! turn is evicted first. The cursor backs "cycle to previous turn" in
//! the editor and always stays clamped within the log.

use std::collections::VecDeque;
use std::sync::Arc;

use nib_ai::{Role, Turn};

use crate::store::HistoryStore;

/// Append-only, size-bounded sequence of turns
pub struct ConversationLog {
    turns: VecDeque<Turn>,
    /// Index of the cursor; meaningless when the log is empty
    cursor: usize,
    max_turns: usize,
    store: Arc<dyn HistoryStore>,
}

impl ConversationLog {
    /// Create a log backed by `store`, loading whatever it holds.
    ///
    /// A corrupt or unreadable store degrades to an empty log; that is
    /// reported, never fatal.
    pub fn new(max_turns: usize, store: Arc<dyn HistoryStore>) -> Self {
        let max_turns = max_turns.max(1);
        let mut turns = match store.load() {
            Ok(turns) => VecDeque::from(turns),
            Err(e) => {
                tracing::warn!("history store unreadable, starting empty: {e}");
                VecDeque::new()
            }
        };
        while turns.len() > max_turns {
            turns.pop_front();
        }

        let cursor = turns.len().saturating_sub(1);
        Self {
            turns,
            cursor,
            max_turns,
            store,
        }
    }

    /// Add a turn to the end, evicting from the front past the cap.
    ///
    /// Resets the cursor to the new end and rewrites the store. A store
    /// failure is reported but does not roll back the in-memory append.
    pub fn append(&mut self, turn: Turn) {
        self.turns.push_back(turn);
        while self.turns.len() > self.max_turns {
            self.turns.pop_front();
        }
        self.cursor = self.turns.len() - 1;

        let snapshot: Vec<Turn> = self.turns.iter().cloned().collect();
        if let Err(e) = self.store.save(&snapshot) {
            tracing::warn!("history persist failed: {e}");
        }
    }

    /// Move the cursor by `step` (negative for older turns), clamped to
    /// the log bounds, and return the turn there. `None` when empty.
    pub fn cycle(&mut self, step: i64) -> Option<&Turn> {
        if self.turns.is_empty() {
            return None;
        }
        let max = (self.turns.len() - 1) as i64;
        let target = (self.cursor as i64).saturating_add(step).clamp(0, max);
        self.cursor = target as usize;
        self.turns.get(self.cursor)
    }

    /// The most recent assistant turn's text, if any
    pub fn last_assistant_text(&self) -> Option<&str> {
        self.turns
            .iter()
            .rev()
            .find(|t| t.role == Role::Assistant)
            .map(|t| t.content.as_str())
    }

    /// All turns, oldest first
    pub fn turns(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
