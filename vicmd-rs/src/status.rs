//! Status line and message history.

use std::collections::VecDeque;

/// Messages kept for `:messages`.
pub const HISTORY_LIMIT: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub text: String,
    pub is_error: bool,
}

/// The single status line plus a bounded log of everything posted to it.
#[derive(Debug, Default)]
pub struct StatusBar {
    current: Option<Message>,
    history: VecDeque<Message>,
    /// Posted but not yet collected with [`StatusBar::drain_pending`].
    pending: Vec<Message>,
}

impl StatusBar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn post(&mut self, text: &str, is_error: bool) {
        let msg = Message {
            text: text.to_owned(),
            is_error,
        };
        if !text.is_empty() {
            if self.history.len() == HISTORY_LIMIT {
                self.history.pop_front();
            }
            self.history.push_back(msg.clone());
            self.pending.push(msg.clone());
        }
        self.current = Some(msg);
    }

    pub fn current(&self) -> Option<&Message> {
        self.current.as_ref()
    }

    /// Remove and return the status line.
    pub fn take(&mut self) -> Option<Message> {
        self.current.take()
    }

    pub fn clear(&mut self) {
        self.current = None;
    }

    pub fn history(&self) -> impl Iterator<Item = &Message> {
        self.history.iter()
    }

    /// Every non-empty message posted since the last call, oldest first.
    pub fn drain_pending(&mut self) -> std::vec::Drain<'_, Message> {
        self.pending.drain(..)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
