//! Notifications emitted by committed faucet transitions.

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// An observable state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "PascalCase")]
pub enum FaucetEvent {
    /// `account` received `amount` through a successful claim
    TokensClaimed { account: Address, amount: U256 },
    /// The administrator set the pause flag to `paused`
    FaucetPaused { paused: bool },
}

/// A committed event together with its position in the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Zero-based, strictly increasing position in the log
    pub sequence: u64,
    /// Timestamp the emitting call was evaluated at
    pub timestamp: u64,
    pub event: FaucetEvent,
}

/// Append-only event log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLog {
    entries: Vec<LogEntry>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `event` and return the stored entry.
    pub fn append(&mut self, event: FaucetEvent, timestamp: u64) -> LogEntry {
        let entry = LogEntry {
            sequence: self.entries.len() as u64,
            timestamp,
            event,
        };
        self.entries.push(entry.clone());
        entry
    }

    /// Entries with a sequence number of at least `sequence`.
    pub fn since(&self, sequence: u64) -> &[LogEntry] {
        let start = usize::try_from(sequence)
            .unwrap_or(usize::MAX)
            .min(self.entries.len());
        &self.entries[start..]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
