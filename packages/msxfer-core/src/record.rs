//! The Transfer Record data model — a single row in the transfer registry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The lifecycle state of one transfer.
///
/// Valid transitions: `Receiving -> Received -> Done`,
/// `Receiving -> Received -> Decompressing -> Done`, or any non-terminal
/// state `-> Error`. There is no transition out of a terminal state
/// (`Done` or `Error`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferState {
    Receiving,
    Received,
    Decompressing,
    Done,
    Error,
}

impl TransferState {
    /// Terminal states accept no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, TransferState::Done | TransferState::Error)
    }
}

/// A row in the transfer registry: the authoritative state of one
/// end-to-end delivery of one file, identified by `transfer_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRecord {
    pub transfer_id: String,
    /// Original filename as declared by the sender. Untrusted.
    pub filename: String,
    pub state: TransferState,
    /// Monotonic non-decreasing count of body bytes written to disk.
    pub bytes_received: u64,
    /// Absolute path of the final artifact. Empty until `state == Done`.
    #[serde(default)]
    pub stored_as: String,
    /// Human-readable failure message. Set iff `state == Error`.
    #[serde(default)]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TransferRecord {
    pub fn new(transfer_id: String, filename: String) -> Self {
        Self {
            transfer_id,
            filename,
            state: TransferState::Receiving,
            bytes_received: 0,
            stored_as: String::new(),
            error: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

/// A set of field mutations applied atomically to a `TransferRecord` by
/// `TransferRegistry::update`. Mirrors the original's keyword-argument
/// bag (`registry.update(id, state=..., bytes_received=...)`) as a sum of
/// typed, optional field updates.
#[derive(Debug, Clone, Default)]
pub struct RecordPatch {
    pub state: Option<TransferState>,
    pub bytes_received: Option<u64>,
    pub stored_as: Option<String>,
    pub error: Option<String>,
}

impl RecordPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(mut self, state: TransferState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn bytes_received(mut self, n: u64) -> Self {
        self.bytes_received = Some(n);
        self
    }

    pub fn stored_as(mut self, path: impl Into<String>) -> Self {
        self.stored_as = Some(path.into());
        self
    }

    pub fn error(mut self, msg: impl Into<String>) -> Self {
        self.error = Some(msg.into());
        self
    }
}
