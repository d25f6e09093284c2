//! In-memory transfer registry: `transfer_id -> TransferRecord`.
//!
//! Concurrent-safe via `DashMap`, which gives per-key locking rather than a
//! single mutex guarding the whole map — the same shape
//! `umbra-relay::state::RelayState` uses for its online-client and session
//! tables. The registry never performs I/O and never blocks on anything
//! other than a per-key lock, so callers may safely hold a registry
//! reference across `.await` points elsewhere in their own code.

use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;

use crate::error::{Error, Result};
use crate::record::{RecordPatch, TransferRecord, TransferState};

/// The process-local, transient registry of in-flight and completed
/// transfers. Registry ownership is exclusive: external code only ever
/// observes read-only snapshots (`TransferRecord` is `Clone`).
#[derive(Debug, Default)]
pub struct TransferRegistry {
    records: DashMap<String, TransferRecord>,
}

impl TransferRegistry {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }

    /// Insert a fresh record in state `Receiving`. Rejects with
    /// `Error::Conflict` if `transfer_id` already has a record — a
    /// concurrent sender-side id collision is treated as a sender bug,
    /// never as "return the existing record".
    pub fn create(&self, transfer_id: &str, filename: &str) -> Result<TransferRecord> {
        use dashmap::mapref::entry::Entry;

        match self.records.entry(transfer_id.to_string()) {
            Entry::Occupied(_) => {
                tracing::warn!(transfer_id, "rejected duplicate transfer id");
                Err(Error::Conflict(transfer_id.to_string()))
            }
            Entry::Vacant(slot) => {
                let record = TransferRecord::new(transfer_id.to_string(), filename.to_string());
                slot.insert(record.clone());
                tracing::debug!(transfer_id, filename, "transfer record created");
                Ok(record)
            }
        }
    }

    /// Return a snapshot of the record, or `None` if unknown.
    pub fn get(&self, transfer_id: &str) -> Option<TransferRecord> {
        self.records.get(transfer_id).map(|r| r.clone())
    }

    /// Atomically apply a patch to the record. Returns `None` if the id is
    /// unknown. Mutations that would transition out of a terminal state
    /// are silently ignored (the record is returned unchanged) — this
    /// makes `update` safe to call from a handler racing a timeout or a
    /// late chunk after the record has already gone terminal.
    pub fn update(&self, transfer_id: &str, patch: RecordPatch) -> Option<TransferRecord> {
        let mut entry = self.records.get_mut(transfer_id)?;

        if entry.is_terminal() {
            return Some(entry.clone());
        }

        if let Some(bytes_received) = patch.bytes_received {
            debug_assert!(
                bytes_received >= entry.bytes_received,
                "bytes_received must be monotonically non-decreasing"
            );
            entry.bytes_received = bytes_received.max(entry.bytes_received);
        }
        if let Some(stored_as) = patch.stored_as {
            entry.stored_as = stored_as;
        }
        if let Some(error) = patch.error {
            entry.error = Some(error);
        }
        if let Some(state) = patch.state {
            entry.state = state;
        }

        Some(entry.clone())
    }

    /// Remove terminal records older than `max_age`. Returns the number of
    /// records removed. Intended to be driven by a periodic background
    /// task (see `msxfer-server`'s sweep loop), not called inline from a
    /// request handler.
    pub fn sweep(&self, max_age: Duration) -> usize {
        let now = Utc::now();
        let threshold = chrono::Duration::from_std(max_age).unwrap_or(chrono::Duration::zero());

        let expired: Vec<String> = self
            .records
            .iter()
            .filter(|entry| {
                entry.is_terminal() && now.signed_duration_since(entry.created_at) > threshold
            })
            .map(|entry| entry.key().clone())
            .collect();

        for transfer_id in &expired {
            self.records.remove(transfer_id);
        }

        if !expired.is_empty() {
            tracing::debug!(count = expired.len(), "swept expired transfer records");
        }

        expired.len()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn create_then_get_round_trips() {
        let registry = TransferRegistry::new();
        let created = registry.create("t1", "alpha.msz").unwrap();
        assert_eq!(created.state, TransferState::Receiving);

        let fetched = registry.get("t1").unwrap();
        assert_eq!(fetched.transfer_id, "t1");
        assert_eq!(fetched.filename, "alpha.msz");
    }

    #[test]
    fn create_rejects_duplicate_id() {
        let registry = TransferRegistry::new();
        registry.create("dup", "a.msz").unwrap();
        let err = registry.create("dup", "b.msz").unwrap_err();
        assert!(matches!(err, Error::Conflict(id) if id == "dup"));
    }

    #[test]
    fn get_unknown_id_returns_none() {
        let registry = TransferRegistry::new();
        assert!(registry.get("nope").is_none());
    }

    #[test]
    fn update_is_monotonic_on_bytes_received() {
        let registry = TransferRegistry::new();
        registry.create("t1", "a.msz").unwrap();

        registry.update("t1", RecordPatch::new().bytes_received(100));
        let rec = registry
            .update("t1", RecordPatch::new().bytes_received(40))
            .unwrap();
        assert_eq!(rec.bytes_received, 100, "bytes_received must never decrease");
    }

    #[test]
    fn update_unknown_id_returns_none() {
        let registry = TransferRegistry::new();
        assert!(registry
            .update("nope", RecordPatch::new().bytes_received(1))
            .is_none());
    }

    #[test]
    fn no_mutation_out_of_terminal_state() {
        let registry = TransferRegistry::new();
        registry.create("t1", "a.msz").unwrap();
        registry.update("t1", RecordPatch::new().state(TransferState::Done));

        let after = registry
            .update(
                "t1",
                RecordPatch::new()
                    .state(TransferState::Error)
                    .error("too late"),
            )
            .unwrap();
        assert_eq!(after.state, TransferState::Done);
        assert!(after.error.is_none());
    }

    #[test]
    fn error_is_set_only_on_error_state() {
        let registry = TransferRegistry::new();
        registry.create("t1", "a.msz").unwrap();
        let rec = registry
            .update(
                "t1",
                RecordPatch::new().state(TransferState::Error).error("boom"),
            )
            .unwrap();
        assert_eq!(rec.state, TransferState::Error);
        assert_eq!(rec.error.as_deref(), Some("boom"));
    }

    #[test]
    fn sweep_removes_only_old_terminal_records() {
        let registry = TransferRegistry::new();
        registry.create("old-done", "a.msz").unwrap();
        registry.update("old-done", RecordPatch::new().state(TransferState::Done));
        registry.create("fresh-receiving", "b.msz").unwrap();
        registry.create("old-but-active", "c.msz").unwrap();

        // Force "old-done" into the past by re-inserting with a backdated
        // created_at; DashMap entries are plain structs so this is a
        // direct mutation through the same API surface a real sweep run
        // would observe after enough wall-clock time passes.
        if let Some(mut entry) = registry.records.get_mut("old-done") {
            entry.created_at = Utc::now() - chrono::Duration::hours(1);
        }

        let removed = registry.sweep(Duration::from_secs(300));
        assert_eq!(removed, 1);
        assert!(registry.get("old-done").is_none());
        assert!(registry.get("fresh-receiving").is_some());
        assert!(registry.get("old-but-active").is_some());
    }

    #[test]
    fn concurrent_creates_do_not_corrupt_the_map() {
        let registry = std::sync::Arc::new(TransferRegistry::new());
        let mut handles = Vec::new();

        for i in 0..16 {
            let registry = registry.clone();
            handles.push(thread::spawn(move || {
                let id = format!("t{i}");
                registry.create(&id, "a.msz").unwrap();
                for n in 0..50 {
                    registry.update(&id, RecordPatch::new().bytes_received(n));
                }
            }));
        }

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(registry.len(), 16);
        for i in 0..16 {
            let rec = registry.get(&format!("t{i}")).unwrap();
            assert_eq!(rec.bytes_received, 49);
        }
    }
}
