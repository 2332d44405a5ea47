//! In-memory challenge store.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::domain::{ChallengeRecord, Timestamp};
use crate::ports::outbound::{ChallengeStore, StoreError};

/// Challenge records behind a single mutex.
///
/// Every operation holds the lock for its whole read-check-write, which
/// makes `compare_and_set` atomic per value.
#[derive(Debug, Default)]
pub struct InMemoryChallengeStore {
    records: Mutex<HashMap<String, ChallengeRecord>>,
}

impl InMemoryChallengeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Drop every record whose challenge expired before `now`, terminal or
    /// not. Returns how many were removed.
    pub fn sweep_expired(&self, now: Timestamp) -> usize {
        let mut records = self.records.lock();
        let before = records.len();
        records.retain(|_, record| now <= record.expires_at());
        let removed = before - records.len();
        if removed > 0 {
            tracing::debug!(removed, remaining = records.len(), "swept expired challenges");
        }
        removed
    }
}

impl ChallengeStore for InMemoryChallengeStore {
    fn put(&self, value: &str, record: ChallengeRecord) -> Result<(), StoreError> {
        let mut records = self.records.lock();
        if records.contains_key(value) {
            return Err(StoreError::Duplicate);
        }
        records.insert(value.to_string(), record);
        Ok(())
    }

    fn get_and_lock(&self, value: &str) -> Result<Option<ChallengeRecord>, StoreError> {
        Ok(self.records.lock().get(value).cloned())
    }

    fn compare_and_set(
        &self,
        value: &str,
        expected: &ChallengeRecord,
        new: ChallengeRecord,
    ) -> Result<bool, StoreError> {
        let mut records = self.records.lock();
        match records.get_mut(value) {
            Some(current) if current == expected => {
                *current = new;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
