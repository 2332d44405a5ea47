//! Outbound (Driven) ports for the Account Linking subsystem.
//!
//! These traits define the external collaborators the linking core relies
//! on. None of them is implemented for production here; `adapters/` holds
//! in-memory reference implementations.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{ChallengeRecord, LinkingResult, Timestamp};

/// Identity signature verification (Driven Port).
///
/// An opaque oracle: key rotation history and multi-signature thresholds
/// are the implementor's concern. Any internal failure must answer `false`.
pub trait IdentityVerifier: Send + Sync {
    /// Whether `signature` over `message` verifies under the currently
    /// authoritative keys of `identifier`.
    fn verify(&self, identifier: &str, message: &[u8], signature: &str) -> bool;
}

/// Challenge store failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// A record already exists for this value
    #[error("challenge already stored")]
    Duplicate,

    /// The backing store is unavailable
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Store of issued challenges keyed by challenge value (Driven Port).
///
/// # Atomicity
///
/// `compare_and_set` must be atomic with respect to every other call for
/// the same value. The `ISSUED → SCANNED` swap is the claim that decides
/// which of several concurrent submissions resolves the challenge.
pub trait ChallengeStore: Send + Sync {
    /// Insert a new record.
    fn put(&self, value: &str, record: ChallengeRecord) -> Result<(), StoreError>;

    /// Snapshot of the record for `value`, if any.
    fn get_and_lock(&self, value: &str) -> Result<Option<ChallengeRecord>, StoreError>;

    /// Replace the record with `new` iff it currently equals `expected`.
    fn compare_and_set(
        &self,
        value: &str,
        expected: &ChallengeRecord,
        new: ChallengeRecord,
    ) -> Result<bool, StoreError>;
}

/// Link sink failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SinkError {
    /// The sink refused the record
    #[error("link rejected by sink: {0}")]
    Rejected(String),

    /// The sink is unavailable
    #[error("sink unavailable: {0}")]
    Unavailable(String),
}

/// Receiver of successful links (Driven Port).
#[async_trait]
pub trait LinkSink: Send + Sync {
    /// Durably record the identifier-to-wallet binding.
    async fn record(&self, result: &LinkingResult) -> Result<(), SinkError>;
}

/// Time source for consistent timestamp handling.
///
/// Abstracted to allow testing with deterministic time.
pub trait TimeSource: Send + Sync {
    /// Returns the current timestamp in milliseconds.
    fn now(&self) -> Timestamp;
}

/// Default system time source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Timestamp {
        crate::domain::time::now_millis()
    }
}

impl<T: IdentityVerifier + ?Sized> IdentityVerifier for std::sync::Arc<T> {
    fn verify(&self, identifier: &str, message: &[u8], signature: &str) -> bool {
        (**self).verify(identifier, message, signature)
    }
}

impl<T: ChallengeStore + ?Sized> ChallengeStore for std::sync::Arc<T> {
    fn put(&self, value: &str, record: ChallengeRecord) -> Result<(), StoreError> {
        (**self).put(value, record)
    }

    fn get_and_lock(&self, value: &str) -> Result<Option<ChallengeRecord>, StoreError> {
        (**self).get_and_lock(value)
    }

    fn compare_and_set(
        &self,
        value: &str,
        expected: &ChallengeRecord,
        new: ChallengeRecord,
    ) -> Result<bool, StoreError> {
        (**self).compare_and_set(value, expected, new)
    }
}

#[async_trait]
impl<T: LinkSink + ?Sized> LinkSink for std::sync::Arc<T> {
    async fn record(&self, result: &LinkingResult) -> Result<(), SinkError> {
        (**self).record(result).await
    }
}

impl<T: TimeSource + ?Sized> TimeSource for std::sync::Arc<T> {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}
