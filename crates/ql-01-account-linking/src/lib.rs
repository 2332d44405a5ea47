//! # Account Linking Subsystem (QL-01)
//!
//! Links an edge device's public identity to a wallet account through a
//! QR challenge-response exchange.
//!
//! ## Architecture
//!
//! This subsystem follows hexagonal architecture:
//! - **Domain Layer** (`domain/`): challenge issuance, payload codec, response
//!   validation and the linking state machine. No I/O.
//! - **Ports Layer** (`ports/`): the linking API plus identity verification,
//!   challenge storage, link persistence and time
//! - **Service Layer** (`service.rs`): wires domain logic to ports
//! - **Adapters** (`adapters/`): in-memory store, Ed25519 key state, device
//!   simulator, sinks and a manual clock
//!
//! ## Security Notes
//!
//! - **Edge protection**: every payload and response is scanned for key
//!   material before it is encoded, signed off or accepted
//! - **Single use**: a challenge resolves at most once; later submissions
//!   get `AlreadyResolved`
//! - **Constant-time comparison** of challenge values
//! - Challenge values are never logged; logs carry an 8-byte fingerprint

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

// Re-export public API
pub use domain::codec::{EncodedPayload, LinkingPayload, PayloadCodec};
pub use domain::config::{ConfigError, LinkingConfig};
pub use domain::entities::{
    fingerprint, Challenge, LinkState, LinkingResult, ScanResponse, Timestamp,
};
pub use domain::errors::{DecodeError, LinkingError, RejectionReason};
pub use domain::issuer::ChallengeIssuer;
pub use domain::report::OutcomeTally;
pub use domain::state_machine::{ChallengeRecord, LinkingAttempt};
pub use domain::validator::{ResponseValidator, ValidationOutcome};
pub use ports::inbound::{AccountLinkingApi, IssuedLink};
pub use ports::outbound::{
    ChallengeStore, IdentityVerifier, LinkSink, SinkError, StoreError, SystemTimeSource,
    TimeSource,
};
pub use service::AccountLinkingService;
