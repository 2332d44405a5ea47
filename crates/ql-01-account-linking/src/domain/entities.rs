//! # Domain Entities
//!
//! Core data structures of the linking protocol.
//!
//! ```text
//! Challenge ──encode──→ LinkingPayload ──(QR)──→ device
//!     ↑                                             │
//!     └──────────── ScanResponse ←──────────────────┘
//!                        │
//!                        ↓ (all gates pass)
//!                  LinkingResult ──→ sink
//! ```

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::time::rfc3339_millis;

/// Timestamp in milliseconds since UNIX epoch.
pub type Timestamp = u64;

/// Raw bytes of challenge entropy (256 bits).
pub const CHALLENGE_BYTES: usize = 32;

/// Minimum base64url length of a challenge value (32 bytes, no padding).
pub const MIN_CHALLENGE_CHARS: usize = 43;

/// Raw bytes of auxiliary entropy bound into each challenge.
pub const AUX_ENTROPY_BYTES: usize = 16;

/// Status carried by every successful link.
pub const LINKED_STATUS: &str = "linked";

/// Verification method recorded on successful links.
pub const VERIFICATION_METHOD: &str = "qr_challenge_response";

// =============================================================================
// CHALLENGE
// =============================================================================

/// One issued linking opportunity.
///
/// Immutable after issuance. Deliberately not serializable: only the
/// derived `LinkingPayload` crosses the trust boundary, and the auxiliary
/// entropy never does.
#[derive(Clone, PartialEq, Eq)]
pub struct Challenge {
    value: String,
    issued_at: Timestamp,
    expires_at: Timestamp,
    aux_entropy: String,
}

impl Challenge {
    pub(crate) fn new(
        value: String,
        issued_at: Timestamp,
        expires_at: Timestamp,
        aux_entropy: String,
    ) -> Self {
        Self {
            value,
            issued_at,
            expires_at,
            aux_entropy,
        }
    }

    /// URL-safe token the device must sign and echo back.
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn issued_at(&self) -> Timestamp {
        self.issued_at
    }

    pub fn expires_at(&self) -> Timestamp {
        self.expires_at
    }

    pub fn aux_entropy(&self) -> &str {
        &self.aux_entropy
    }

    /// Lifetime in milliseconds.
    pub fn lifetime_ms(&self) -> u64 {
        self.expires_at - self.issued_at
    }

    /// Expired once `now` is strictly past `expires_at`.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        now > self.expires_at
    }

    /// Short digest of the value, safe to put in logs.
    pub fn fingerprint(&self) -> String {
        fingerprint(&self.value)
    }
}

impl std::fmt::Debug for Challenge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Challenge")
            .field("fingerprint", &self.fingerprint())
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// First 8 bytes of SHA-256 over `value`, hex encoded.
pub fn fingerprint(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    hex::encode(&digest[..8])
}

// =============================================================================
// SCAN RESPONSE
// =============================================================================

/// Claim submitted by the scanning device.
///
/// Missing string fields deserialize as empty so that completeness is
/// judged by the validator rather than rejected by the parser.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResponse {
    #[serde(default)]
    pub challenge: String,
    /// Public identifier (AID) of the device identity.
    #[serde(default, alias = "aid")]
    pub identifier: String,
    #[serde(default)]
    pub wallet_address: String,
    /// Signature over the challenge bytes.
    #[serde(default)]
    pub signature: String,
    #[serde(with = "rfc3339_millis")]
    pub timestamp: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
}

impl ScanResponse {
    pub fn new(
        challenge: impl Into<String>,
        identifier: impl Into<String>,
        wallet_address: impl Into<String>,
        signature: impl Into<String>,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            challenge: challenge.into(),
            identifier: identifier.into(),
            wallet_address: wallet_address.into(),
            signature: signature.into(),
            timestamp,
            nonce: None,
        }
    }

    pub fn with_nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    /// Names of required fields that are absent or blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("challenge", &self.challenge),
            ("identifier", &self.identifier),
            ("walletAddress", &self.wallet_address),
            ("signature", &self.signature),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

// =============================================================================
// LINKING RESULT
// =============================================================================

/// Durable record of a successful link.
///
/// Only the success transition builds one, and it never carries signature
/// or challenge material.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkingResult {
    identifier: String,
    wallet_address: String,
    #[serde(with = "rfc3339_millis")]
    linked_at: Timestamp,
    status: &'static str,
    verification_method: &'static str,
}

impl LinkingResult {
    pub(crate) fn linked(response: &ScanResponse, linked_at: Timestamp) -> Self {
        Self {
            identifier: response.identifier.clone(),
            wallet_address: response.wallet_address.clone(),
            linked_at,
            status: LINKED_STATUS,
            verification_method: VERIFICATION_METHOD,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn wallet_address(&self) -> &str {
        &self.wallet_address
    }

    pub fn linked_at(&self) -> Timestamp {
        self.linked_at
    }

    pub fn status(&self) -> &str {
        self.status
    }

    pub fn verification_method(&self) -> &str {
        self.verification_method
    }
}

// =============================================================================
// LINK STATE
// =============================================================================

/// Observable lifecycle state of one challenge.
///
/// ```text
/// [ISSUED] ──scan──→ [SCANNED] ──accept──→ [LINKED]
///     │                  │
///     │                  └──reject──→ [REJECTED]
///     └────────┬─────────┘
///              └──now > expires_at──→ [EXPIRED]
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LinkState {
    Issued,
    Scanned,
    Linked,
    Rejected,
    Expired,
}

impl LinkState {
    /// No transitions leave a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Linked | Self::Rejected | Self::Expired)
    }
}

impl std::fmt::Display for LinkState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Issued => "ISSUED",
            Self::Scanned => "SCANNED",
            Self::Linked => "LINKED",
            Self::Rejected => "REJECTED",
            Self::Expired => "EXPIRED",
        };
        f.write_str(name)
    }
}
