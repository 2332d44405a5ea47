//! Account-linking error types.
//!
//! Every failure surfaces with its specific kind. Payloads carry pattern
//! identifiers, structural locations and timestamps only, never challenge
//! tokens, signatures or offending values.

use shared_policy::{PolicyConfigError, PolicyError, ScanFailure, Violation};
use thiserror::Error;

use super::config::ConfigError;
use super::entities::{LinkState, Timestamp};

/// Structural problems with an incoming transport payload.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// Not base64url, not UTF-8, or not a JSON object
    #[error("malformed payload: {0}")]
    Malformed(String),

    /// A required field is absent
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    /// A required field has the wrong shape
    #[error("field `{0}` has the wrong shape")]
    InvalidField(&'static str),

    /// The `type` discriminator is not the one this codec speaks. The
    /// received value is sender-controlled and is not kept.
    #[error("payload type mismatch: expected {expected:?}")]
    TypeMismatch { expected: String },
}

/// Why a validator gate refused a response.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RejectionReason {
    /// Response names a different challenge
    #[error("response challenge does not match the issued challenge")]
    ChallengeMismatch,

    /// Response claims to predate the challenge
    #[error("response timestamp {timestamp} is not after issuance at {issued_at}")]
    TemporalOrderingViolation {
        issued_at: Timestamp,
        timestamp: Timestamp,
    },

    /// Required fields are absent or blank
    #[error("response is missing required fields: {}", join_fields(.missing))]
    IncompleteResponse { missing: Vec<&'static str> },

    /// Response carries forbidden content
    #[error("sensitivity violation: {}", describe(.violations))]
    SensitivityViolation { violations: Vec<Violation> },

    /// Response could not be scanned at all
    #[error("scan failure: {0}")]
    ScanFailure(ScanFailure),

    /// Signature does not verify under the identifier's current keys
    #[error("signature does not verify for the claimed identifier")]
    SignatureInvalid,
}

fn describe(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn join_fields(fields: &[&'static str]) -> String {
    fields.join(", ")
}

impl RejectionReason {
    /// Stable machine-readable name of the reason.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ChallengeMismatch => "challenge_mismatch",
            Self::TemporalOrderingViolation { .. } => "temporal_ordering_violation",
            Self::IncompleteResponse { .. } => "incomplete_response",
            Self::SensitivityViolation { .. } => "sensitivity_violation",
            Self::ScanFailure(_) => "scan_failure",
            Self::SignatureInvalid => "signature_invalid",
        }
    }
}

/// Account-linking error type.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LinkingError {
    /// Input to the policy engine could not be scanned
    #[error("scan failure: {0}")]
    ScanFailure(ScanFailure),

    /// Forbidden content detected
    #[error("sensitivity violation: {}", describe(.violations))]
    SensitivityViolation { violations: Vec<Violation> },

    /// Encoded payload exceeds the transport ceiling
    #[error("encoded payload is {size} bytes, limit is {limit}")]
    EncodingTooLarge { size: usize, limit: usize },

    /// Transport payload could not be decoded
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Challenge lifetime has elapsed
    #[error("challenge expired at {expires_at} (now {now})")]
    ChallengeExpired { expires_at: Timestamp, now: Timestamp },

    /// Response names a different challenge
    #[error("response challenge does not match the issued challenge")]
    ChallengeMismatch,

    /// Response claims to predate the challenge
    #[error("response timestamp {timestamp} is not after issuance at {issued_at}")]
    TemporalOrderingViolation {
        issued_at: Timestamp,
        timestamp: Timestamp,
    },

    /// Required response fields are absent or blank
    #[error("response is missing required fields: {}", join_fields(.missing))]
    IncompleteResponse { missing: Vec<&'static str> },

    /// Signature does not verify under the identifier's current keys
    #[error("signature does not verify for the claimed identifier")]
    SignatureInvalid,

    /// Challenge already reached a terminal outcome or is being resolved
    #[error("challenge already resolved ({state})")]
    AlreadyResolved { state: LinkState },

    /// No challenge with this value is held by the store
    #[error("unknown challenge")]
    UnknownChallenge,

    /// Lifetime is zero or overflows the clock
    #[error("invalid challenge lifetime: {lifetime_ms} ms")]
    InvalidLifetime { lifetime_ms: u128 },

    /// Callback location is not an absolute URI
    #[error("invalid callback location")]
    InvalidCallback,

    /// The random source failed or produced an unusable token
    #[error("challenge generation failed: {0}")]
    ChallengeGeneration(String),

    /// Challenge store failure
    #[error("challenge store error: {0}")]
    Store(String),

    /// Link sink failure
    #[error("link sink error: {0}")]
    Sink(String),

    /// Unusable configuration
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl LinkingError {
    /// Stable machine-readable name of the error.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ScanFailure(_) => "scan_failure",
            Self::SensitivityViolation { .. } => "sensitivity_violation",
            Self::EncodingTooLarge { .. } => "encoding_too_large",
            Self::Decode(_) => "decode_error",
            Self::ChallengeExpired { .. } => "challenge_expired",
            Self::ChallengeMismatch => "challenge_mismatch",
            Self::TemporalOrderingViolation { .. } => "temporal_ordering_violation",
            Self::IncompleteResponse { .. } => "incomplete_response",
            Self::SignatureInvalid => "signature_invalid",
            Self::AlreadyResolved { .. } => "already_resolved",
            Self::UnknownChallenge => "unknown_challenge",
            Self::InvalidLifetime { .. } => "invalid_lifetime",
            Self::InvalidCallback => "invalid_callback",
            Self::ChallengeGeneration(_) => "challenge_generation",
            Self::Store(_) => "store_error",
            Self::Sink(_) => "sink_error",
            Self::Config(_) => "config_error",
        }
    }

    /// Whether the error describes a refused response (as opposed to an
    /// expired challenge or an infrastructure fault).
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::ChallengeMismatch
                | Self::TemporalOrderingViolation { .. }
                | Self::IncompleteResponse { .. }
                | Self::SensitivityViolation { .. }
                | Self::ScanFailure(_)
                | Self::SignatureInvalid
        )
    }
}

impl From<RejectionReason> for LinkingError {
    fn from(reason: RejectionReason) -> Self {
        match reason {
            RejectionReason::ChallengeMismatch => Self::ChallengeMismatch,
            RejectionReason::TemporalOrderingViolation {
                issued_at,
                timestamp,
            } => Self::TemporalOrderingViolation {
                issued_at,
                timestamp,
            },
            RejectionReason::IncompleteResponse { missing } => {
                Self::IncompleteResponse { missing }
            }
            RejectionReason::SensitivityViolation { violations } => {
                Self::SensitivityViolation { violations }
            }
            RejectionReason::ScanFailure(failure) => Self::ScanFailure(failure),
            RejectionReason::SignatureInvalid => Self::SignatureInvalid,
        }
    }
}

impl From<PolicyError> for LinkingError {
    fn from(err: PolicyError) -> Self {
        match err {
            PolicyError::ScanFailure(failure) => Self::ScanFailure(failure),
            PolicyError::SensitivityViolation { violations } => {
                Self::SensitivityViolation { violations }
            }
            PolicyError::Config(config) => Self::Config(ConfigError::Policy(config)),
        }
    }
}

impl From<ScanFailure> for LinkingError {
    fn from(failure: ScanFailure) -> Self {
        Self::ScanFailure(failure)
    }
}

impl From<PolicyConfigError> for LinkingError {
    fn from(err: PolicyConfigError) -> Self {
        Self::Config(ConfigError::Policy(err))
    }
}
