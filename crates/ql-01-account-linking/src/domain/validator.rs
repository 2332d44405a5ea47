//! # Response Validator
//!
//! Six gates, evaluated in order. The first failure short-circuits.
//!
//! | # | Gate | Failure |
//! |---|------|---------|
//! | 1 | `now <= expires_at` | `Expired` (its own outcome) |
//! | 2 | `response.challenge == challenge.value` | `ChallengeMismatch` |
//! | 3 | `response.timestamp > issued_at` | `TemporalOrderingViolation` |
//! | 4 | required fields non-blank | `IncompleteResponse` |
//! | 5 | policy scan of the whole response | `SensitivityViolation` |
//! | 6 | signature over the challenge bytes | `SignatureInvalid` |
//!
//! The sensitivity gate runs before the signature gate, so a response
//! carrying forbidden content is refused even when its signature is good.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared_policy::SensitivityScanner;
use subtle::ConstantTimeEq;

use super::entities::{Challenge, ScanResponse, Timestamp};
use super::errors::RejectionReason;
use crate::ports::outbound::IdentityVerifier;

/// Verdict of the validator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// All six gates passed
    Accepted,
    /// The challenge lifetime elapsed before validation
    Expired { expires_at: Timestamp, now: Timestamp },
    /// A gate refused the response
    Rejected(RejectionReason),
}

impl ValidationOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// A gate name, for diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gate {
    Liveness,
    ChallengeMatch,
    TemporalOrdering,
    Completeness,
    Sensitivity,
    Signature,
}

/// Every failure found by [`ResponseValidator::diagnose`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Diagnosis {
    pub expired: bool,
    pub failures: Vec<(Gate, RejectionReason)>,
}

impl Diagnosis {
    pub fn is_clean(&self) -> bool {
        !self.expired && self.failures.is_empty()
    }

    pub fn failed_gates(&self) -> Vec<Gate> {
        let mut gates: Vec<Gate> = self.failures.iter().map(|(gate, _)| *gate).collect();
        if self.expired {
            gates.insert(0, Gate::Liveness);
        }
        gates
    }
}

/// Constant-time comparison of a claimed challenge value.
pub(crate) fn challenge_matches(challenge: &Challenge, claimed: &str) -> bool {
    let expected = challenge.value().as_bytes();
    let claimed = claimed.as_bytes();
    expected.len() == claimed.len() && bool::from(expected.ct_eq(claimed))
}

/// Stateless response validator.
#[derive(Debug, Clone, Default)]
pub struct ResponseValidator {
    scanner: SensitivityScanner,
}

impl ResponseValidator {
    pub fn new(scanner: SensitivityScanner) -> Self {
        Self { scanner }
    }

    /// Run the gates in order, stopping at the first failure.
    pub fn validate<V: IdentityVerifier + ?Sized>(
        &self,
        challenge: &Challenge,
        response: &ScanResponse,
        now: Timestamp,
        verifier: &V,
    ) -> ValidationOutcome {
        self.run(challenge, response, None, now, verifier)
    }

    /// Like [`validate`](Self::validate), but the sensitivity gate scans
    /// the raw `document` the response was parsed from, including fields
    /// the typed response does not carry.
    pub fn validate_document<V: IdentityVerifier + ?Sized>(
        &self,
        challenge: &Challenge,
        response: &ScanResponse,
        document: &Value,
        now: Timestamp,
        verifier: &V,
    ) -> ValidationOutcome {
        self.run(challenge, response, Some(document), now, verifier)
    }

    fn run<V: IdentityVerifier + ?Sized>(
        &self,
        challenge: &Challenge,
        response: &ScanResponse,
        document: Option<&Value>,
        now: Timestamp,
        verifier: &V,
    ) -> ValidationOutcome {
        if challenge.is_expired(now) {
            return ValidationOutcome::Expired {
                expires_at: challenge.expires_at(),
                now,
            };
        }

        let outcome = self
            .check_match(challenge, response)
            .and_then(|()| self.check_temporal(challenge, response))
            .and_then(|()| self.check_complete(response))
            .and_then(|()| self.check_sensitivity(response, document))
            .and_then(|()| self.check_signature(challenge, response, verifier));

        match outcome {
            Ok(()) => ValidationOutcome::Accepted,
            Err(reason) => {
                tracing::debug!(
                    fingerprint = %challenge.fingerprint(),
                    reason = reason.kind(),
                    "scan response rejected"
                );
                ValidationOutcome::Rejected(reason)
            }
        }
    }

    /// Run every gate and collect all failures, for audit.
    ///
    /// The signature gate is only consulted when the response is complete.
    pub fn diagnose<V: IdentityVerifier + ?Sized>(
        &self,
        challenge: &Challenge,
        response: &ScanResponse,
        now: Timestamp,
        verifier: &V,
    ) -> Diagnosis {
        let mut diagnosis = Diagnosis {
            expired: challenge.is_expired(now),
            failures: Vec::new(),
        };

        if let Err(reason) = self.check_match(challenge, response) {
            diagnosis.failures.push((Gate::ChallengeMatch, reason));
        }
        if let Err(reason) = self.check_temporal(challenge, response) {
            diagnosis.failures.push((Gate::TemporalOrdering, reason));
        }
        let complete = self.check_complete(response);
        let is_complete = complete.is_ok();
        if let Err(reason) = complete {
            diagnosis.failures.push((Gate::Completeness, reason));
        }
        if let Err(reason) = self.check_sensitivity(response, None) {
            diagnosis.failures.push((Gate::Sensitivity, reason));
        }
        if is_complete {
            if let Err(reason) = self.check_signature(challenge, response, verifier) {
                diagnosis.failures.push((Gate::Signature, reason));
            }
        }

        diagnosis
    }

    fn check_match(&self, challenge: &Challenge, response: &ScanResponse) -> Result<(), RejectionReason> {
        if challenge_matches(challenge, &response.challenge) {
            Ok(())
        } else {
            Err(RejectionReason::ChallengeMismatch)
        }
    }

    fn check_temporal(&self, challenge: &Challenge, response: &ScanResponse) -> Result<(), RejectionReason> {
        if response.timestamp > challenge.issued_at() {
            Ok(())
        } else {
            Err(RejectionReason::TemporalOrderingViolation {
                issued_at: challenge.issued_at(),
                timestamp: response.timestamp,
            })
        }
    }

    fn check_complete(&self, response: &ScanResponse) -> Result<(), RejectionReason> {
        let missing = response.missing_fields();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(RejectionReason::IncompleteResponse { missing })
        }
    }

    fn check_sensitivity(
        &self,
        response: &ScanResponse,
        document: Option<&Value>,
    ) -> Result<(), RejectionReason> {
        let verdict = match document {
            Some(document) => self.scanner.scan_value(document),
            None => self.scanner.scan(response),
        }
        .map_err(RejectionReason::ScanFailure)?;
        if verdict.safe {
            Ok(())
        } else {
            Err(RejectionReason::SensitivityViolation {
                violations: verdict.violations,
            })
        }
    }

    fn check_signature<V: IdentityVerifier + ?Sized>(
        &self,
        challenge: &Challenge,
        response: &ScanResponse,
        verifier: &V,
    ) -> Result<(), RejectionReason> {
        if verifier.verify(
            &response.identifier,
            challenge.value().as_bytes(),
            &response.signature,
        ) {
            Ok(())
        } else {
            Err(RejectionReason::SignatureInvalid)
        }
    }
}
