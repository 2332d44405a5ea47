//! # Linking State Machine
//!
//! ```text
//! [ISSUED] ──matching scan──→ [SCANNED] ──Accepted──→ [LINKED]
//!    │  ↺ mismatch               │  ↺ mismatch
//!    │                           └──Rejected──→ [REJECTED]
//!    └──────────┬────────────────┘
//!               └──now > expires_at──→ [EXPIRED]
//! ```
//!
//! `LINKED`, `REJECTED` and `EXPIRED` are terminal. A terminal record keeps
//! only what diagnostics need; the challenge itself is dropped, so a
//! rejected attempt can never be retried against the same token.

use super::codec::{EncodedPayload, PayloadCodec};
use super::entities::{Challenge, LinkState, LinkingResult, ScanResponse, Timestamp};
use super::errors::{LinkingError, RejectionReason};
use super::validator::{challenge_matches, ResponseValidator, ValidationOutcome};
use crate::ports::outbound::IdentityVerifier;

/// What a challenge store holds for one challenge value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChallengeRecord {
    Issued(Challenge),
    /// A matching response has been received and is being validated.
    Scanned(Challenge),
    Linked { expires_at: Timestamp },
    Rejected {
        reason: RejectionReason,
        expires_at: Timestamp,
    },
    Expired { expires_at: Timestamp },
}

impl ChallengeRecord {
    pub fn state(&self) -> LinkState {
        match self {
            Self::Issued(_) => LinkState::Issued,
            Self::Scanned(_) => LinkState::Scanned,
            Self::Linked { .. } => LinkState::Linked,
            Self::Rejected { .. } => LinkState::Rejected,
            Self::Expired { .. } => LinkState::Expired,
        }
    }

    pub fn expires_at(&self) -> Timestamp {
        match self {
            Self::Issued(c) | Self::Scanned(c) => c.expires_at(),
            Self::Linked { expires_at }
            | Self::Rejected { expires_at, .. }
            | Self::Expired { expires_at } => *expires_at,
        }
    }

    /// The live challenge, `None` once terminal.
    pub fn challenge(&self) -> Option<&Challenge> {
        match self {
            Self::Issued(c) | Self::Scanned(c) => Some(c),
            _ => None,
        }
    }

    pub fn rejection(&self) -> Option<&RejectionReason> {
        match self {
            Self::Rejected { reason, .. } => Some(reason),
            _ => None,
        }
    }
}

/// Step from `ISSUED` towards `SCANNED`.
pub(crate) enum ScanStep {
    /// Response matches; the record may move to `SCANNED`.
    Claim(Challenge),
    /// Lifetime elapsed; the record must move to `EXPIRED`.
    Expire(LinkingError),
    /// No transition; report the error.
    Refuse(LinkingError),
}

pub(crate) fn scan_step(record: &ChallengeRecord, response: &ScanResponse, now: Timestamp) -> ScanStep {
    let challenge = match record {
        ChallengeRecord::Issued(challenge) => challenge,
        other => {
            return ScanStep::Refuse(LinkingError::AlreadyResolved {
                state: other.state(),
            })
        }
    };

    if challenge.is_expired(now) {
        return ScanStep::Expire(LinkingError::ChallengeExpired {
            expires_at: challenge.expires_at(),
            now,
        });
    }
    if !challenge_matches(challenge, &response.challenge) {
        return ScanStep::Refuse(LinkingError::ChallengeMismatch);
    }

    ScanStep::Claim(challenge.clone())
}

/// Map a validator outcome to the terminal record and the caller's result.
pub(crate) fn conclude(
    challenge: &Challenge,
    response: &ScanResponse,
    outcome: ValidationOutcome,
    now: Timestamp,
) -> (ChallengeRecord, Result<LinkingResult, LinkingError>) {
    let expires_at = challenge.expires_at();
    match outcome {
        ValidationOutcome::Accepted => (
            ChallengeRecord::Linked { expires_at },
            Ok(LinkingResult::linked(response, now)),
        ),
        ValidationOutcome::Expired { expires_at, now } => (
            ChallengeRecord::Expired { expires_at },
            Err(LinkingError::ChallengeExpired { expires_at, now }),
        ),
        ValidationOutcome::Rejected(reason) => (
            ChallengeRecord::Rejected {
                reason: reason.clone(),
                expires_at,
            },
            Err(reason.into()),
        ),
    }
}

/// One linking attempt owned by a single caller.
///
/// For attempts shared between concurrent submitters, use the store-backed
/// `AccountLinkingService`.
#[derive(Debug, Clone)]
pub struct LinkingAttempt {
    record: ChallengeRecord,
    payload: EncodedPayload,
    result: Option<LinkingResult>,
    validator: ResponseValidator,
}

impl LinkingAttempt {
    /// Encode `challenge` and enter `ISSUED`.
    ///
    /// An encoding failure is returned as an error; no attempt exists.
    pub fn open(
        challenge: Challenge,
        codec: &PayloadCodec,
        callback_location: &str,
        environment: &str,
    ) -> Result<Self, LinkingError> {
        let payload = codec.encode(&challenge, callback_location, environment)?;
        Ok(Self {
            record: ChallengeRecord::Issued(challenge),
            payload,
            result: None,
            validator: ResponseValidator::new(codec.scanner().clone()),
        })
    }

    pub fn state(&self) -> LinkState {
        self.record.state()
    }

    pub fn record(&self) -> &ChallengeRecord {
        &self.record
    }

    pub fn payload(&self) -> &EncodedPayload {
        &self.payload
    }

    /// The live challenge, `None` once terminal.
    pub fn challenge(&self) -> Option<&Challenge> {
        self.record.challenge()
    }

    pub fn rejection(&self) -> Option<&RejectionReason> {
        self.record.rejection()
    }

    pub fn result(&self) -> Option<&LinkingResult> {
        self.result.as_ref()
    }

    /// Record receipt of a response: `ISSUED → SCANNED`.
    ///
    /// A mismatching response leaves the attempt in `ISSUED`.
    pub fn record_scan(&mut self, response: &ScanResponse, now: Timestamp) -> Result<(), LinkingError> {
        match scan_step(&self.record, response, now) {
            ScanStep::Claim(challenge) => {
                self.record = ChallengeRecord::Scanned(challenge);
                Ok(())
            }
            ScanStep::Expire(err) => {
                self.record = ChallengeRecord::Expired {
                    expires_at: self.record.expires_at(),
                };
                Err(err)
            }
            ScanStep::Refuse(err) => Err(err),
        }
    }

    /// Submit a response and drive the attempt to a terminal state.
    ///
    /// Records the scan first when the attempt is still `ISSUED`. A live
    /// attempt answers a mismatching response with `ChallengeMismatch` and
    /// keeps its state, whether it is `ISSUED` or `SCANNED`.
    pub fn submit<V: IdentityVerifier + ?Sized>(
        &mut self,
        response: &ScanResponse,
        now: Timestamp,
        verifier: &V,
    ) -> Result<LinkingResult, LinkingError> {
        if self.record.state() == LinkState::Issued {
            self.record_scan(response, now)?;
        }

        let challenge = match &self.record {
            ChallengeRecord::Scanned(challenge) => challenge,
            other => {
                return Err(LinkingError::AlreadyResolved {
                    state: other.state(),
                })
            }
        };
        if !challenge.is_expired(now) && !challenge_matches(challenge, &response.challenge) {
            return Err(LinkingError::ChallengeMismatch);
        }

        let outcome = self.validator.validate(challenge, response, now, verifier);
        let (next, result) = conclude(challenge, response, outcome, now);
        self.record = next;
        if let Ok(linked) = &result {
            self.result = Some(linked.clone());
        }
        result
    }
}
