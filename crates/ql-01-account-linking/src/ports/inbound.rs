//! # Inbound Port - AccountLinkingApi
//!
//! Primary driving port of the linking subsystem.
//!
//! | Method | Transition |
//! |--------|------------|
//! | `issue_link` | → `ISSUED` |
//! | `submit_response` | `ISSUED` → `SCANNED` → `LINKED` / `REJECTED`, or → `EXPIRED` |
//! | `link_state` | none |

use std::time::Duration;

use crate::domain::{EncodedPayload, LinkState, LinkingError, LinkingResult, ScanResponse};

/// A challenge that has been issued, stored and encoded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IssuedLink {
    /// Log-safe digest of the challenge value.
    pub fingerprint: String,
    pub payload: EncodedPayload,
}

/// Primary API for the Account Linking subsystem.
pub trait AccountLinkingApi: Send + Sync {
    /// Issue a challenge with the configured lifetime and encode its payload.
    ///
    /// # Errors
    /// - `SensitivityViolation`, `EncodingTooLarge`, `InvalidCallback`:
    ///   the payload could not be built; nothing is stored
    /// - `Store`: the challenge could not be stored
    fn issue_link(&self) -> Result<IssuedLink, LinkingError>;

    /// Issue with an explicit lifetime.
    fn issue_link_with_lifetime(&self, lifetime: Duration) -> Result<IssuedLink, LinkingError>;

    /// Submit a scan response and resolve its challenge.
    ///
    /// # Errors
    /// - `UnknownChallenge`: no stored challenge has this value
    /// - `ChallengeExpired`: lifetime elapsed; the challenge is now `EXPIRED`
    /// - any rejection kind: the challenge is now `REJECTED`
    /// - `AlreadyResolved`: another submission resolved (or is resolving)
    ///   this challenge; nothing was validated
    fn submit_response(&self, response: &ScanResponse) -> Result<LinkingResult, LinkingError>;

    /// Submit a raw JSON scan response.
    ///
    /// The raw document is scanned before it is parsed, so fields the typed
    /// response would ignore are still checked.
    fn submit_response_json(&self, body: &[u8]) -> Result<LinkingResult, LinkingError>;

    /// Current state of the challenge with this value.
    fn link_state(&self, challenge_value: &str) -> Result<LinkState, LinkingError>;
}
