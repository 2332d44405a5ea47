//! # Challenge Issuer
//!
//! Draws 256 bits from the OS CSPRNG and encodes them base64url without
//! padding, so every value is at least [`MIN_CHALLENGE_CHARS`] characters.
//! No registry deduplicates values; collisions are cryptographically
//! negligible.
//!
//! A drawn value is also run through the sensitivity policy. Random text
//! occasionally spells a forbidden word (`seed` turns up roughly once in
//! 25 000 tokens); such a draw is discarded so the codec
//! never refuses a payload because of its own random content.

use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use serde_json::Value;
use shared_policy::SensitivityScanner;

use super::config::LinkingConfig;
use super::entities::{
    Challenge, Timestamp, AUX_ENTROPY_BYTES, CHALLENGE_BYTES, MIN_CHALLENGE_CHARS,
};
use super::errors::LinkingError;
use super::time::now_millis;

/// Upper bound on draws for one challenge.
const MAX_DRAWS: usize = 8;

/// Produces time-bounded linking challenges.
#[derive(Debug, Clone)]
pub struct ChallengeIssuer {
    default_lifetime: Duration,
    scanner: SensitivityScanner,
}

impl Default for ChallengeIssuer {
    fn default() -> Self {
        Self {
            default_lifetime: Duration::from_millis(super::config::DEFAULT_CHALLENGE_LIFETIME_MS),
            scanner: SensitivityScanner::edge_protection(),
        }
    }
}

impl ChallengeIssuer {
    pub fn new(default_lifetime: Duration, scanner: SensitivityScanner) -> Self {
        Self {
            default_lifetime,
            scanner,
        }
    }

    pub fn from_config(config: &LinkingConfig) -> Result<Self, LinkingError> {
        config.validate()?;
        let scanner = SensitivityScanner::new(config.policy.clone())?;
        Ok(Self::new(config.challenge_lifetime(), scanner))
    }

    pub fn default_lifetime(&self) -> Duration {
        self.default_lifetime
    }

    /// Issue a challenge with the default lifetime, starting now.
    pub fn issue(&self) -> Result<Challenge, LinkingError> {
        self.issue_at(now_millis(), self.default_lifetime)
    }

    /// Issue a challenge with an explicit lifetime, starting now.
    pub fn issue_with_lifetime(&self, lifetime: Duration) -> Result<Challenge, LinkingError> {
        self.issue_at(now_millis(), lifetime)
    }

    /// Issue a challenge valid from `now` for `lifetime`.
    ///
    /// # Errors
    ///
    /// - `InvalidLifetime` if `lifetime` is below one millisecond or the
    ///   expiry overflows the clock
    /// - `ChallengeGeneration` if the OS random source fails
    pub fn issue_at(&self, now: Timestamp, lifetime: Duration) -> Result<Challenge, LinkingError> {
        let lifetime_ms = lifetime.as_millis();
        let expires_at = u64::try_from(lifetime_ms)
            .ok()
            .filter(|ms| *ms > 0)
            .and_then(|ms| now.checked_add(ms))
            .ok_or(LinkingError::InvalidLifetime { lifetime_ms })?;

        let value = self.draw_value()?;
        let aux_entropy = random_token::<AUX_ENTROPY_BYTES>()?;

        let challenge = Challenge::new(value, now, expires_at, aux_entropy);
        tracing::debug!(
            fingerprint = %challenge.fingerprint(),
            issued_at = now,
            expires_at,
            "challenge issued"
        );
        Ok(challenge)
    }

    fn draw_value(&self) -> Result<String, LinkingError> {
        for _ in 0..MAX_DRAWS {
            let value = random_token::<CHALLENGE_BYTES>()?;
            if value.len() < MIN_CHALLENGE_CHARS {
                return Err(LinkingError::ChallengeGeneration(format!(
                    "challenge is {} chars, need at least {}",
                    value.len(),
                    MIN_CHALLENGE_CHARS
                )));
            }

            if self.scanner.scan_value(&Value::String(value.clone()))?.safe {
                return Ok(value);
            }
            tracing::trace!("discarding challenge draw that trips the policy");
        }

        Err(LinkingError::ChallengeGeneration(
            "no policy-clean challenge after repeated draws".into(),
        ))
    }
}

fn random_token<const N: usize>() -> Result<String, LinkingError> {
    let mut bytes = [0u8; N];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| LinkingError::ChallengeGeneration(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_policy::{PolicyConfig, Severity};
    use std::collections::HashSet;

    #[test]
    fn test_challenge_invariants() {
        let issuer = ChallengeIssuer::default();
        for _ in 0..200 {
            let c = issuer.issue().unwrap();
            assert!(c.expires_at() > c.issued_at());
            assert!(c.value().len() >= MIN_CHALLENGE_CHARS);
            assert!(c
                .value()
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_'));
        }
    }

    #[test]
    fn test_default_lifetime_is_ten_minutes() {
        let issuer = ChallengeIssuer::default();
        let c = issuer.issue_at(1_000, issuer.default_lifetime()).unwrap();
        assert_eq!(c.issued_at(), 1_000);
        assert_eq!(c.expires_at(), 601_000);
    }

    #[test]
    fn test_values_are_distinct() {
        let issuer = ChallengeIssuer::default();
        let values: HashSet<String> = (0..10_000)
            .map(|_| issuer.issue().unwrap().value().to_string())
            .collect();
        assert_eq!(values.len(), 10_000);
    }

    #[test]
    fn test_aux_entropy_is_independent() {
        let c = ChallengeIssuer::default().issue().unwrap();
        assert_eq!(c.aux_entropy().len(), 22);
        assert_ne!(c.aux_entropy(), c.value());
    }

    #[test]
    fn test_zero_lifetime_rejected() {
        let issuer = ChallengeIssuer::default();
        let err = issuer.issue_at(0, Duration::from_micros(500)).unwrap_err();
        assert_eq!(err, LinkingError::InvalidLifetime { lifetime_ms: 0 });
    }

    #[test]
    fn test_overflowing_lifetime_rejected() {
        let issuer = ChallengeIssuer::default();
        let err = issuer
            .issue_at(u64::MAX - 5, Duration::from_millis(10))
            .unwrap_err();
        assert!(matches!(err, LinkingError::InvalidLifetime { .. }));
    }

    #[test]
    fn test_exhausted_draws_reported() {
        // Every base64url token contains at least one of these characters.
        let mut config = PolicyConfig::empty();
        for c in "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_".chars() {
            config = config.with_forbidden(c.to_string(), Severity::High);
        }
        let issuer = ChallengeIssuer::new(
            Duration::from_secs(60),
            SensitivityScanner::new(config).unwrap(),
        );

        let err = issuer.issue().unwrap_err();
        assert_eq!(err.kind(), "challenge_generation");
    }
}
