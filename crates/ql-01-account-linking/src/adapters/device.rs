//! Device side of the protocol.
//!
//! Holds the signing key, answers challenges with signed scan responses and
//! scans every response before it leaves the device. The key itself never
//! appears in a response, a log line or a `Debug` rendering.

use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use shared_policy::SensitivityScanner;

use crate::domain::{LinkingError, LinkingPayload, ScanResponse, Timestamp};

/// A device identity with a single Ed25519 key.
pub struct EdgeDevice {
    signing_key: SigningKey,
    identifier: String,
    wallet_address: String,
    scanner: SensitivityScanner,
}

impl EdgeDevice {
    /// Fresh identity with an OS-random key.
    pub fn generate(wallet_address: impl Into<String>) -> Self {
        Self::from_signing_key(SigningKey::generate(&mut OsRng), wallet_address)
    }

    pub fn from_signing_key(signing_key: SigningKey, wallet_address: impl Into<String>) -> Self {
        let identifier = Self::identifier_for(&signing_key.verifying_key());
        Self {
            signing_key,
            identifier,
            wallet_address: wallet_address.into(),
            scanner: SensitivityScanner::edge_protection(),
        }
    }

    /// Public identifier derived from a verifying key: `E` + hex.
    pub fn identifier_for(key: &VerifyingKey) -> String {
        format!("E{}", hex::encode(key.as_bytes()))
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn wallet_address(&self) -> &str {
        &self.wallet_address
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Hex signature over `message`.
    pub fn sign_hex(&self, message: &[u8]) -> String {
        hex::encode(self.signing_key.sign(message).to_bytes())
    }

    /// Answer a scanned payload, refusing one that has already expired.
    pub fn accept(&self, payload: &LinkingPayload, now: Timestamp) -> Result<ScanResponse, LinkingError> {
        if payload.is_expired(now) {
            return Err(LinkingError::ChallengeExpired {
                expires_at: payload.expires_at,
                now,
            });
        }
        self.respond(&payload.challenge, now)
    }

    /// Signed response to `challenge`, scanned before it is returned.
    pub fn respond(&self, challenge: &str, timestamp: Timestamp) -> Result<ScanResponse, LinkingError> {
        let response = ScanResponse::new(
            challenge,
            self.identifier.clone(),
            self.wallet_address.clone(),
            self.sign_hex(challenge.as_bytes()),
            timestamp,
        )
        .with_nonce(hex::encode(rand::random::<[u8; 16]>()));

        self.scanner.ensure_safe(&response)?;
        Ok(response)
    }
}

impl std::fmt::Debug for EdgeDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EdgeDevice")
            .field("identifier", &self.identifier)
            .field("wallet_address", &self.wallet_address)
            .finish_non_exhaustive()
    }
}
