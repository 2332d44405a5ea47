//! Ed25519 key-state registry implementing [`IdentityVerifier`].
//!
//! Holds the currently authoritative verifying keys per identifier. A
//! rotation replaces the whole set, so signatures by retired keys stop
//! verifying immediately.

use std::collections::HashMap;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ed25519_dalek::{Signature, VerifyingKey};
use parking_lot::RwLock;

use crate::ports::outbound::IdentityVerifier;

/// Hex length of a 64-byte signature.
const HEX_SIGNATURE_LEN: usize = 128;

/// Identifier → current verifying keys.
#[derive(Debug, Default)]
pub struct Ed25519KeyStateVerifier {
    keys: RwLock<HashMap<String, Vec<VerifyingKey>>>,
}

impl Ed25519KeyStateVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `key` to the current key set of `identifier`.
    pub fn register(&self, identifier: impl Into<String>, key: VerifyingKey) {
        let mut keys = self.keys.write();
        let current = keys.entry(identifier.into()).or_default();
        if !current.contains(&key) {
            current.push(key);
        }
    }

    /// Replace the key set of `identifier`.
    pub fn rotate(&self, identifier: impl Into<String>, next: Vec<VerifyingKey>) {
        let identifier = identifier.into();
        tracing::info!(identifier = %identifier, keys = next.len(), "key state rotated");
        self.keys.write().insert(identifier, next);
    }

    /// Forget `identifier` entirely.
    pub fn revoke(&self, identifier: &str) -> bool {
        self.keys.write().remove(identifier).is_some()
    }

    pub fn current_keys(&self, identifier: &str) -> Vec<VerifyingKey> {
        self.keys.read().get(identifier).cloned().unwrap_or_default()
    }
}

/// Accepts 128 hex digits or base64url (padding optional).
fn parse_signature(text: &str) -> Option<Signature> {
    let text = text.trim();
    let bytes = if text.len() == HEX_SIGNATURE_LEN && text.bytes().all(|b| b.is_ascii_hexdigit()) {
        hex::decode(text).ok()?
    } else {
        URL_SAFE_NO_PAD.decode(text.trim_end_matches('=')).ok()?
    };
    Signature::from_slice(&bytes).ok()
}

impl IdentityVerifier for Ed25519KeyStateVerifier {
    fn verify(&self, identifier: &str, message: &[u8], signature: &str) -> bool {
        let Some(signature) = parse_signature(signature) else {
            return false;
        };

        let keys = self.keys.read();
        let Some(current) = keys.get(identifier) else {
            return false;
        };
        current
            .iter()
            .any(|key| key.verify_strict(message, &signature).is_ok())
    }
}
