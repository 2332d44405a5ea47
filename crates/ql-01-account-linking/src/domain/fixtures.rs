//! Shared test fixtures.

use std::time::Duration;

use super::entities::{Challenge, ScanResponse, Timestamp};
use super::issuer::ChallengeIssuer;
use crate::adapters::device::EdgeDevice;
use crate::adapters::key_state::Ed25519KeyStateVerifier;

/// 2025-07-18T10:00:00Z
pub const ISSUED_AT: Timestamp = 1_752_832_800_000;

pub const WALLET: &str = "addr1_sandbox_test_wallet_001";

pub fn device() -> EdgeDevice {
    EdgeDevice::generate(WALLET)
}

/// A challenge issued at [`ISSUED_AT`] with a 10 minute lifetime.
pub fn challenge() -> Challenge {
    ChallengeIssuer::default()
        .issue_at(ISSUED_AT, Duration::from_secs(600))
        .unwrap()
}

pub fn verifier_for(devices: &[&EdgeDevice]) -> Ed25519KeyStateVerifier {
    let verifier = Ed25519KeyStateVerifier::new();
    for device in devices {
        verifier.register(device.identifier(), device.verifying_key());
    }
    verifier
}

pub fn response(device: &EdgeDevice, challenge: &Challenge, timestamp: Timestamp) -> ScanResponse {
    device.respond(challenge.value(), timestamp).unwrap()
}
