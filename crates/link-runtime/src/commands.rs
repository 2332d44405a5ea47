//! # Commands
//!
//! Each subcommand returns a serializable report; printing and exit codes
//! are left to `main`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use shared_policy::{SensitivityScanner, SensitivityVerdict};
use tracing::Instrument;

use ql_01_account_linking::adapters::{
    Ed25519KeyStateVerifier, EdgeDevice, InMemoryChallengeStore, ManualTimeSource, MemoryLinkSink,
};
use ql_01_account_linking::domain::time::to_rfc3339;
use ql_01_account_linking::{
    AccountLinkingApi, AccountLinkingService, ChallengeIssuer, LinkingConfig, LinkingError,
    LinkingPayload, LinkingResult, OutcomeTally, PayloadCodec, TimeSource, Timestamp,
};

// =============================================================================
// ISSUE
// =============================================================================

#[derive(Debug, Serialize)]
pub struct IssueReport {
    pub fingerprint: String,
    pub expires_at: Option<String>,
    pub size: usize,
    pub transport: String,
    pub payload: LinkingPayload,
}

/// Issue one challenge and encode it for transport.
pub fn issue(config: &LinkingConfig, lifetime_ms: Option<u64>, now: Timestamp) -> Result<IssueReport> {
    let issuer = ChallengeIssuer::from_config(config)?;
    let codec = PayloadCodec::from_config(config)?;
    let lifetime = lifetime_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| issuer.default_lifetime());

    let challenge = issuer
        .issue_at(now, lifetime)
        .context("failed to issue challenge")?;
    let encoded = codec
        .encode(&challenge, &config.callback_location, &config.environment)
        .context("failed to encode payload")?;

    tracing::info!(
        fingerprint = %challenge.fingerprint(),
        size = encoded.size(),
        "challenge issued for transport"
    );
    Ok(IssueReport {
        fingerprint: challenge.fingerprint(),
        expires_at: to_rfc3339(challenge.expires_at()),
        size: encoded.size(),
        transport: encoded.text.clone(),
        payload: encoded.payload,
    })
}

// =============================================================================
// DECODE
// =============================================================================

#[derive(Debug, Serialize)]
pub struct DecodeReport {
    pub expired: bool,
    pub payload: LinkingPayload,
}

/// Decode a transport string as a scanning device would.
pub fn decode(config: &LinkingConfig, text: &str, now: Timestamp) -> Result<DecodeReport> {
    let codec = PayloadCodec::from_config(config)?;
    let payload = codec
        .decode(text.as_bytes())
        .context("payload rejected")?;
    Ok(DecodeReport {
        expired: payload.is_expired(now),
        payload,
    })
}

// =============================================================================
// SCAN
// =============================================================================

/// Check a JSON document against the configured policy.
pub fn scan(config: &LinkingConfig, document: &[u8]) -> Result<SensitivityVerdict> {
    let scanner = SensitivityScanner::new(config.policy.clone()).context("invalid policy")?;
    let verdict = scanner
        .scan_json(document)
        .context("document could not be scanned")?;

    if !verdict.safe {
        tracing::warn!(
            violations = verdict.violations.len(),
            patterns = ?verdict.patterns(),
            "document is not safe to transmit"
        );
    }
    Ok(verdict)
}

// =============================================================================
// DEMO
// =============================================================================

#[derive(Debug, Clone)]
pub struct DemoOptions {
    pub wallet: String,
    pub attempts: u32,
    pub scan_delay_ms: u64,
}

#[derive(Debug, Serialize)]
pub struct DemoReport {
    pub identifier: String,
    pub tally: OutcomeTally,
    pub links: Vec<LinkingResult>,
}

type DemoService = AccountLinkingService<
    InMemoryChallengeStore,
    Ed25519KeyStateVerifier,
    Arc<MemoryLinkSink>,
    Arc<ManualTimeSource>,
>;

/// Run `attempts` full links against an in-memory service.
///
/// The clock is simulated from `start`: each attempt advances it by
/// `scan_delay_ms` between issuance and scan, so a delay past the
/// challenge lifetime produces expired attempts.
pub async fn demo(config: &LinkingConfig, options: &DemoOptions, start: Timestamp) -> Result<DemoReport> {
    let clock = Arc::new(ManualTimeSource::new(start));
    let sink = Arc::new(MemoryLinkSink::new());
    let device = EdgeDevice::generate(options.wallet.clone());
    let verifier = Ed25519KeyStateVerifier::new();
    verifier.register(device.identifier(), device.verifying_key());

    let service = AccountLinkingService::with_time_source(
        config,
        InMemoryChallengeStore::new(),
        verifier,
        sink.clone(),
        clock.clone(),
    )
    .context("failed to build linking service")?;

    let mut tally = OutcomeTally::new();
    for attempt in 0..options.attempts {
        let span = link_telemetry::attempt_span!(attempt);
        let outcome = run_attempt(&service, &device, &clock, options.scan_delay_ms)
            .instrument(span)
            .await;
        tally.record(&outcome);
    }

    tracing::info!(%tally, "demo finished");
    Ok(DemoReport {
        identifier: device.identifier().to_string(),
        tally,
        links: sink.links(),
    })
}

async fn run_attempt(
    service: &DemoService,
    device: &EdgeDevice,
    clock: &ManualTimeSource,
    scan_delay_ms: u64,
) -> Result<LinkingResult, LinkingError> {
    let link = service.issue_link()?;
    clock.advance(scan_delay_ms);

    let payload = service.codec().decode(link.payload.as_str().as_bytes())?;
    let response = device.accept(&payload, clock.now())?;
    service.link_and_record(&response).await
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: Timestamp = 1_752_832_800_000;

    #[test]
    fn test_issue_then_decode() {
        let config = LinkingConfig::default();
        let report = issue(&config, None, NOW).unwrap();
        assert!(report.size <= config.max_payload_bytes);
        assert_eq!(report.expires_at.as_deref(), Some("2025-07-18T10:10:00.000Z"));

        let decoded = decode(&config, &report.transport, NOW + 1).unwrap();
        assert!(!decoded.expired);
        assert_eq!(decoded.payload, report.payload);

        let decoded = decode(&config, &report.transport, NOW + 600_001).unwrap();
        assert!(decoded.expired);
    }

    #[test]
    fn test_issue_rejects_zero_lifetime() {
        assert!(issue(&LinkingConfig::default(), Some(0), NOW).is_err());
    }

    #[test]
    fn test_decode_garbage() {
        assert!(decode(&LinkingConfig::default(), "%%%", NOW).is_err());
    }

    #[test]
    fn test_scan_verdicts() {
        let config = LinkingConfig::default();
        let safe = scan(&config, br#"{"publicKey": "DKxy", "signature": "00ff", "aid": "E12"}"#)
            .unwrap();
        assert!(safe.safe);

        let unsafe_doc = scan(&config, br#"{"privateKey": "abc"}"#).unwrap();
        assert!(!unsafe_doc.safe);
        assert_eq!(unsafe_doc.patterns(), vec!["privateKey"]);

        assert!(scan(&config, b"not json").is_err());
    }

    #[tokio::test]
    async fn test_demo_links() {
        let options = DemoOptions {
            wallet: "addr1_sandbox_test_wallet_001".to_string(),
            attempts: 3,
            scan_delay_ms: 1_500,
        };
        let report = demo(&LinkingConfig::default(), &options, NOW).await.unwrap();

        assert_eq!(report.tally.linked, 3);
        assert_eq!(report.links.len(), 3);
        assert!(report
            .links
            .iter()
            .all(|link| link.wallet_address() == options.wallet));
    }

    #[tokio::test]
    async fn test_demo_slow_scan_expires() {
        let options = DemoOptions {
            wallet: "addr1_sandbox_test_wallet_001".to_string(),
            attempts: 2,
            scan_delay_ms: 600_001,
        };
        let report = demo(&LinkingConfig::default(), &options, NOW).await.unwrap();

        assert_eq!(report.tally.total, 2);
        assert_eq!(report.tally.linked, 0);
        assert!(report.links.is_empty());
    }
}
