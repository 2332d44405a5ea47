//! # Integration Tests
//!
//! End-to-end linking flows across `shared-policy` and
//! `ql-01-account-linking`.

pub mod edge_protection;
pub mod flows;
pub mod recording;

#[cfg(test)]
pub(crate) mod support {
    use std::sync::Arc;

    use ql_01_account_linking::adapters::{
        Ed25519KeyStateVerifier, EdgeDevice, InMemoryChallengeStore, ManualTimeSource,
        MemoryLinkSink,
    };
    use ql_01_account_linking::{AccountLinkingService, LinkingConfig, Timestamp};

    /// 2025-07-18T10:00:00Z
    pub const ISSUED_AT: Timestamp = 1_752_832_800_000;

    pub const WALLET: &str = "addr1_sandbox_test_wallet_001";

    pub const CALLBACK: &str = "https://link.example.org/callback";

    pub type TestService = AccountLinkingService<
        InMemoryChallengeStore,
        Ed25519KeyStateVerifier,
        Arc<MemoryLinkSink>,
        Arc<ManualTimeSource>,
    >;

    pub struct Deployment {
        pub service: TestService,
        pub clock: Arc<ManualTimeSource>,
        pub sink: Arc<MemoryLinkSink>,
        pub device: EdgeDevice,
    }

    pub fn verifier_for(devices: &[&EdgeDevice]) -> Ed25519KeyStateVerifier {
        let verifier = Ed25519KeyStateVerifier::new();
        for device in devices {
            verifier.register(device.identifier(), device.verifying_key());
        }
        verifier
    }

    /// A service on a manual clock with one registered device.
    pub fn deployment(config: LinkingConfig) -> Deployment {
        let device = EdgeDevice::generate(WALLET);
        let clock = Arc::new(ManualTimeSource::new(ISSUED_AT));
        let sink = Arc::new(MemoryLinkSink::new());
        let service = AccountLinkingService::with_time_source(
            &config,
            InMemoryChallengeStore::new(),
            verifier_for(&[&device]),
            sink.clone(),
            clock.clone(),
        )
        .unwrap();
        Deployment {
            service,
            clock,
            sink,
            device,
        }
    }
}
