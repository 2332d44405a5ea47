//! # Recording and Key State
//!
//! - A successful link reaches the sink exactly once
//! - A sink failure surfaces as `Sink` while the challenge stays `LINKED`
//! - Rotating or revoking an identifier's keys takes effect immediately

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use ql_01_account_linking::adapters::{
        EdgeDevice, InMemoryChallengeStore, ManualTimeSource, TracingLinkSink,
    };
    use ql_01_account_linking::{
        AccountLinkingApi, AccountLinkingService, LinkSink, LinkState, LinkingConfig,
        LinkingError, LinkingResult, OutcomeTally, ScanResponse, SinkError, TimeSource,
    };

    use crate::integration::support::{deployment, verifier_for, ISSUED_AT, WALLET};

    struct OfflineSink;

    #[async_trait]
    impl LinkSink for OfflineSink {
        async fn record(&self, _result: &LinkingResult) -> Result<(), SinkError> {
            Err(SinkError::Unavailable("ledger offline".into()))
        }
    }

    #[tokio::test]
    async fn test_link_recorded_once() {
        let env = deployment(LinkingConfig::default());
        let link = env.service.issue_link().unwrap();
        env.clock.advance(1_000);
        let response = env
            .device
            .accept(&link.payload.payload, env.clock.now())
            .unwrap();

        env.service.link_and_record(&response).await.unwrap();
        let replay = env.service.link_and_record(&response).await;

        assert!(matches!(replay, Err(LinkingError::AlreadyResolved { .. })));
        assert_eq!(env.sink.links().len(), 1);
        assert_eq!(
            env.sink.wallet_for(env.device.identifier()).as_deref(),
            Some(WALLET)
        );
    }

    #[tokio::test]
    async fn test_sink_failure_surfaces() {
        let device = EdgeDevice::generate(WALLET);
        let clock = Arc::new(ManualTimeSource::new(ISSUED_AT));
        let service = AccountLinkingService::with_time_source(
            &LinkingConfig::default(),
            InMemoryChallengeStore::new(),
            verifier_for(&[&device]),
            OfflineSink,
            clock.clone(),
        )
        .unwrap();

        let link = service.issue_link().unwrap();
        clock.advance(1_000);
        let response = device.accept(&link.payload.payload, clock.now()).unwrap();
        let err = service.link_and_record(&response).await.unwrap_err();

        assert_eq!(err.kind(), "sink_error");
        assert_eq!(
            service.link_state(&link.payload.payload.challenge).unwrap(),
            LinkState::Linked
        );
    }

    #[tokio::test]
    async fn test_tracing_sink_accepts() {
        let device = EdgeDevice::generate(WALLET);
        let clock = Arc::new(ManualTimeSource::new(ISSUED_AT));
        let service = AccountLinkingService::with_time_source(
            &LinkingConfig::default(),
            InMemoryChallengeStore::new(),
            verifier_for(&[&device]),
            TracingLinkSink,
            clock.clone(),
        )
        .unwrap();

        let link = service.issue_link().unwrap();
        clock.advance(1_000);
        let response = device.accept(&link.payload.payload, clock.now()).unwrap();
        assert!(service.link_and_record(&response).await.is_ok());
    }

    #[test]
    fn test_rotation_retires_old_key() {
        let env = deployment(LinkingConfig::default());
        let replacement = EdgeDevice::generate(WALLET);
        let identifier = env.device.identifier().to_string();
        env.service
            .verifier()
            .rotate(identifier.clone(), vec![replacement.verifying_key()]);

        let mut tally = OutcomeTally::new();

        // Old key
        let link = env.service.issue_link().unwrap();
        env.clock.advance(1_000);
        let stale = env
            .device
            .accept(&link.payload.payload, env.clock.now())
            .unwrap();
        let outcome = env.service.submit_response(&stale);
        assert_eq!(outcome.clone().unwrap_err(), LinkingError::SignatureInvalid);
        tally.record(&outcome);

        // New key, same identifier
        let link = env.service.issue_link().unwrap();
        env.clock.advance(1_000);
        let challenge = link.payload.payload.challenge.clone();
        let fresh = ScanResponse::new(
            challenge.clone(),
            identifier.clone(),
            WALLET,
            replacement.sign_hex(challenge.as_bytes()),
            env.clock.now(),
        );
        let outcome = env.service.submit_response(&fresh);
        assert!(outcome.is_ok());
        tally.record(&outcome);

        assert_eq!(tally.linked, 1);
        assert_eq!(tally.rejected, 1);
    }

    #[test]
    fn test_revoked_identifier_cannot_link() {
        let env = deployment(LinkingConfig::default());
        assert!(env.service.verifier().revoke(env.device.identifier()));

        let link = env.service.issue_link().unwrap();
        env.clock.advance(1_000);
        let response = env
            .device
            .accept(&link.payload.payload, env.clock.now())
            .unwrap();

        assert_eq!(
            env.service.submit_response(&response).unwrap_err(),
            LinkingError::SignatureInvalid
        );
    }
}
