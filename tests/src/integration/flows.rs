//! # Linking Flows
//!
//! End-to-end scenarios over both forms of the state machine: the
//! single-owner `LinkingAttempt` and the store-backed service.
//!
//! 1. **Round trip**: issue → encode → decode keeps the challenge, ≤ 2048 bytes
//! 2. **Early timestamp**: response older than issuance → `REJECTED`
//! 3. **Expiry**: 1 ms lifetime, wait, submit → `EXPIRED`
//! 4. **Secret in wallet**: forbidden substring → `REJECTED` despite a good signature
//!
//! Plus single-use rules: a mismatch never consumes the challenge, and any
//! terminal state answers later submissions with `AlreadyResolved`.

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use ql_01_account_linking::adapters::{EdgeDevice, InMemoryChallengeStore, MemoryLinkSink};
    use ql_01_account_linking::domain::time::now_millis;
    use ql_01_account_linking::{
        AccountLinkingApi, AccountLinkingService, ChallengeIssuer, LinkState, LinkingAttempt,
        LinkingConfig, LinkingError, PayloadCodec, RejectionReason, ScanResponse, TimeSource,
    };

    use crate::integration::support::{deployment, verifier_for, CALLBACK, ISSUED_AT, WALLET};

    fn open_attempt(lifetime: Duration) -> LinkingAttempt {
        let challenge = ChallengeIssuer::default()
            .issue_at(ISSUED_AT, lifetime)
            .unwrap();
        LinkingAttempt::open(challenge, &PayloadCodec::default(), CALLBACK, "sandbox").unwrap()
    }

    fn challenge_of(attempt: &LinkingAttempt) -> String {
        attempt.payload().payload.challenge.clone()
    }

    // =============================================================================
    // SCENARIOS
    // =============================================================================

    #[test]
    fn test_scenario_round_trip() {
        let codec = PayloadCodec::default();
        let challenge = ChallengeIssuer::default()
            .issue_at(ISSUED_AT, Duration::from_secs(600))
            .unwrap();

        let encoded = codec.encode(&challenge, CALLBACK, "sandbox").unwrap();
        let decoded = codec.decode(encoded.as_str().as_bytes()).unwrap();

        assert_eq!(decoded.challenge, challenge.value());
        assert_eq!(decoded.expires_at, ISSUED_AT + 600_000);
        assert!(encoded.size() <= 2048);
    }

    #[test]
    fn test_scenario_timestamp_before_issuance() {
        let device = EdgeDevice::generate(WALLET);
        let verifier = verifier_for(&[&device]);
        let mut attempt = open_attempt(Duration::from_secs(600));
        let response = device
            .respond(&challenge_of(&attempt), ISSUED_AT - 1_000)
            .unwrap();

        let err = attempt.submit(&response, ISSUED_AT + 1_000, &verifier).unwrap_err();

        assert!(matches!(err, LinkingError::TemporalOrderingViolation { .. }));
        assert_eq!(attempt.state(), LinkState::Rejected);
        assert!(matches!(
            attempt.rejection(),
            Some(RejectionReason::TemporalOrderingViolation { .. })
        ));
    }

    #[tokio::test]
    async fn test_scenario_expiry_after_wait() {
        let device = EdgeDevice::generate(WALLET);
        let service = AccountLinkingService::new(
            &LinkingConfig::default(),
            InMemoryChallengeStore::new(),
            verifier_for(&[&device]),
            MemoryLinkSink::new(),
        )
        .unwrap();

        let link = service
            .issue_link_with_lifetime(Duration::from_millis(1))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        let response = device
            .respond(&link.payload.payload.challenge, now_millis())
            .unwrap();

        let err = service.submit_response(&response).unwrap_err();

        assert!(matches!(err, LinkingError::ChallengeExpired { .. }));
        assert_eq!(
            service.link_state(&link.payload.payload.challenge).unwrap(),
            LinkState::Expired
        );
    }

    #[test]
    fn test_scenario_secret_in_wallet_address() {
        let device = EdgeDevice::generate(WALLET);
        let verifier = verifier_for(&[&device]);
        let mut attempt = open_attempt(Duration::from_secs(600));
        let challenge = challenge_of(&attempt);

        // Built by hand: the device itself refuses to send this.
        let response = ScanResponse::new(
            challenge.clone(),
            device.identifier(),
            "my secret wallet",
            device.sign_hex(challenge.as_bytes()),
            ISSUED_AT + 1_000,
        );

        let err = attempt.submit(&response, ISSUED_AT + 2_000, &verifier).unwrap_err();

        match err {
            LinkingError::SensitivityViolation { violations } => {
                assert_eq!(violations.len(), 1);
                assert_eq!(violations[0].pattern, "secret");
                assert_eq!(violations[0].location, "$.walletAddress");
            }
            other => panic!("expected sensitivity violation, got {other:?}"),
        }
        assert_eq!(attempt.state(), LinkState::Rejected);
        assert!(attempt.result().is_none());
    }

    #[test]
    fn test_valid_attempt_links() {
        let device = EdgeDevice::generate(WALLET);
        let verifier = verifier_for(&[&device]);
        let mut attempt = open_attempt(Duration::from_secs(600));
        let response = device
            .accept(&attempt.payload().payload, ISSUED_AT + 1_000)
            .unwrap();

        let result = attempt.submit(&response, ISSUED_AT + 2_000, &verifier).unwrap();

        assert_eq!(result.status(), "linked");
        assert_eq!(result.verification_method(), "qr_challenge_response");
        assert_eq!(result.wallet_address(), WALLET);
        assert_eq!(result.linked_at(), ISSUED_AT + 2_000);
        assert_eq!(attempt.state(), LinkState::Linked);
        assert!(attempt.challenge().is_none());
    }

    // =============================================================================
    // SINGLE USE
    // =============================================================================

    #[test]
    fn test_mismatch_is_idempotent_and_leaves_challenge_open() {
        let device = EdgeDevice::generate(WALLET);
        let verifier = verifier_for(&[&device]);
        let mut attempt = open_attempt(Duration::from_secs(600));
        let stranger = device.respond(&"A".repeat(43), ISSUED_AT + 1_000).unwrap();

        for _ in 0..3 {
            let err = attempt.submit(&stranger, ISSUED_AT + 2_000, &verifier).unwrap_err();
            assert_eq!(err, LinkingError::ChallengeMismatch);
            assert_eq!(attempt.state(), LinkState::Issued);
        }

        let response = device
            .accept(&attempt.payload().payload, ISSUED_AT + 3_000)
            .unwrap();
        assert!(attempt.submit(&response, ISSUED_AT + 4_000, &verifier).is_ok());
    }

    #[test]
    fn test_terminal_states_answer_already_resolved() {
        let device = EdgeDevice::generate(WALLET);
        let verifier = verifier_for(&[&device]);

        // LINKED
        let mut linked = open_attempt(Duration::from_secs(600));
        let response = device.accept(&linked.payload().payload, ISSUED_AT + 1).unwrap();
        linked.submit(&response, ISSUED_AT + 2, &verifier).unwrap();

        // REJECTED
        let mut rejected = open_attempt(Duration::from_secs(600));
        let mut forged = device.accept(&rejected.payload().payload, ISSUED_AT + 1).unwrap();
        forged.signature = device.sign_hex(b"other");
        rejected.submit(&forged, ISSUED_AT + 2, &verifier).unwrap_err();

        // EXPIRED
        let mut expired = open_attempt(Duration::from_millis(1));
        let late = device.respond(&challenge_of(&expired), ISSUED_AT + 1).unwrap();
        expired.submit(&late, ISSUED_AT + 10, &verifier).unwrap_err();

        for (attempt, response, state) in [
            (&mut linked, &response, LinkState::Linked),
            (&mut rejected, &forged, LinkState::Rejected),
            (&mut expired, &late, LinkState::Expired),
        ] {
            let err = attempt.submit(response, ISSUED_AT + 20, &verifier).unwrap_err();
            assert_eq!(err, LinkingError::AlreadyResolved { state });
            assert_eq!(attempt.state(), state);
        }
    }

    #[test]
    fn test_service_single_use() {
        let env = deployment(LinkingConfig::default());
        let link = env.service.issue_link().unwrap();
        env.clock.advance(2_000);
        let response = env
            .device
            .accept(&link.payload.payload, env.clock.now())
            .unwrap();

        env.service.submit_response(&response).unwrap();
        let replay = env.service.submit_response(&response).unwrap_err();

        assert_eq!(
            replay,
            LinkingError::AlreadyResolved {
                state: LinkState::Linked
            }
        );
        assert_eq!(env.service.store().len(), 1);
    }

    #[test]
    fn test_service_late_submission_is_expiry_not_rejection() {
        let env = deployment(LinkingConfig::default());
        let link = env
            .service
            .issue_link_with_lifetime(Duration::from_secs(1))
            .unwrap();
        env.clock.advance(5_000);
        let response = env
            .device
            .respond(&link.payload.payload.challenge, env.clock.now())
            .unwrap();

        let err = env.service.submit_response(&response).unwrap_err();
        assert_eq!(err.kind(), "challenge_expired");
        assert!(!err.is_rejection());
    }
}
