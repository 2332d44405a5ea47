//! # Edge Protection
//!
//! Key material must never cross the device/server boundary, in either
//! direction:
//!
//! - the device refuses to emit an unsafe response
//! - the server rejects untyped fields smuggled into a response document
//! - the server refuses to emit a payload that trips the policy
//! - deployments can extend the vocabulary without code changes

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};
    use shared_policy::{PolicyConfig, Severity};

    use ql_01_account_linking::adapters::EdgeDevice;
    use ql_01_account_linking::{
        AccountLinkingApi, LinkState, LinkingConfig, LinkingError, RejectionReason, TimeSource,
    };

    use crate::integration::support::{deployment, Deployment, ISSUED_AT};

    fn response_document(env: &Deployment) -> (String, Value) {
        let link = env.service.issue_link().unwrap();
        env.clock.advance(1_000);
        let response = env
            .device
            .accept(&link.payload.payload, env.clock.now())
            .unwrap();
        (
            link.payload.payload.challenge,
            serde_json::to_value(&response).unwrap(),
        )
    }

    #[test]
    fn test_device_refuses_unsafe_response() {
        let device = EdgeDevice::generate("wallet with seed words");
        let err = device.respond(&"A".repeat(43), ISSUED_AT).unwrap_err();

        match err {
            LinkingError::SensitivityViolation { violations } => {
                assert_eq!(violations[0].pattern, "seed");
                assert_eq!(violations[0].location, "$.walletAddress");
            }
            other => panic!("expected sensitivity violation, got {other:?}"),
        }
    }

    #[test]
    fn test_nested_smuggling_rejected() {
        let env = deployment(LinkingConfig::default());
        let (challenge, mut document) = response_document(&env);
        document["meta"] = json!({ "backup": { "mnemonic": "abandon abandon about" } });

        let err = env
            .service
            .submit_response_json(document.to_string().as_bytes())
            .unwrap_err();

        match err {
            LinkingError::SensitivityViolation { violations } => {
                assert_eq!(violations.len(), 1);
                assert_eq!(violations[0].location, "$.meta.backup.mnemonic");
            }
            other => panic!("expected sensitivity violation, got {other:?}"),
        }
        assert_eq!(env.service.link_state(&challenge).unwrap(), LinkState::Rejected);
        assert!(env.sink.links().is_empty());
    }

    #[test]
    fn test_depth_bomb_is_scan_failure() {
        let env = deployment(LinkingConfig::default());
        let (challenge, mut document) = response_document(&env);
        document["meta"] = (0..100).fold(json!("x"), |inner, _| json!([inner]));

        let err = env
            .service
            .submit_response_json(document.to_string().as_bytes())
            .unwrap_err();

        assert_eq!(err.kind(), "scan_failure");
        assert_eq!(env.service.link_state(&challenge).unwrap(), LinkState::Rejected);
    }

    #[test]
    fn test_unsafe_payload_never_issued() {
        let config = LinkingConfig {
            environment: "seed-lab".to_string(),
            ..LinkingConfig::default()
        };
        let env = deployment(config);

        let err = env.service.issue_link().unwrap_err();

        assert_eq!(err.kind(), "sensitivity_violation");
        assert!(env.service.store().is_empty());
    }

    #[test]
    fn test_extended_vocabulary() {
        let mut config = LinkingConfig::default();
        config.policy = PolicyConfig::edge_protection().with_forbidden("password", Severity::Critical);
        let env = deployment(config);
        let (challenge, mut document) = response_document(&env);
        document["walletPassword"] = json!("hunter2");

        let err = env
            .service
            .submit_response_json(document.to_string().as_bytes())
            .unwrap_err();

        assert!(matches!(err, LinkingError::SensitivityViolation { .. }));
        assert_eq!(env.service.link_state(&challenge).unwrap(), LinkState::Rejected);
    }

    #[test]
    fn test_default_vocabulary_allows_public_artifacts() {
        let env = deployment(LinkingConfig::default());
        let (_, mut document) = response_document(&env);
        document["publicKey"] = json!(env.device.identifier());
        document["session"] = json!("s-001");

        let result = env
            .service
            .submit_response_json(document.to_string().as_bytes())
            .unwrap();
        assert_eq!(result.identifier(), env.device.identifier());
    }

    #[test]
    fn test_rejection_reason_kinds() {
        let reason = RejectionReason::SignatureInvalid;
        assert_eq!(reason.kind(), "signature_invalid");
        let err: LinkingError = reason.into();
        assert!(err.is_rejection());
    }
}
