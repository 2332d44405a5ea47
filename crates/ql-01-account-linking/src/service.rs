//! # Account Linking Service
//!
//! Application service implementing [`AccountLinkingApi`] over a
//! [`ChallengeStore`].
//!
//! ## Claim protocol
//!
//! ```text
//! get_and_lock(value)            snapshot: ISSUED(c)
//! compare_and_set(ISSUED→SCANNED)  ── lost ──→ AlreadyResolved (no validation)
//!        │ won
//! validate(c, response, now)
//! compare_and_set(SCANNED→terminal)
//! ```
//!
//! Only the submitter that wins the first swap validates, so two
//! simultaneous responses for one challenge yield one terminal outcome and
//! one `AlreadyResolved`.

use std::time::Duration;

use serde_json::Value;

use crate::domain::state_machine::{conclude, scan_step, ScanStep};
use crate::domain::{
    ChallengeIssuer, ChallengeRecord, DecodeError, LinkState, LinkingConfig, LinkingError,
    LinkingResult, PayloadCodec, ResponseValidator, ScanResponse,
};
use crate::ports::inbound::{AccountLinkingApi, IssuedLink};
use crate::ports::outbound::{
    ChallengeStore, IdentityVerifier, LinkSink, StoreError, SystemTimeSource, TimeSource,
};

fn store_error(err: StoreError) -> LinkingError {
    LinkingError::Store(err.to_string())
}

/// Store-backed linking service.
pub struct AccountLinkingService<S, V, K, T = SystemTimeSource>
where
    S: ChallengeStore,
    V: IdentityVerifier,
    K: LinkSink,
    T: TimeSource,
{
    issuer: ChallengeIssuer,
    codec: PayloadCodec,
    validator: ResponseValidator,
    callback_location: String,
    environment: String,
    store: S,
    verifier: V,
    sink: K,
    time: T,
}

impl<S, V, K> AccountLinkingService<S, V, K, SystemTimeSource>
where
    S: ChallengeStore,
    V: IdentityVerifier,
    K: LinkSink,
{
    /// Create a service on the system clock.
    pub fn new(config: &LinkingConfig, store: S, verifier: V, sink: K) -> Result<Self, LinkingError> {
        Self::with_time_source(config, store, verifier, sink, SystemTimeSource)
    }
}

impl<S, V, K, T> AccountLinkingService<S, V, K, T>
where
    S: ChallengeStore,
    V: IdentityVerifier,
    K: LinkSink,
    T: TimeSource,
{
    /// Create a service with an explicit time source.
    pub fn with_time_source(
        config: &LinkingConfig,
        store: S,
        verifier: V,
        sink: K,
        time: T,
    ) -> Result<Self, LinkingError> {
        let codec = PayloadCodec::from_config(config)?;
        Ok(Self {
            issuer: ChallengeIssuer::from_config(config)?,
            validator: ResponseValidator::new(codec.scanner().clone()),
            codec,
            callback_location: config.callback_location.clone(),
            environment: config.environment.clone(),
            store,
            verifier,
            sink,
            time,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn verifier(&self) -> &V {
        &self.verifier
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn codec(&self) -> &PayloadCodec {
        &self.codec
    }

    /// Resolve a response and hand a successful link to the sink.
    ///
    /// A sink failure is reported as `Sink`; the challenge stays `LINKED`.
    pub async fn link_and_record(&self, response: &ScanResponse) -> Result<LinkingResult, LinkingError> {
        let result = self.submit_response(response)?;
        self.record(result).await
    }

    /// Raw JSON counterpart of [`link_and_record`](Self::link_and_record).
    pub async fn link_and_record_json(&self, body: &[u8]) -> Result<LinkingResult, LinkingError> {
        let result = self.submit_response_json(body)?;
        self.record(result).await
    }

    async fn record(&self, result: LinkingResult) -> Result<LinkingResult, LinkingError> {
        self.sink
            .record(&result)
            .await
            .map_err(|e| LinkingError::Sink(e.to_string()))?;
        Ok(result)
    }

    fn issue(&self, lifetime: Duration) -> Result<IssuedLink, LinkingError> {
        let now = self.time.now();
        let challenge = self.issuer.issue_at(now, lifetime)?;
        let payload = self
            .codec
            .encode(&challenge, &self.callback_location, &self.environment)?;
        let fingerprint = challenge.fingerprint();
        let expires_at = challenge.expires_at();
        let value = challenge.value().to_owned();

        self.store
            .put(&value, ChallengeRecord::Issued(challenge))
            .map_err(store_error)?;

        tracing::info!(
            fingerprint = %fingerprint,
            expires_at,
            payload_bytes = payload.size(),
            "link challenge issued"
        );
        Ok(IssuedLink {
            fingerprint,
            payload,
        })
    }

    fn resolve(
        &self,
        response: &ScanResponse,
        document: Option<&Value>,
    ) -> Result<LinkingResult, LinkingError> {
        let now = self.time.now();
        let key = response.challenge.as_str();
        let record = self
            .store
            .get_and_lock(key)
            .map_err(store_error)?
            .ok_or(LinkingError::UnknownChallenge)?;

        let challenge = match scan_step(&record, response, now) {
            ScanStep::Claim(challenge) => challenge,
            ScanStep::Expire(err) => {
                let expired = ChallengeRecord::Expired {
                    expires_at: record.expires_at(),
                };
                if !self
                    .store
                    .compare_and_set(key, &record, expired)
                    .map_err(store_error)?
                {
                    return Err(self.already_resolved(key));
                }
                tracing::warn!(
                    fingerprint = %crate::domain::fingerprint(key),
                    expires_at = record.expires_at(),
                    now,
                    "link challenge expired"
                );
                return Err(err);
            }
            ScanStep::Refuse(err) => return Err(err),
        };
        let fingerprint = challenge.fingerprint();

        let scanned = ChallengeRecord::Scanned(challenge.clone());
        if !self
            .store
            .compare_and_set(key, &record, scanned.clone())
            .map_err(store_error)?
        {
            tracing::debug!(fingerprint = %fingerprint, "lost claim on challenge");
            return Err(self.already_resolved(key));
        }

        let outcome = match document {
            Some(document) => {
                self.validator
                    .validate_document(&challenge, response, document, now, &self.verifier)
            }
            None => self
                .validator
                .validate(&challenge, response, now, &self.verifier),
        };
        let (next, result) = conclude(&challenge, response, outcome, now);
        let state = next.state();

        if !self
            .store
            .compare_and_set(key, &scanned, next)
            .map_err(store_error)?
        {
            return Err(LinkingError::Store(
                "challenge record changed while claimed".into(),
            ));
        }

        match &result {
            Ok(_) => tracing::info!(fingerprint = %fingerprint, %state, "link challenge resolved"),
            Err(err) => tracing::warn!(
                fingerprint = %fingerprint,
                %state,
                reason = err.kind(),
                "link challenge resolved"
            ),
        }
        result
    }

    fn already_resolved(&self, key: &str) -> LinkingError {
        let state = self
            .store
            .get_and_lock(key)
            .ok()
            .flatten()
            .map(|record| record.state())
            .unwrap_or(LinkState::Scanned);
        LinkingError::AlreadyResolved { state }
    }
}

impl<S, V, K, T> AccountLinkingApi for AccountLinkingService<S, V, K, T>
where
    S: ChallengeStore,
    V: IdentityVerifier,
    K: LinkSink,
    T: TimeSource,
{
    fn issue_link(&self) -> Result<IssuedLink, LinkingError> {
        self.issue(self.issuer.default_lifetime())
    }

    fn issue_link_with_lifetime(&self, lifetime: Duration) -> Result<IssuedLink, LinkingError> {
        self.issue(lifetime)
    }

    fn submit_response(&self, response: &ScanResponse) -> Result<LinkingResult, LinkingError> {
        self.resolve(response, None)
    }

    fn submit_response_json(&self, body: &[u8]) -> Result<LinkingResult, LinkingError> {
        let document: Value = serde_json::from_slice(body)
            .map_err(|e| DecodeError::Malformed(format!("not JSON: {e}")))?;
        let response: ScanResponse = serde_json::from_value(document.clone())
            .map_err(|e| DecodeError::Malformed(format!("not a scan response: {e}")))?;
        self.resolve(&response, Some(&document))
    }

    fn link_state(&self, challenge_value: &str) -> Result<LinkState, LinkingError> {
        self.store
            .get_and_lock(challenge_value)
            .map_err(store_error)?
            .map(|record| record.state())
            .ok_or(LinkingError::UnknownChallenge)
    }
}
