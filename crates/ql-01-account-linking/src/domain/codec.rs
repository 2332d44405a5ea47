//! # Linking Payload Codec
//!
//! Challenge plus metadata ⇄ the text a QR code carries.
//!
//! ```text
//! LinkingPayload ──serde_json──→ UTF-8 JSON ──base64url──→ transport text (≤ ceiling)
//! ```
//!
//! Encoding never truncates. A payload that is too large, or that the
//! sensitivity policy flags, is refused outright and nothing is emitted.
//! Decoding accepts padded or unpadded base64url.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use shared_policy::{ScanFailure, SensitivityScanner};
use uuid::Uuid;

use super::config::{has_uri_scheme, LinkingConfig};
use super::entities::{Challenge, Timestamp, MIN_CHALLENGE_CHARS};
use super::errors::{DecodeError, LinkingError};
use super::time::{from_wire, rfc3339_millis};

/// base64url, unpadded on output, padding-indifferent on input.
const TRANSPORT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// QR-transportable representation of a challenge.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkingPayload {
    pub version: String,
    /// Fixed discriminator, `account-linking` by default.
    #[serde(rename = "type")]
    pub kind: String,
    pub challenge: String,
    pub callback_location: String,
    #[serde(with = "rfc3339_millis")]
    pub expires_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    /// Correlation id, independent of the challenge value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<Uuid>,
}

impl LinkingPayload {
    pub fn is_expired(&self, now: Timestamp) -> bool {
        now > self.expires_at
    }
}

/// A payload together with its transport text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedPayload {
    pub payload: LinkingPayload,
    pub text: String,
}

impl EncodedPayload {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Encoded size in bytes.
    pub fn size(&self) -> usize {
        self.text.len()
    }
}

/// Encodes and decodes linking payloads.
#[derive(Debug, Clone)]
pub struct PayloadCodec {
    version: String,
    kind: String,
    max_bytes: usize,
    scanner: SensitivityScanner,
}

impl Default for PayloadCodec {
    fn default() -> Self {
        let config = LinkingConfig::default();
        Self {
            version: config.payload_version,
            kind: config.payload_type,
            max_bytes: config.max_payload_bytes,
            scanner: SensitivityScanner::edge_protection(),
        }
    }
}

impl PayloadCodec {
    pub fn new(
        version: impl Into<String>,
        kind: impl Into<String>,
        max_bytes: usize,
        scanner: SensitivityScanner,
    ) -> Self {
        Self {
            version: version.into(),
            kind: kind.into(),
            max_bytes,
            scanner,
        }
    }

    pub fn from_config(config: &LinkingConfig) -> Result<Self, LinkingError> {
        config.validate()?;
        let scanner = SensitivityScanner::new(config.policy.clone())?;
        Ok(Self::new(
            config.payload_version.clone(),
            config.payload_type.clone(),
            config.max_payload_bytes,
            scanner,
        ))
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    pub fn scanner(&self) -> &SensitivityScanner {
        &self.scanner
    }

    /// Build and encode the payload for `challenge`.
    ///
    /// An empty `environment` is left out of the payload.
    pub fn encode(
        &self,
        challenge: &Challenge,
        callback_location: &str,
        environment: &str,
    ) -> Result<EncodedPayload, LinkingError> {
        if !has_uri_scheme(callback_location) {
            return Err(LinkingError::InvalidCallback);
        }

        let payload = LinkingPayload {
            version: self.version.clone(),
            kind: self.kind.clone(),
            challenge: challenge.value().to_string(),
            callback_location: callback_location.to_string(),
            expires_at: challenge.expires_at(),
            environment: Some(environment.to_string()).filter(|env| !env.is_empty()),
            request_id: Some(Uuid::new_v4()),
        };

        self.encode_payload(payload)
    }

    /// Encode an already-built payload.
    pub fn encode_payload(&self, payload: LinkingPayload) -> Result<EncodedPayload, LinkingError> {
        self.scanner.scan(&payload)?.into_result()?;

        let json = serde_json::to_vec(&payload)
            .map_err(|e| ScanFailure::Unserializable(e.to_string()))?;
        let text = TRANSPORT.encode(json);

        if text.len() > self.max_bytes {
            return Err(LinkingError::EncodingTooLarge {
                size: text.len(),
                limit: self.max_bytes,
            });
        }

        tracing::debug!(
            size = text.len(),
            limit = self.max_bytes,
            request_id = ?payload.request_id,
            "linking payload encoded"
        );
        Ok(EncodedPayload { payload, text })
    }

    /// Parse transport text back into a payload.
    ///
    /// # Errors
    ///
    /// - `EncodingTooLarge` if the input exceeds the ceiling
    /// - `Decode(Malformed)` if it is not base64url JSON object text
    /// - `Decode(MissingField | InvalidField)` for absent or ill-shaped
    ///   required fields
    /// - `Decode(TypeMismatch)` for a foreign discriminator
    /// - `SensitivityViolation` if the payload carries forbidden content
    pub fn decode(&self, bytes: &[u8]) -> Result<LinkingPayload, LinkingError> {
        if bytes.len() > self.max_bytes {
            return Err(LinkingError::EncodingTooLarge {
                size: bytes.len(),
                limit: self.max_bytes,
            });
        }

        let text = std::str::from_utf8(bytes)
            .map_err(|e| DecodeError::Malformed(format!("not UTF-8: {e}")))?;
        let json = TRANSPORT
            .decode(text.trim())
            .map_err(|e| DecodeError::Malformed(format!("not base64url: {e}")))?;
        let value: Value = serde_json::from_slice(&json)
            .map_err(|e| DecodeError::Malformed(format!("not JSON: {e}")))?;
        let Value::Object(fields) = value else {
            return Err(DecodeError::Malformed("not a JSON object".into()).into());
        };

        let payload = self.parse_fields(&fields)?;
        self.scanner.scan_value(&Value::Object(fields))?.into_result()?;
        Ok(payload)
    }

    fn parse_fields(&self, fields: &Map<String, Value>) -> Result<LinkingPayload, DecodeError> {
        let version = required_str(fields, "version")?;
        let kind = required_str(fields, "type")?;
        let challenge = required_str(fields, "challenge")?;
        let callback_location = required_str(fields, "callbackLocation")?;
        let expires_at = from_wire(required(fields, "expiresAt")?)
            .ok_or(DecodeError::InvalidField("expiresAt"))?;

        if kind != self.kind {
            return Err(DecodeError::TypeMismatch {
                expected: self.kind.clone(),
            });
        }
        if challenge.len() < MIN_CHALLENGE_CHARS {
            return Err(DecodeError::InvalidField("challenge"));
        }

        let environment = match fields.get("environment") {
            None | Some(Value::Null) => None,
            Some(Value::String(env)) => Some(env.clone()),
            Some(_) => return Err(DecodeError::InvalidField("environment")),
        };
        let request_id = match fields.get("requestId") {
            None | Some(Value::Null) => None,
            Some(Value::String(id)) => {
                Some(Uuid::parse_str(id).map_err(|_| DecodeError::InvalidField("requestId"))?)
            }
            Some(_) => return Err(DecodeError::InvalidField("requestId")),
        };

        Ok(LinkingPayload {
            version,
            kind,
            challenge,
            callback_location,
            expires_at,
            environment,
            request_id,
        })
    }
}

fn required<'a>(fields: &'a Map<String, Value>, name: &'static str) -> Result<&'a Value, DecodeError> {
    match fields.get(name) {
        None | Some(Value::Null) => Err(DecodeError::MissingField(name)),
        Some(value) => Ok(value),
    }
}

fn required_str(fields: &Map<String, Value>, name: &'static str) -> Result<String, DecodeError> {
    match required(fields, name)? {
        Value::String(text) if !text.is_empty() => Ok(text.clone()),
        Value::String(_) => Err(DecodeError::MissingField(name)),
        _ => Err(DecodeError::InvalidField(name)),
    }
}
