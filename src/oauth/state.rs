//! Transient auth state: the artifact that survives the redirect round-trip.
//!
//! The artifact rides in a client-held cookie and is attacker-controlled the
//! moment it leaves the server, so it is signed (HS256) and verified before a
//! single field is trusted. Any verification failure is `InvalidState`.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Cookie the artifact rides in.
pub const STATE_COOKIE: &str = "authkit_state";

/// Per-flow state carried across the redirect.
#[derive(Debug, Clone, PartialEq)]
pub struct TransientAuthState {
    pub provider: String,
    pub mobile: bool,
    pub popup: bool,
    /// Echoed back by the IdP in the `state` query parameter.
    pub nonce: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct StateClaims {
    provider: String,
    mobile: bool,
    popup: bool,
    nonce: String,
    iat: i64,
    exp: i64,
}

/// Signs and verifies the transient artifact.
#[derive(Clone)]
pub struct StateSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_minutes: i64,
}

impl StateSigner {
    pub fn new(secret: &str, ttl_minutes: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl_minutes,
        }
    }

    pub fn ttl_minutes(&self) -> i64 {
        self.ttl_minutes
    }

    /// Fresh unpredictable nonce for the IdP `state` parameter.
    pub fn new_nonce() -> String {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill(&mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }

    pub fn sign(&self, state: &TransientAuthState) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = StateClaims {
            provider: state.provider.clone(),
            mobile: state.mobile,
            popup: state.popup,
            nonce: state.nonce.clone(),
            iat: now.timestamp(),
            exp: (now + Duration::minutes(self.ttl_minutes)).timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to sign auth state: {}", e)))
    }

    /// Verify and deserialize an artifact. Missing, corrupt, expired, or
    /// re-signed payloads all collapse to `InvalidState`; the flow must not
    /// proceed on a best-effort guess of the provider.
    pub fn verify(&self, token: &str) -> Result<TransientAuthState, AppError> {
        let validation = Validation::new(Algorithm::HS256);

        let data = decode::<StateClaims>(token, &self.decoding_key, &validation).map_err(|e| {
            tracing::warn!(error = %e, "rejected oauth state artifact");
            AppError::InvalidState
        })?;

        Ok(TransientAuthState {
            provider: data.claims.provider,
            mobile: data.claims.mobile,
            popup: data.claims.popup,
            nonce: data.claims.nonce,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> StateSigner {
        StateSigner::new("test-state-secret-0123456789abcdef", 5)
    }

    fn state() -> TransientAuthState {
        TransientAuthState {
            provider: "github".to_string(),
            mobile: false,
            popup: true,
            nonce: StateSigner::new_nonce(),
        }
    }

    #[test]
    fn round_trip() {
        let signer = signer();
        let state = state();
        let token = signer.sign(&state).unwrap();
        let verified = signer.verify(&token).unwrap();
        assert_eq!(verified, state);
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let signer = signer();
        let token = signer.sign(&state()).unwrap();

        // Flip a byte in the payload segment.
        let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
        let mut payload = parts[1].clone().into_bytes();
        payload[0] = if payload[0] == b'A' { b'B' } else { b'A' };
        parts[1] = String::from_utf8(payload).unwrap();
        let tampered = parts.join(".");

        assert!(matches!(
            signer.verify(&tampered),
            Err(AppError::InvalidState)
        ));
    }

    #[test]
    fn foreign_signature_is_rejected() {
        let signer = signer();
        let other = StateSigner::new("another-secret-entirely-0123456789", 5);
        let token = other.sign(&state()).unwrap();

        assert!(matches!(signer.verify(&token), Err(AppError::InvalidState)));
    }

    #[test]
    fn expired_artifact_is_rejected() {
        // Signed with a TTL already in the past.
        let expired = StateSigner::new("test-state-secret-0123456789abcdef", -5);
        let token = expired.sign(&state()).unwrap();

        assert!(matches!(
            signer().verify(&token),
            Err(AppError::InvalidState)
        ));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(
            signer().verify("not-a-token"),
            Err(AppError::InvalidState)
        ));
    }
}
