//! Signed ban tokens.
//!
//! Wire format: `base64url(json claims) "." base64url(hmac_sha256(first part))`.
//! A token that fails any check is simply "not banned".

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Length of a generated signing key.
pub const GENERATED_KEY_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("malformed ban token")]
    Malformed,

    #[error("ban token signature mismatch")]
    BadSignature,

    #[error("ban token expired at {0}")]
    Expired(i64),

    #[error("invalid signing key")]
    InvalidKey,

    #[error("ban token lifetime out of range")]
    Lifetime,
}

/// Claims carried by the ban cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BanToken {
    pub id: Uuid,
    pub reason: String,
    /// Unix seconds.
    pub issued_at: i64,
    /// Unix seconds, exclusive.
    pub expires_at: i64,
}

impl BanToken {
    pub fn issue(
        reason: impl Into<String>,
        now: DateTime<Utc>,
        lifetime: Duration,
    ) -> Result<Self, TokenError> {
        let expires_at = now.checked_add_signed(lifetime).ok_or(TokenError::Lifetime)?;
        Ok(Self {
            id: Uuid::new_v4(),
            reason: reason.into(),
            issued_at: now.timestamp(),
            expires_at: expires_at.timestamp(),
        })
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.expires_at
    }

    /// Seconds of validity left at `now`, zero once expired.
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now.timestamp()).max(0)
    }
}

/// Signs and verifies [`BanToken`]s with a shared HMAC key.
#[derive(Clone)]
pub struct TokenSigner {
    key: Arc<[u8]>,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner").finish_non_exhaustive()
    }
}

impl TokenSigner {
    pub fn new(key: &[u8]) -> Result<Self, TokenError> {
        if key.is_empty() {
            return Err(TokenError::InvalidKey);
        }
        Ok(Self { key: key.into() })
    }

    /// Signer with a fresh random key. Tokens do not survive a restart.
    pub fn random() -> Self {
        let mut key = [0u8; GENERATED_KEY_LEN];
        rand::thread_rng().fill_bytes(&mut key);
        Self {
            key: Arc::from(&key[..]),
        }
    }

    fn mac(&self) -> Result<HmacSha256, TokenError> {
        HmacSha256::new_from_slice(&self.key).map_err(|_| TokenError::InvalidKey)
    }

    pub fn sign(&self, token: &BanToken) -> Result<String, TokenError> {
        let claims = serde_json::to_vec(token).map_err(|_| TokenError::Malformed)?;
        let payload = URL_SAFE_NO_PAD.encode(claims);

        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{payload}.{signature}"))
    }

    /// Integrity first, then expiry.
    pub fn verify(&self, raw: &str, now: DateTime<Utc>) -> Result<BanToken, TokenError> {
        let (payload, signature) = raw.trim().split_once('.').ok_or(TokenError::Malformed)?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| TokenError::Malformed)?;

        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::BadSignature)?;

        let claims = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| TokenError::Malformed)?;
        let token: BanToken = serde_json::from_slice(&claims).map_err(|_| TokenError::Malformed)?;

        if token.is_expired(now) {
            return Err(TokenError::Expired(token.expires_at));
        }
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> TokenSigner {
        TokenSigner::new(b"0123456789abcdef0123456789abcdef").unwrap()
    }

    #[test]
    fn test_valid_token_verifies() {
        let now = Utc::now();
        let token = BanToken::issue("firewall", now, Duration::hours(1)).unwrap();
        let raw = signer().sign(&token).unwrap();

        assert_eq!(signer().verify(&raw, now).unwrap(), token);
    }

    #[test]
    fn test_forged_signature_rejected() {
        let now = Utc::now();
        let raw = signer()
            .sign(&BanToken::issue("firewall", now, Duration::hours(1)).unwrap())
            .unwrap();

        let other = TokenSigner::new(b"another key entirely").unwrap();
        assert_eq!(other.verify(&raw, now), Err(TokenError::BadSignature));
    }

    #[test]
    fn test_tampered_claims_rejected() {
        let now = Utc::now();
        let raw = signer()
            .sign(&BanToken::issue("firewall", now, Duration::hours(1)).unwrap())
            .unwrap();
        let (_, signature) = raw.split_once('.').unwrap();

        let forged = BanToken::issue("firewall", now, Duration::days(365)).unwrap();
        let forged_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged).unwrap());
        let tampered = format!("{forged_payload}.{signature}");

        assert_eq!(signer().verify(&tampered, now), Err(TokenError::BadSignature));
    }

    #[test]
    fn test_expired_token_rejected() {
        let issued = Utc::now() - Duration::hours(2);
        let token = BanToken::issue("rate_exceeded", issued, Duration::hours(1)).unwrap();
        let raw = signer().sign(&token).unwrap();

        assert_eq!(
            signer().verify(&raw, Utc::now()),
            Err(TokenError::Expired(token.expires_at))
        );
    }

    #[test]
    fn test_lifetime_past_calendar_end_is_an_error() {
        let lifetime = Duration::seconds(10_000_000_000_000);
        assert_eq!(
            BanToken::issue("firewall", Utc::now(), lifetime),
            Err(TokenError::Lifetime)
        );
    }

    #[test]
    fn test_garbage_is_malformed() {
        let now = Utc::now();
        for raw in ["", "no-dot", "a.b!c", "%%%.%%%"] {
            assert_eq!(signer().verify(raw, now), Err(TokenError::Malformed), "{raw}");
        }
    }

    #[test]
    fn test_random_keys_differ() {
        let now = Utc::now();
        let raw = TokenSigner::random()
            .sign(&BanToken::issue("x", now, Duration::minutes(5)).unwrap())
            .unwrap();
        assert!(TokenSigner::random().verify(&raw, now).is_err());
    }
}
