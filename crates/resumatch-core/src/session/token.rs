//! Bearer token claim decoding.
//!
//! Tokens are three dot-delimited segments; the middle one is a
//! base64url-encoded JSON object. Only the claims are read here. The
//! signature is the backend's business.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;

use crate::error::AuthError;

/// Claims the client cares about. Everything else in the payload is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TokenClaims {
    /// Expiry as a Unix timestamp in seconds. Absent means non-expiring.
    #[serde(default)]
    pub exp: Option<i64>,
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

impl TokenClaims {
    /// Decode the payload segment of `token`.
    pub fn decode(token: &str) -> Result<Self, AuthError> {
        let segments: Vec<&str> = token.split('.').collect();
        if segments.len() != 3 {
            return Err(AuthError::InvalidToken(format!(
                "expected 3 segments, found {}",
                segments.len()
            )));
        }

        let payload = segments[1].trim_end_matches('=');
        let bytes = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|e| AuthError::InvalidToken(format!("payload is not base64url: {e}")))?;

        let mut value: serde_json::Value = serde_json::from_slice(&bytes)
            .map_err(|e| AuthError::InvalidToken(format!("payload is not JSON: {e}")))?;
        if !value.is_object() {
            return Err(AuthError::InvalidToken("payload is not an object".into()));
        }

        // Some issuers emit fractional `exp`; whole seconds are enough.
        if let Some(exp) = value.get("exp").and_then(|v| v.as_f64()) {
            value["exp"] = serde_json::json!(exp.floor() as i64);
        }

        serde_json::from_value(value)
            .map_err(|e| AuthError::InvalidToken(format!("malformed claims: {e}")))
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|exp| Utc.timestamp_opt(exp, 0).single())
    }

    /// `exp` strictly before `now`. Tokens without `exp` never expire.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.exp {
            Some(exp) => exp.saturating_mul(1000) < now.timestamp_millis(),
            None => false,
        }
    }
}

/// Decode `token` and reject it when it is undecodable or already expired.
pub fn check_token(token: &str, now: DateTime<Utc>) -> Result<TokenClaims, AuthError> {
    let claims = TokenClaims::decode(token)?;
    if claims.is_expired_at(now) {
        return Err(AuthError::TokenExpired);
    }
    Ok(claims)
}

/// Build an unsigned token around `claims`. Test helper for this crate and
/// its integration tests.
#[doc(hidden)]
pub fn encode_unsigned(claims: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.signature")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    #[test]
    fn decodes_standard_claims() {
        let token = encode_unsigned(&json!({
            "sub": "ada",
            "email": "ada@example.com",
            "username": "ada",
            "exp": 1_900_000_000
        }));
        let claims = TokenClaims::decode(&token).unwrap();
        assert_eq!(claims.exp, Some(1_900_000_000));
        assert_eq!(claims.sub.as_deref(), Some("ada"));
        assert_eq!(claims.email.as_deref(), Some("ada@example.com"));
    }

    #[test]
    fn missing_exp_never_expires() {
        let token = encode_unsigned(&json!({ "sub": "ada" }));
        let claims = TokenClaims::decode(&token).unwrap();
        assert_eq!(claims.expires_at(), None);
        assert!(!claims.is_expired_at(Utc::now() + Duration::days(365 * 100)));
    }

    #[test]
    fn past_exp_is_expired_future_is_not() {
        let now = Utc::now();
        let past = encode_unsigned(&json!({ "exp": (now - Duration::minutes(1)).timestamp() }));
        let future = encode_unsigned(&json!({ "exp": (now + Duration::hours(1)).timestamp() }));

        assert_eq!(check_token(&past, now), Err(AuthError::TokenExpired));
        assert!(check_token(&future, now).is_ok());
    }

    #[test]
    fn exp_within_the_current_second_is_expired() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_500).unwrap();
        let claims = TokenClaims {
            exp: Some(1_700_000_000),
            ..Default::default()
        };
        assert!(claims.is_expired_at(now));
    }

    #[test]
    fn accepts_padded_payload_and_fractional_exp() {
        let header = URL_SAFE_NO_PAD.encode(b"{}");
        let payload = base64::engine::general_purpose::URL_SAFE.encode(br#"{"exp": 1900000000.75}"#);
        let token = format!("{header}.{payload}.sig");
        let claims = TokenClaims::decode(&token).unwrap();
        assert_eq!(claims.exp, Some(1_900_000_000));
    }

    #[test]
    fn rejects_malformed_tokens() {
        for token in ["", "opaque-token", "a.b", "a.b.c.d", "a.!!!.c"] {
            assert!(
                matches!(TokenClaims::decode(token), Err(AuthError::InvalidToken(_))),
                "{token:?} should be rejected"
            );
        }

        let not_json = format!("h.{}.s", URL_SAFE_NO_PAD.encode("hello"));
        assert!(TokenClaims::decode(&not_json).is_err());

        let array = format!("h.{}.s", URL_SAFE_NO_PAD.encode("[1,2]"));
        assert!(TokenClaims::decode(&array).is_err());

        let text_exp = encode_unsigned(&json!({ "exp": "tomorrow" }));
        assert!(TokenClaims::decode(&text_exp).is_err());
    }
}
