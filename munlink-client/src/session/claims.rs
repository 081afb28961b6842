//! Defensive access-token claims decoding

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::Deserialize;

/// Claims this client reads from an access-token payload.
///
/// Only `exp` drives behavior (renewal scheduling). The signature is never
/// verified here; that is the backend's job, and `exp` is consulted for
/// scheduling only, not for authorization decisions.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TokenClaims {
    /// Expiration time (epoch seconds)
    #[serde(default)]
    pub exp: Option<i64>,
    /// Subject (user ID)
    #[serde(default)]
    pub sub: Option<String>,
    /// Role claim the backend stamps into tokens
    #[serde(default)]
    pub role: Option<String>,
}

/// Decode the payload segment of a JWT without verifying it.
///
/// Returns `None` for anything that is not a three-segment token carrying a
/// base64url-encoded JSON payload. Opaque or corrupted tokens are a normal
/// occurrence, so every failure mode degrades to "no claims" instead of
/// erroring.
pub fn decode_claims(token: &str) -> Option<TokenClaims> {
    let mut segments = token.split('.');
    let payload = match (segments.next(), segments.next(), segments.next()) {
        (Some(_), Some(payload), Some(_)) => payload,
        _ => return None,
    };
    if segments.next().is_some() {
        return None;
    }

    // Tokens arrive unpadded; tolerate padded ones from sloppy producers.
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let text = String::from_utf8(bytes).ok()?;
    serde_json::from_str(&text).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_token(payload_json: &str) -> String {
        format!(
            "{}.{}.{}",
            URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#),
            URL_SAFE_NO_PAD.encode(payload_json),
            URL_SAFE_NO_PAD.encode("signature")
        )
    }

    #[test]
    fn decodes_exp_and_passthrough_claims() {
        let token = make_token(r#"{"exp":1999999999,"sub":"42","role":"resident"}"#);
        let claims = decode_claims(&token).expect("claims");
        assert_eq!(claims.exp, Some(1999999999));
        assert_eq!(claims.sub.as_deref(), Some("42"));
        assert_eq!(claims.role.as_deref(), Some("resident"));
    }

    #[test]
    fn tolerates_missing_exp() {
        let token = make_token(r#"{"sub":"42"}"#);
        let claims = decode_claims(&token).expect("claims");
        assert_eq!(claims.exp, None);
    }

    #[test]
    fn ignores_unknown_claims() {
        let token = make_token(r#"{"exp":100,"jti":"abc","type":"access","fresh":false}"#);
        assert_eq!(decode_claims(&token).and_then(|c| c.exp), Some(100));
    }

    #[test]
    fn rejects_non_jwt_shapes() {
        assert_eq!(decode_claims("not-a-jwt"), None);
        assert_eq!(decode_claims("a.b"), None);
        assert_eq!(decode_claims("a.b.c.d"), None);
        assert_eq!(decode_claims(""), None);
    }

    #[test]
    fn rejects_invalid_base64url() {
        assert_eq!(decode_claims("a.!!!.c"), None);
    }

    #[test]
    fn rejects_non_json_payload() {
        let token = format!("h.{}.s", URL_SAFE_NO_PAD.encode("plainly not json"));
        assert_eq!(decode_claims(&token), None);
    }

    #[test]
    fn rejects_non_object_json_payload() {
        let token = format!("h.{}.s", URL_SAFE_NO_PAD.encode("null"));
        assert_eq!(decode_claims(&token), None);
    }

    #[test]
    fn accepts_padded_payload() {
        use base64::engine::general_purpose::URL_SAFE;
        let token = format!("h.{}.s", URL_SAFE.encode(r#"{"exp":7}"#));
        assert_eq!(decode_claims(&token).and_then(|c| c.exp), Some(7));
    }
}
