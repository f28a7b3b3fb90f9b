// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Bearer token claims decoding.
//!
//! This is a client-side convenience decode used only to find out when the
//! access token expires. Signatures are not checked; the API server remains
//! the only trust boundary.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Claims carried in an access token payload.
///
/// Only `exp` is interpreted. Everything else, `iat` included, is kept
/// as raw JSON so an oddly typed claim cannot make the token unreadable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Expiration time (Unix timestamp)
    #[serde(default)]
    pub exp: Option<i64>,
    /// Every other claim, untouched.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl Claims {
    /// Expiry as a UTC timestamp, if present and representable.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|exp| DateTime::from_timestamp(exp, 0))
    }
}

/// Reasons a token could not be decoded.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    #[error("expected 3 token segments, found {0}")]
    SegmentCount(usize),

    #[error("invalid base64url encoding")]
    Base64,

    #[error("invalid claims JSON")]
    Json,
}

/// Decode the claims of a three-segment bearer token without verifying it.
///
/// Only the middle (payload) segment is read. The header and signature
/// segments are ignored, so the signing algorithm does not matter.
pub fn decode_claims(token: &str) -> Result<Claims, DecodeError> {
    let segments: Vec<&str> = token.split('.').collect();
    let [_, payload, _] = segments.as_slice() else {
        return Err(DecodeError::SegmentCount(segments.len()));
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|_| DecodeError::Base64)?;

    serde_json::from_slice(&bytes).map_err(|_| DecodeError::Json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};

    fn make_token(claims: &serde_json::Value) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(b"unit_test_key"),
        )
        .unwrap()
    }

    #[test]
    fn test_decode_exp() {
        let token = make_token(&serde_json::json!({ "exp": 1_700_000_000, "sub": "42" }));
        let claims = decode_claims(&token).unwrap();

        assert_eq!(claims.exp, Some(1_700_000_000));
        assert_eq!(claims.extra.get("sub"), Some(&serde_json::json!("42")));
    }

    #[test]
    fn test_expired_token_still_decodes() {
        let token = make_token(&serde_json::json!({ "exp": 10 }));
        assert_eq!(decode_claims(&token).unwrap().exp, Some(10));
    }

    #[test]
    fn test_missing_exp_is_none() {
        let token = make_token(&serde_json::json!({ "sub": "42" }));
        let claims = decode_claims(&token).unwrap();
        assert_eq!(claims.exp, None);
        assert_eq!(claims.expires_at(), None);
    }

    #[test]
    fn test_wrong_segment_count() {
        assert_eq!(decode_claims(""), Err(DecodeError::SegmentCount(1)));
        assert_eq!(decode_claims("a.b"), Err(DecodeError::SegmentCount(2)));
        assert_eq!(decode_claims("a.b.c.d"), Err(DecodeError::SegmentCount(4)));
    }
}
