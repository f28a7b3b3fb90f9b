// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Access token decoding tests.
//!
//! Tokens here are minted the same way the API server signs them; the client
//! must read `exp` without knowing the signing key.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use session_keeper::token::{decode_claims, DecodeError};

mod common;
use common::{make_token, make_token_with_claims};

fn raw_token(header: &str, payload: &str) -> String {
    format!(
        "{}.{}.c2lnbmF0dXJl",
        URL_SAFE_NO_PAD.encode(header),
        URL_SAFE_NO_PAD.encode(payload)
    )
}

#[test]
fn test_exp_roundtrip() {
    for exp in [0, 1_000, 1_700_000_000, 4_102_444_800] {
        let claims = decode_claims(&make_token(exp)).expect("token should decode");
        assert_eq!(claims.exp, Some(exp));
        assert_eq!(claims.extra["iat"], serde_json::json!(exp - 3600));
    }
}

#[test]
fn test_other_claims_are_preserved() {
    let token = make_token_with_claims(&serde_json::json!({
        "sub": "learner-1",
        "scope": "ADMIN",
        "jti": "6f1c",
        "exp": 1_700_000_000,
    }));

    let claims = decode_claims(&token).unwrap();
    assert_eq!(claims.extra["scope"], "ADMIN");
    assert_eq!(claims.extra["jti"], "6f1c");
    assert_eq!(
        claims.expires_at().map(|t| t.timestamp()),
        Some(1_700_000_000)
    );
}

#[test]
fn test_signature_is_not_checked() {
    let token = make_token(1_700_000_000);
    let (unsigned, _) = token.rsplit_once('.').unwrap();
    let tampered = format!("{}.AAAA", unsigned);

    assert_eq!(decode_claims(&tampered).unwrap().exp, Some(1_700_000_000));
}

#[test]
fn test_unknown_header_algorithm_still_decodes() {
    let token = raw_token(r#"{"alg":"RS256","typ":"JWT"}"#, r#"{"exp":42}"#);
    assert_eq!(decode_claims(&token).unwrap().exp, Some(42));
}

#[test]
fn test_header_is_ignored() {
    let headers = [
        r#"{"alg":"none"}"#,
        r#"{"typ":"JWT"}"#,
        r#"{"alg":"ES512","kid":"rotated-2026"}"#,
        "not even json",
    ];

    for header in headers {
        let token = raw_token(header, r#"{"exp":2000}"#);
        assert_eq!(
            decode_claims(&token).map(|c| c.exp),
            Ok(Some(2000)),
            "header {:?}",
            header
        );
    }
}

#[test]
fn test_header_segment_need_not_be_base64() {
    let payload = URL_SAFE_NO_PAD.encode(r#"{"exp":2000}"#);
    let token = format!("%%%.{}.sig", payload);
    assert_eq!(decode_claims(&token).unwrap().exp, Some(2000));
}

#[test]
fn test_oddly_typed_claims_do_not_block_exp() {
    let token = raw_token(
        r#"{"alg":"HS256"}"#,
        r#"{"exp":2000,"iat":"x","nbf":null,"sub":42}"#,
    );
    let claims = decode_claims(&token).unwrap();

    assert_eq!(claims.exp, Some(2000));
    assert_eq!(claims.extra["iat"], serde_json::json!("x"));
    assert_eq!(claims.extra["sub"], serde_json::json!(42));
}

#[test]
fn test_padded_payload_decodes() {
    let payload = base64::engine::general_purpose::URL_SAFE.encode(r#"{"exp":20}"#);
    assert!(payload.ends_with('='));
    let token = format!("e30.{}.sig", payload);
    assert_eq!(decode_claims(&token).unwrap().exp, Some(20));
}

#[test]
fn test_payload_not_an_object() {
    let token = raw_token(r#"{"alg":"HS256"}"#, "[2000]");
    assert_eq!(decode_claims(&token), Err(DecodeError::Json));
}

#[test]
fn test_payload_not_json() {
    let token = raw_token(r#"{"alg":"HS256","typ":"JWT"}"#, "definitely not json");
    assert_eq!(decode_claims(&token), Err(DecodeError::Json));
}

#[test]
fn test_exp_with_wrong_type() {
    let token = raw_token(r#"{"alg":"HS256","typ":"JWT"}"#, r#"{"exp":"tomorrow"}"#);
    assert_eq!(decode_claims(&token), Err(DecodeError::Json));
}

#[test]
fn test_payload_not_base64() {
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
    let token = format!("{}.%%%not-base64%%%.sig", header);
    assert_eq!(decode_claims(&token), Err(DecodeError::Base64));
}

#[test]
fn test_malformed_inputs_fail_without_panicking() {
    let inputs = [
        "",
        ".",
        "..",
        "...",
        "Bearer abc",
        "only-one-segment",
        "two.segments",
        "a.b.c.d",
        "\u{1F600}.\u{1F600}.\u{1F600}",
    ];

    for input in inputs {
        assert!(
            decode_claims(input).is_err(),
            "expected decode failure for {:?}",
            input
        );
    }
}

#[test]
fn test_segment_count_is_reported() {
    assert_eq!(
        decode_claims("two.segments"),
        Err(DecodeError::SegmentCount(2))
    );
}
