//! Request signing: `t=<unix_ms>,v1=<hmac_hex>` over `"<ts>.<body>"`,
//! the same Stripe-style envelope the dispatcher sends as the
//! `X-Webhook-Signature` header (spec.md §4.3).

use chrono::Utc;
use gateway_security::crypto::HashingService;

/// Tolerance window for `verify_signature`, per spec.md §4.3.
pub const DEFAULT_TOLERANCE_SECONDS: i64 = 300;

/// Current time in Unix milliseconds, as used for the `t=` field.
#[must_use]
pub fn current_timestamp_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Build the signature header for `body` signed with `secret` at
/// `ts_millis`.
#[must_use]
pub fn generate_signature(body: &str, secret: &str, ts_millis: i64) -> String {
    let signed_payload = format!("{ts_millis}.{body}");
    let hex_sig =
        HashingService::hmac_sha256_hex(secret.as_bytes(), signed_payload.as_bytes())
            .unwrap_or_default();
    format!("t={ts_millis},v1={hex_sig}")
}

fn parse_header(header: &str) -> Option<(i64, String)> {
    let mut ts = None;
    let mut sig = None;
    for part in header.split(',') {
        let mut kv = part.splitn(2, '=');
        match (kv.next(), kv.next()) {
            (Some("t"), Some(v)) => ts = v.trim().parse::<i64>().ok(),
            (Some("v1"), Some(v)) => sig = Some(v.trim().to_string()),
            _ => {}
        }
    }
    Some((ts?, sig?))
}

/// Verify a received `X-Gateway-Signature` header against `body` and
/// `secret`, rejecting signatures whose timestamp has drifted more than
/// `tolerance_seconds` from now.
#[must_use]
pub fn verify_signature(body: &str, header: &str, secret: &str, tolerance_seconds: i64) -> bool {
    let Some((ts_millis, received_sig)) = parse_header(header) else {
        return false;
    };
    let age_seconds = (Utc::now().timestamp_millis() - ts_millis).abs() / 1000;
    if age_seconds > tolerance_seconds {
        return false;
    }
    let signed_payload = format!("{ts_millis}.{body}");
    let Ok(expected) =
        HashingService::hmac_sha256(secret.as_bytes(), signed_payload.as_bytes())
    else {
        return false;
    };
    let Ok(received) = hex::decode(&received_sig) else {
        return false;
    };
    HashingService::constant_time_eq(&expected, &received)
}
