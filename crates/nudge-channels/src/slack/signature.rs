use ring::hmac;
use subtle::ConstantTimeEq;

/// Compute the Slack `v0` request signature for a timestamp + raw body.
pub fn sign(signing_secret: &str, timestamp: &str, body: &[u8]) -> String {
    let key = hmac::Key::new(hmac::HMAC_SHA256, signing_secret.as_bytes());
    let mut basestring = Vec::with_capacity(body.len() + timestamp.len() + 4);
    basestring.extend_from_slice(b"v0:");
    basestring.extend_from_slice(timestamp.as_bytes());
    basestring.extend_from_slice(b":");
    basestring.extend_from_slice(body);

    let tag = hmac::sign(&key, &basestring);
    let mut out = String::with_capacity(3 + tag.as_ref().len() * 2);
    out.push_str("v0=");
    for byte in tag.as_ref() {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

/// Verify a Slack request signature in constant time.
/// A missing secret rejects everything.
pub fn verify(signing_secret: &str, timestamp: &str, body: &[u8], signature: &str) -> bool {
    if signing_secret.is_empty() {
        return false;
    }
    let expected = sign(signing_secret, timestamp, body);
    expected.as_bytes().ct_eq(signature.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "8f742231b10e8888abcd99yyyzzz85a5";

    #[test]
    fn round_trip_verifies() {
        let body = b"token=abc&team_id=T1&text=remind+me";
        let signature = sign(SECRET, "1531420618", body);
        assert!(signature.starts_with("v0="));
        assert!(verify(SECRET, "1531420618", body, &signature));
    }

    #[test]
    fn tampered_body_fails() {
        let signature = sign(SECRET, "1531420618", b"payload");
        assert!(!verify(SECRET, "1531420618", b"payload-tampered", &signature));
    }

    #[test]
    fn wrong_timestamp_fails() {
        let signature = sign(SECRET, "1531420618", b"payload");
        assert!(!verify(SECRET, "1531420619", b"payload", &signature));
    }

    #[test]
    fn missing_secret_rejects() {
        let signature = sign(SECRET, "1531420618", b"payload");
        assert!(!verify("", "1531420618", b"payload", &signature));
    }

    #[test]
    fn signature_is_deterministic_hex() {
        let a = sign(SECRET, "1", b"x");
        let b = sign(SECRET, "1", b"x");
        assert_eq!(a, b);
        assert_eq!(a.len(), 3 + 64);
        assert!(a[3..].chars().all(|c| c.is_ascii_hexdigit()));
    }
}
