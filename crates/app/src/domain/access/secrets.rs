//! Secret and token primitives for access sessions.

use std::{fmt, mem};

use jiff::{SignedDuration, Timestamp};
use rand::{Rng, RngCore, rngs::OsRng};
use sha2::{Digest, Sha256};
use thiserror::Error;
use zeroize::Zeroize;

/// Random bytes behind every session token and ephemeral key.
pub const SESSION_TOKEN_BYTES: usize = 32;

const OTP_RANGE: std::ops::RangeInclusive<u32> = 100_000..=999_999;

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("otp deadline is out of range")]
    Deadline(#[source] jiff::Error),
}

/// Plaintext one-time code, handed to the patient exactly once.
pub struct OtpCode(String);

impl OtpCode {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Take the plaintext out, leaving an empty (zeroized) husk behind.
    #[must_use]
    pub fn into_string(mut self) -> String {
        mem::take(&mut self.0)
    }
}

impl fmt::Debug for OtpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OtpCode(**redacted**)")
    }
}

impl Drop for OtpCode {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

#[derive(Debug)]
pub struct OtpBundle {
    pub code: OtpCode,
    pub hash: String,
    pub expires_at: Timestamp,
}

/// 256 bits from the OS CSPRNG, lowercase hex.
#[must_use]
pub fn generate_session_token() -> String {
    let mut bytes = [0_u8; SESSION_TOKEN_BYTES];

    OsRng.fill_bytes(&mut bytes);

    let token = encode_hex(&bytes);

    bytes.zeroize();

    token
}

/// Mint a six digit code and its digest.
///
/// # Errors
///
/// Returns an error when `now + lifetime` overflows.
pub fn generate_otp(lifetime: SignedDuration) -> Result<OtpBundle, SecretError> {
    let expires_at = Timestamp::now()
        .checked_add(lifetime)
        .map_err(SecretError::Deadline)?;

    let code = OtpCode(OsRng.gen_range(OTP_RANGE).to_string());
    let hash = digest(code.as_str());

    Ok(OtpBundle {
        code,
        hash,
        expires_at,
    })
}

#[must_use]
pub fn verify_otp(candidate: &str, stored_hash: &str) -> bool {
    constant_time_eq(digest(candidate).as_bytes(), stored_hash.as_bytes())
}

/// SHA-256 of `payload`, lowercase hex.
#[must_use]
pub fn digest(payload: &str) -> String {
    encode_hex(&Sha256::digest(payload.as_bytes()))
}

/// Compare without short-circuiting on the first differing byte.
#[must_use]
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.iter().zip(b).fold(0_u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

pub(crate) fn encode_hex(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";

    let mut encoded = String::with_capacity(bytes.len() * 2);

    for byte in bytes {
        encoded.push(char::from(HEX[usize::from(byte >> 4)]));
        encoded.push(char::from(HEX[usize::from(byte & 0x0f)]));
    }

    encoded
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn session_tokens_are_64_hex_chars() {
        let token = generate_session_token();

        assert_eq!(token.len(), 64, "32 bytes encode to 64 hex chars");
        assert!(
            token.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()),
            "token must be lowercase hex: {token}"
        );
    }

    #[test]
    fn session_tokens_are_pairwise_distinct() {
        let tokens: HashSet<String> = (0..1_000).map(|_| generate_session_token()).collect();

        assert_eq!(tokens.len(), 1_000, "tokens must not collide");
    }

    #[test]
    fn otp_is_six_digits_in_range() -> Result<(), SecretError> {
        for _ in 0..200 {
            let bundle = generate_otp(SignedDuration::from_mins(10))?;
            let code = bundle.code.as_str();

            assert_eq!(code.len(), 6, "otp must have six digits: {code}");
            assert!(
                code.parse::<u32>().is_ok_and(|n| OTP_RANGE.contains(&n)),
                "otp out of range: {code}"
            );
        }

        Ok(())
    }

    #[test]
    fn otp_hash_is_digest_of_code() -> Result<(), SecretError> {
        let bundle = generate_otp(SignedDuration::from_mins(10))?;

        assert_eq!(bundle.hash, digest(bundle.code.as_str()));
        assert_ne!(bundle.hash, bundle.code.as_str(), "plaintext must not be stored");

        Ok(())
    }

    #[test]
    fn otp_expiry_follows_lifetime() -> Result<(), SecretError> {
        let before = Timestamp::now();
        let bundle = generate_otp(SignedDuration::from_mins(10))?;
        let remaining = bundle.expires_at.duration_since(before);

        assert!(
            remaining > SignedDuration::from_mins(9) && remaining <= SignedDuration::from_mins(10),
            "unexpected otp lifetime: {remaining:?}"
        );

        Ok(())
    }

    #[test]
    fn verify_otp_accepts_only_the_issued_code() {
        for code in ["100000", "482915", "999999"] {
            let hash = digest(code);

            assert!(verify_otp(code, &hash), "{code} must verify");
            assert!(!verify_otp("000000", &hash), "wrong code must fail");
            assert!(!verify_otp(&format!("{code} "), &hash), "padding must fail");
            assert!(!verify_otp("", &hash), "empty must fail");
        }
    }

    #[test]
    fn digest_is_known_sha256() {
        assert_eq!(
            digest("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn constant_time_eq_matches_slice_equality() {
        assert!(constant_time_eq(b"abc", b"abc"), "equal slices");
        assert!(!constant_time_eq(b"abc", b"abd"), "last byte differs");
        assert!(!constant_time_eq(b"abc", b"ab"), "length differs");
        assert!(constant_time_eq(b"", b""), "empty slices");
    }

    #[test]
    fn otp_code_debug_is_redacted() -> Result<(), SecretError> {
        let bundle = generate_otp(SignedDuration::from_mins(1))?;
        let rendered = format!("{bundle:?}");

        assert!(
            !rendered.contains(bundle.code.as_str()),
            "debug output leaked the code: {rendered}"
        );

        Ok(())
    }
}
