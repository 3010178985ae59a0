//! Patient API token formatting, parsing, and verifier construction.

use std::{fmt, str::FromStr};

use rand::{RngCore, rngs::OsRng};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;
use zeroize::Zeroize;

use crate::domain::{access::secrets::encode_hex, patients::records::PatientIdentity};

/// API token identifier prefix.
pub const API_TOKEN_PREFIX: &str = "ss";

/// Number of secret bytes encoded in a token.
pub const API_TOKEN_SECRET_BYTES: usize = 32;

const API_TOKEN_SECRET_HEX_CHARS: usize = API_TOKEN_SECRET_BYTES * 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiTokenVersion {
    V1,
}

impl ApiTokenVersion {
    #[must_use]
    pub const fn as_i16(self) -> i16 {
        match self {
            Self::V1 => 1,
        }
    }

    #[must_use]
    pub const fn segment(self) -> &'static str {
        match self {
            Self::V1 => "v1",
        }
    }
}

impl TryFrom<i16> for ApiTokenVersion {
    type Error = ApiTokenError;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::V1),
            _ => Err(ApiTokenError::UnsupportedVersion),
        }
    }
}

impl FromStr for ApiTokenVersion {
    type Err = ApiTokenError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "v1" => Ok(Self::V1),
            _ => Err(ApiTokenError::UnsupportedVersion),
        }
    }
}

#[derive(Clone)]
pub struct ApiTokenSecret {
    bytes: [u8; API_TOKEN_SECRET_BYTES],
}

impl ApiTokenSecret {
    #[must_use]
    pub const fn from_bytes(bytes: [u8; API_TOKEN_SECRET_BYTES]) -> Self {
        Self { bytes }
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; API_TOKEN_SECRET_BYTES] {
        &self.bytes
    }
}

impl fmt::Debug for ApiTokenSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiTokenSecret(**redacted**)")
    }
}

impl Drop for ApiTokenSecret {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

#[derive(Debug, Clone)]
pub struct ParsedApiToken {
    pub token_uuid: Uuid,
    pub version: ApiTokenVersion,
    pub secret: ApiTokenSecret,
}

#[derive(Debug, Error)]
pub enum ApiTokenError {
    #[error("api token format is invalid")]
    InvalidFormat,

    #[error("api token uses an unsupported version")]
    UnsupportedVersion,

    #[error("api token secret encoding is invalid")]
    InvalidSecretEncoding,
}

#[must_use]
pub fn generate_api_token_secret() -> ApiTokenSecret {
    let mut secret = [0_u8; API_TOKEN_SECRET_BYTES];

    OsRng.fill_bytes(&mut secret);

    ApiTokenSecret::from_bytes(secret)
}

/// `ss_v1_<uuid>.<hex secret>`
#[must_use]
pub fn format_api_token(
    token_uuid: Uuid,
    version: ApiTokenVersion,
    secret: &ApiTokenSecret,
) -> String {
    format!(
        "{API_TOKEN_PREFIX}_{}_{}.{}",
        version.segment(),
        token_uuid.simple(),
        encode_hex(secret.as_bytes())
    )
}

/// # Errors
///
/// Returns an error when the token does not have the `ss_v1_<uuid>.<hex>` shape.
pub fn parse_api_token(token: &str) -> Result<ParsedApiToken, ApiTokenError> {
    let (prefix_and_id, secret_hex) = token.split_once('.').ok_or(ApiTokenError::InvalidFormat)?;

    let mut id_parts = prefix_and_id.splitn(3, '_');

    let (Some(API_TOKEN_PREFIX), Some(version_segment), Some(token_uuid_segment)) =
        (id_parts.next(), id_parts.next(), id_parts.next())
    else {
        return Err(ApiTokenError::InvalidFormat);
    };

    let version = ApiTokenVersion::from_str(version_segment)?;

    let token_uuid =
        Uuid::try_parse(token_uuid_segment).map_err(|_| ApiTokenError::InvalidFormat)?;

    let secret = decode_secret_hex(secret_hex).ok_or(ApiTokenError::InvalidSecretEncoding)?;

    Ok(ParsedApiToken {
        token_uuid,
        version,
        secret: ApiTokenSecret::from_bytes(secret),
    })
}

/// Stored verifier for a token: SHA-256 over
/// `{token_uuid}:{version}:{tenant_uuid}:{patient_uuid}:{secret_hex}`.
///
/// Binding the owner into the input means a verifier row cannot be moved to
/// another patient.
#[must_use]
pub fn token_verifier(
    token_uuid: &Uuid,
    version: ApiTokenVersion,
    owner: &PatientIdentity,
    secret: &ApiTokenSecret,
) -> String {
    let mut input = format!(
        "{}:{}:{}:{}:{}",
        token_uuid.simple(),
        version.as_i16(),
        owner.tenant.into_uuid().simple(),
        owner.patient.into_uuid().simple(),
        encode_hex(secret.as_bytes()),
    );

    let verifier = encode_hex(&Sha256::digest(input.as_bytes()));

    input.zeroize();

    verifier
}

fn decode_secret_hex(secret_hex: &str) -> Option<[u8; API_TOKEN_SECRET_BYTES]> {
    if secret_hex.len() != API_TOKEN_SECRET_HEX_CHARS {
        return None;
    }

    let mut secret = [0_u8; API_TOKEN_SECRET_BYTES];

    for (byte, pair) in secret.iter_mut().zip(secret_hex.as_bytes().chunks_exact(2)) {
        let [hi, lo] = pair else {
            return None;
        };

        *byte = (decode_hex_nibble(*hi)? << 4) | decode_hex_nibble(*lo)?;
    }

    Some(secret)
}

fn decode_hex_nibble(value: u8) -> Option<u8> {
    match value {
        b'0'..=b'9' => Some(value - b'0'),
        b'a'..=b'f' => Some(value - b'a' + 10),
        b'A'..=b'F' => Some(value - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::{patients::records::PatientUuid, tenants::records::TenantUuid};

    use super::*;

    fn owner() -> PatientIdentity {
        PatientIdentity {
            tenant: TenantUuid::from_uuid(Uuid::nil()),
            patient: PatientUuid::from_uuid(Uuid::max()),
        }
    }

    #[test]
    fn formatted_tokens_parse_back() {
        let token_uuid = Uuid::now_v7();
        let secret = ApiTokenSecret::from_bytes([0xAB; API_TOKEN_SECRET_BYTES]);
        let token = format_api_token(token_uuid, ApiTokenVersion::V1, &secret);

        assert!(token.starts_with("ss_v1_"), "unexpected prefix: {token}");

        let parsed = parse_api_token(&token).expect("token should parse");

        assert_eq!(parsed.token_uuid, token_uuid);
        assert_eq!(parsed.version, ApiTokenVersion::V1);
        assert_eq!(parsed.secret.as_bytes(), secret.as_bytes());
    }

    #[test]
    fn parse_rejects_malformed_tokens() {
        let uuid = Uuid::nil().simple();
        let hex = "ab".repeat(API_TOKEN_SECRET_BYTES);

        for (token, reason) in [
            (format!("lt_v1_{uuid}.{hex}"), "foreign prefix"),
            (format!("ss_v1_{uuid}{hex}"), "missing separator"),
            (format!("ss_v1_not-a-uuid.{hex}"), "bad uuid"),
            (format!("ss_v1_{uuid}.{}", &hex[2..]), "short secret"),
            (format!("ss_v1_{uuid}.{}zz", &hex[2..]), "non-hex secret"),
            (format!("ss_v1_{uuid}"), "no secret"),
        ] {
            assert!(parse_api_token(&token).is_err(), "{reason}: {token}");
        }

        assert!(
            matches!(
                parse_api_token(&format!("ss_v9_{uuid}.{hex}")),
                Err(ApiTokenError::UnsupportedVersion)
            ),
            "unknown version"
        );
    }

    #[test]
    fn verifier_is_bound_to_owner() {
        let token_uuid = Uuid::nil();
        let secret = ApiTokenSecret::from_bytes([0xCD; API_TOKEN_SECRET_BYTES]);
        let owner = owner();

        let first = token_verifier(&token_uuid, ApiTokenVersion::V1, &owner, &secret);
        let second = token_verifier(&token_uuid, ApiTokenVersion::V1, &owner, &secret);

        assert_eq!(first, second, "verifier must be deterministic");
        assert_eq!(first.len(), 64, "sha256 hex");

        let mut moved = owner;
        moved.patient = PatientUuid::from_uuid(Uuid::nil());

        assert_ne!(
            first,
            token_verifier(&token_uuid, ApiTokenVersion::V1, &moved, &secret),
            "verifier must change with the patient"
        );
    }

    #[test]
    fn secret_debug_is_redacted() {
        let secret = ApiTokenSecret::from_bytes([0xEF; API_TOKEN_SECRET_BYTES]);

        assert_eq!(format!("{secret:?}"), "ApiTokenSecret(**redacted**)");
    }
}
