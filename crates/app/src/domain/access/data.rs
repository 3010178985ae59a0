//! Access Session Data

use jiff::Timestamp;
use serde::Serialize;

use crate::domain::{
    access::{
        AccessServiceError,
        records::{AccessChannel, AccessSessionUuid, AccessStatus},
        secrets::OtpCode,
    },
    records::records::SharedRecord,
};

/// Patient request to share records with a doctor.
#[derive(Debug, Clone)]
pub struct NewAccessSession {
    pub doctor_email: String,
    pub channel: AccessChannel,
}

/// The one-time secret returned to the issuing patient.
#[derive(Debug)]
pub enum IssuedSecret {
    Otp(OtpCode),
    Qr {
        /// Displayable image of `payload`.
        image: String,
        payload: String,
    },
}

#[derive(Debug)]
pub struct IssuedAccessSession {
    pub uuid: AccessSessionUuid,
    pub session_token: String,
    pub ephemeral_key: String,
    pub expires_at: Timestamp,
    pub secret: IssuedSecret,
}

/// Content encoded into the QR image.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QrPayload<'a> {
    pub session_token: &'a str,
    pub doctor_email: &'a str,
    pub issued_at: Timestamp,
}

/// Secret a doctor presents at redemption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedemptionSecret {
    Otp(String),
    Qr(String),
}

impl RedemptionSecret {
    /// Exactly one of `otp` and `qr_payload` must be present and non-empty.
    ///
    /// # Errors
    ///
    /// Returns [`AccessServiceError::MissingCredentials`] when neither or both are given.
    pub fn from_parts(
        otp: Option<String>,
        qr_payload: Option<String>,
    ) -> Result<Self, AccessServiceError> {
        let otp = otp.filter(|value| !value.is_empty());
        let qr_payload = qr_payload.filter(|value| !value.is_empty());

        match (otp, qr_payload) {
            (Some(otp), None) => Ok(Self::Otp(otp)),
            (None, Some(payload)) => Ok(Self::Qr(payload)),
            (None, None) | (Some(_), Some(_)) => Err(AccessServiceError::MissingCredentials),
        }
    }

    #[must_use]
    pub const fn channel(&self) -> AccessChannel {
        match self {
            Self::Otp(_) => AccessChannel::Otp,
            Self::Qr(_) => AccessChannel::Qr,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Redemption {
    pub doctor_email: String,
    pub secret: RedemptionSecret,
}

impl Redemption {
    /// Validates a redemption request, the doctor email before the secret.
    ///
    /// # Errors
    ///
    /// Returns [`AccessServiceError::InvalidDoctorEmail`] for a blank email,
    /// otherwise any error from [`RedemptionSecret::from_parts`].
    pub fn from_parts(
        doctor_email: String,
        otp: Option<String>,
        qr_payload: Option<String>,
    ) -> Result<Self, AccessServiceError> {
        if doctor_email.trim().is_empty() {
            return Err(AccessServiceError::InvalidDoctorEmail);
        }

        Ok(Self {
            secret: RedemptionSecret::from_parts(otp, qr_payload)?,
            doctor_email,
        })
    }
}

/// Credential pair handed to the doctor after a successful redemption.
#[derive(Debug, Clone)]
pub struct SessionCredentials {
    pub session_token: String,
    pub expires_at: Timestamp,
    pub ephemeral_key: String,
}

/// Anonymous disclosure request, as received.
#[derive(Debug, Clone, Default)]
pub struct DisclosureRequest {
    pub session_token: String,
    pub doctor_email: Option<String>,
    pub ephemeral_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Disclosure {
    pub records: Vec<SharedRecord>,
    pub expires_at: Timestamp,
}

#[derive(Debug, Clone)]
pub struct RevokedSession {
    pub session_token: String,
    pub status: AccessStatus,
    pub revoked_at: Timestamp,
}
