//! Access service errors.

use thiserror::Error;

use crate::domain::access::{qr::QrRenderError, secrets::SecretError};

#[derive(Debug, Error)]
pub enum AccessServiceError {
    #[error("doctorEmail is required")]
    InvalidDoctorEmail,

    #[error("Provide either otp or qrPayload")]
    MissingCredentials,

    #[error("doctorEmail and ephemeralKey are required")]
    MissingDisclosureParameters,

    #[error("No OTP session found")]
    OtpSessionNotFound,

    #[error("Invalid OTP")]
    InvalidOtp,

    #[error("QR session not found")]
    QrSessionNotFound,

    #[error("Session not found")]
    SessionNotFound,

    #[error("Invalid ephemeral key")]
    InvalidEphemeralKey,

    #[error("Session expired")]
    Expired,

    #[error("Session revoked")]
    Revoked,

    #[error("Session pending redemption")]
    PendingRedemption,

    #[error("Session is no longer pending")]
    NotPending,

    #[error("storage error")]
    Sql(#[from] sqlx::Error),

    #[error("secret generation error")]
    Secret(#[from] SecretError),

    #[error("qr rendering error")]
    Qr(#[from] QrRenderError),

    #[error("session deadline is out of range")]
    Timestamp(#[source] jiff::Error),

    #[error("qr payload encoding error")]
    Payload(#[from] serde_json::Error),
}
