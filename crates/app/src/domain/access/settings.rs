//! Access lifetimes.

use jiff::SignedDuration;
use thiserror::Error;

/// Default `SESSION_TTL_MIN`.
pub const DEFAULT_SESSION_TTL_MINUTES: i64 = 30;

/// Default `OTP_EXPIRY_MIN`.
pub const DEFAULT_OTP_EXPIRY_MINUTES: i64 = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccessSettingsError {
    #[error("session ttl must be positive, got {0} minutes")]
    SessionTtl(i64),

    #[error("otp expiry must be positive, got {0} minutes")]
    OtpExpiry(i64),
}

/// Lifetimes applied at issuance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessSettings {
    session_ttl: SignedDuration,
    otp_lifetime: SignedDuration,
}

impl AccessSettings {
    /// # Errors
    ///
    /// Returns an error when either lifetime is zero or negative.
    pub fn from_minutes(
        session_ttl_minutes: i64,
        otp_expiry_minutes: i64,
    ) -> Result<Self, AccessSettingsError> {
        if session_ttl_minutes <= 0 {
            return Err(AccessSettingsError::SessionTtl(session_ttl_minutes));
        }

        if otp_expiry_minutes <= 0 {
            return Err(AccessSettingsError::OtpExpiry(otp_expiry_minutes));
        }

        Ok(Self {
            session_ttl: SignedDuration::from_mins(session_ttl_minutes),
            otp_lifetime: SignedDuration::from_mins(otp_expiry_minutes),
        })
    }

    #[must_use]
    pub const fn session_ttl(&self) -> SignedDuration {
        self.session_ttl
    }

    #[must_use]
    pub const fn otp_lifetime(&self) -> SignedDuration {
        self.otp_lifetime
    }
}

impl Default for AccessSettings {
    fn default() -> Self {
        Self {
            session_ttl: SignedDuration::from_mins(DEFAULT_SESSION_TTL_MINUTES),
            otp_lifetime: SignedDuration::from_mins(DEFAULT_OTP_EXPIRY_MINUTES),
        }
    }
}
