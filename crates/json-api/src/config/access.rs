//! Access Session Config

use clap::Args;
use scansehat_app::domain::access::{AccessSettings, AccessSettingsError};

/// Lifetimes for issued access sessions.
#[derive(Debug, Args)]
pub struct AccessConfig {
    /// Minutes a session stays usable after issuance
    #[arg(long, env = "SESSION_TTL_MIN", default_value_t = 30)]
    pub session_ttl_minutes: i64,

    /// Minutes an OTP is advertised as valid
    #[arg(long, env = "OTP_EXPIRY_MIN", default_value_t = 10)]
    pub otp_expiry_minutes: i64,
}

impl AccessConfig {
    /// Validated settings for the access service.
    ///
    /// # Errors
    ///
    /// Returns an error when either lifetime is not positive.
    pub fn settings(&self) -> Result<AccessSettings, AccessSettingsError> {
        AccessSettings::from_minutes(self.session_ttl_minutes, self.otp_expiry_minutes)
    }
}
