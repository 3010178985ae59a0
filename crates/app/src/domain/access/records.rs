//! Access Session Records

use std::{fmt, str::FromStr};

use jiff::Timestamp;
use thiserror::Error;

use crate::{
    domain::{
        patients::records::{PatientIdentity, PatientUuid},
        tenants::records::TenantUuid,
    },
    uuids::TypedUuid,
};

/// Access Session UUID
pub type AccessSessionUuid = TypedUuid<AccessSessionRecord>;

/// How the one-time secret reaches the doctor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessChannel {
    Otp,
    Qr,
}

impl AccessChannel {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Otp => "otp",
            Self::Qr => "qr",
        }
    }
}

impl fmt::Display for AccessChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("channel must be otp or qr")]
pub struct UnknownAccessChannel;

impl FromStr for AccessChannel {
    type Err = UnknownAccessChannel;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "otp" => Ok(Self::Otp),
            "qr" => Ok(Self::Qr),
            _ => Err(UnknownAccessChannel),
        }
    }
}

/// Session lifecycle. `Expired` and `Revoked` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessStatus {
    Pending,
    Redeemed,
    Expired,
    Revoked,
}

impl AccessStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Redeemed => "redeemed",
            Self::Expired => "expired",
            Self::Revoked => "revoked",
        }
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Expired | Self::Revoked)
    }
}

impl fmt::Display for AccessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown access status: {0}")]
pub struct UnknownAccessStatus(String);

impl FromStr for AccessStatus {
    type Err = UnknownAccessStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(Self::Pending),
            "redeemed" => Ok(Self::Redeemed),
            "expired" => Ok(Self::Expired),
            "revoked" => Ok(Self::Revoked),
            other => Err(UnknownAccessStatus(other.to_string())),
        }
    }
}

/// Stored digest of the one-time secret. The variant is the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretDigest {
    Otp(String),
    Qr(String),
}

impl SecretDigest {
    #[must_use]
    pub const fn channel(&self) -> AccessChannel {
        match self {
            Self::Otp(_) => AccessChannel::Otp,
            Self::Qr(_) => AccessChannel::Qr,
        }
    }

    #[must_use]
    pub fn otp_hash(&self) -> Option<&str> {
        match self {
            Self::Otp(hash) => Some(hash),
            Self::Qr(_) => None,
        }
    }

    #[must_use]
    pub fn qr_hash(&self) -> Option<&str> {
        match self {
            Self::Qr(hash) => Some(hash),
            Self::Otp(_) => None,
        }
    }
}

/// Access Session Record
#[derive(Clone)]
pub struct AccessSessionRecord {
    pub uuid: AccessSessionUuid,
    pub tenant_uuid: TenantUuid,
    pub patient_uuid: PatientUuid,
    pub doctor_email: String,
    pub digest: SecretDigest,
    pub session_token: String,
    pub ephemeral_key: String,
    pub status: AccessStatus,
    pub expires_at: Timestamp,
    pub redeemed_at: Option<Timestamp>,
    pub revoked_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl AccessSessionRecord {
    #[must_use]
    pub fn owner(&self) -> PatientIdentity {
        PatientIdentity {
            tenant: self.tenant_uuid,
            patient: self.patient_uuid,
        }
    }

    #[must_use]
    pub const fn channel(&self) -> AccessChannel {
        self.digest.channel()
    }

    /// Whether the deadline has been reached at `now`.
    #[must_use]
    pub fn is_past_deadline(&self, now: Timestamp) -> bool {
        self.expires_at <= now
    }
}

impl fmt::Debug for AccessSessionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessSessionRecord")
            .field("uuid", &self.uuid)
            .field("tenant_uuid", &self.tenant_uuid)
            .field("patient_uuid", &self.patient_uuid)
            .field("doctor_email", &self.doctor_email)
            .field("channel", &self.channel())
            .field("status", &self.status)
            .field("expires_at", &self.expires_at)
            .field("redeemed_at", &self.redeemed_at)
            .field("revoked_at", &self.revoked_at)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}
