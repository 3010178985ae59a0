//! Access Log Records

use std::{fmt, str::FromStr};

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    domain::{
        access::records::{AccessChannel, AccessSessionUuid},
        patients::records::PatientUuid,
        tenants::records::TenantUuid,
    },
    uuids::TypedUuid,
};

/// Access Log UUID
pub type AccessLogUuid = TypedUuid<AccessLogRecord>;

/// Lifecycle event recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessAction {
    OtpIssued,
    QrIssued,
    OtpRedeemed,
    QrRedeemed,
    RecordsViewed,
    SessionExpired,
    SessionRevoked,
}

impl AccessAction {
    pub const ALL: [Self; 7] = [
        Self::OtpIssued,
        Self::QrIssued,
        Self::OtpRedeemed,
        Self::QrRedeemed,
        Self::RecordsViewed,
        Self::SessionExpired,
        Self::SessionRevoked,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OtpIssued => "OTP_ISSUED",
            Self::QrIssued => "QR_ISSUED",
            Self::OtpRedeemed => "OTP_REDEEMED",
            Self::QrRedeemed => "QR_REDEEMED",
            Self::RecordsViewed => "RECORDS_VIEWED",
            Self::SessionExpired => "SESSION_EXPIRED",
            Self::SessionRevoked => "SESSION_REVOKED",
        }
    }

    #[must_use]
    pub const fn issued(channel: AccessChannel) -> Self {
        match channel {
            AccessChannel::Otp => Self::OtpIssued,
            AccessChannel::Qr => Self::QrIssued,
        }
    }

    #[must_use]
    pub const fn redeemed(channel: AccessChannel) -> Self {
        match channel {
            AccessChannel::Otp => Self::OtpRedeemed,
            AccessChannel::Qr => Self::QrRedeemed,
        }
    }
}

impl fmt::Display for AccessAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown access action: {0}")]
pub struct UnknownAccessAction(String);

impl FromStr for AccessAction {
    type Err = UnknownAccessAction;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == value)
            .ok_or_else(|| UnknownAccessAction(value.to_string()))
    }
}

/// Structured payload for events that carry one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AccessLogDetails {
    RecordsViewed { count: u64 },
}

/// Access Log Record
#[derive(Debug, Clone)]
pub struct AccessLogRecord {
    pub uuid: AccessLogUuid,
    pub tenant_uuid: TenantUuid,
    pub patient_uuid: PatientUuid,
    pub session_uuid: Option<AccessSessionUuid>,
    pub doctor_email: String,
    pub action: AccessAction,
    pub details: Option<AccessLogDetails>,
    pub created_at: Timestamp,
}
