//! Access Log Data

use crate::domain::{
    access::records::AccessSessionUuid,
    audit::records::{AccessAction, AccessLogDetails, AccessLogUuid},
    patients::records::PatientIdentity,
};

/// New audit entry.
#[derive(Debug, Clone)]
pub struct NewAccessLog {
    pub uuid: AccessLogUuid,
    pub owner: PatientIdentity,
    pub session_uuid: Option<AccessSessionUuid>,
    pub doctor_email: String,
    pub action: AccessAction,
    pub details: Option<AccessLogDetails>,
}

impl NewAccessLog {
    #[must_use]
    pub fn new(
        owner: PatientIdentity,
        session_uuid: AccessSessionUuid,
        doctor_email: impl Into<String>,
        action: AccessAction,
    ) -> Self {
        Self {
            uuid: AccessLogUuid::new(),
            owner,
            session_uuid: Some(session_uuid),
            doctor_email: doctor_email.into(),
            action,
            details: None,
        }
    }

    #[must_use]
    pub fn with_details(mut self, details: AccessLogDetails) -> Self {
        self.details = Some(details);
        self
    }
}
