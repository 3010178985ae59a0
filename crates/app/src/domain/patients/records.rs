//! Patient Records

use jiff::Timestamp;

use crate::{domain::tenants::records::TenantUuid, uuids::TypedUuid};

/// Patient UUID
pub type PatientUuid = TypedUuid<PatientRecord>;

/// Patient Record
#[derive(Debug, Clone)]
pub struct PatientRecord {
    pub uuid: PatientUuid,
    pub tenant_uuid: TenantUuid,
    pub email: String,
    pub name: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub deleted_at: Option<Timestamp>,
}

impl PatientRecord {
    /// The tenant/patient pair that owns data created by this patient.
    #[must_use]
    pub fn identity(&self) -> PatientIdentity {
        PatientIdentity {
            tenant: self.tenant_uuid,
            patient: self.uuid,
        }
    }
}

/// Authenticated patient, as resolved from a bearer token.
///
/// Every patient-scoped query takes both halves; a patient UUID is never
/// trusted without the tenant it was resolved under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PatientIdentity {
    pub tenant: TenantUuid,
    pub patient: PatientUuid,
}
