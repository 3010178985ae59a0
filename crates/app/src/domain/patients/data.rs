//! Patient Data

use crate::domain::patients::records::PatientUuid;

/// New Patient Data
#[derive(Debug, Clone, PartialEq)]
pub struct NewPatient {
    pub uuid: PatientUuid,
    pub email: String,
    pub name: String,
}
