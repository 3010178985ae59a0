//! Tenant Data

use crate::domain::tenants::records::TenantUuid;

#[derive(Debug, Clone, PartialEq)]
pub struct NewTenant {
    pub uuid: TenantUuid,

    /// Trimmed before insert; must not be blank.
    pub name: String,
}
