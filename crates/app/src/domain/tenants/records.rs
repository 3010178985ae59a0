//! Tenant Records

use jiff::Timestamp;

use crate::uuids::TypedUuid;

/// Tenant UUID
pub type TenantUuid = TypedUuid<TenantRecord>;

/// A clinic or organisation. Every patient, session, and log row carries
/// its tenant, and row-level security scopes reads to it.
#[derive(Debug, Clone)]
pub struct TenantRecord {
    pub uuid: TenantUuid,

    /// Display name; not unique.
    pub name: String,

    pub created_at: Timestamp,

    pub updated_at: Timestamp,

    /// Set when the tenant is retired; retired tenants are not listed.
    pub deleted_at: Option<Timestamp>,
}
