//! Audit service.

use async_trait::async_trait;
use mockall::automock;

use crate::{
    database::Db,
    domain::{
        audit::{
            errors::AuditServiceError, records::AccessLogRecord, repository::PgAuditRepository,
        },
        patients::records::PatientIdentity,
    },
};

#[derive(Debug, Clone)]
pub struct PgAuditService {
    db: Db,
    repository: PgAuditRepository,
}

impl PgAuditService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            repository: PgAuditRepository::new(),
        }
    }
}

#[async_trait]
impl AuditService for PgAuditService {
    async fn list_logs(
        &self,
        owner: PatientIdentity,
    ) -> Result<Vec<AccessLogRecord>, AuditServiceError> {
        let mut tx = self.db.begin_tenant_transaction(owner.tenant).await?;

        let logs = self.repository.list_logs(&mut tx, owner).await?;

        tx.commit().await?;

        Ok(logs)
    }
}

#[automock]
#[async_trait]
/// Read access to a patient's audit trail.
pub trait AuditService: Send + Sync {
    /// Most recent entries for the patient, newest first.
    async fn list_logs(
        &self,
        owner: PatientIdentity,
    ) -> Result<Vec<AccessLogRecord>, AuditServiceError>;
}
