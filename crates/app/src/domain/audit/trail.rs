//! Best-effort audit writer.

use tracing::{debug, error};

use crate::{
    database::Db,
    domain::audit::{data::NewAccessLog, repository::PgAuditRepository},
};

/// Appends audit entries after the operation they describe has committed.
///
/// Failures are reported through `tracing` and never reach the caller.
#[derive(Debug, Clone)]
pub(crate) struct AuditTrail {
    db: Db,
    repository: PgAuditRepository,
}

impl AuditTrail {
    #[must_use]
    pub(crate) fn new(db: Db) -> Self {
        Self {
            db,
            repository: PgAuditRepository::new(),
        }
    }

    pub(crate) async fn record(&self, entry: NewAccessLog) {
        let action = entry.action;
        let tenant_uuid = entry.owner.tenant;
        let patient_uuid = entry.owner.patient;

        match self.append(entry).await {
            Ok(()) => debug!(%action, %tenant_uuid, %patient_uuid, "audit entry appended"),
            Err(error) => error!(
                %action,
                %tenant_uuid,
                %patient_uuid,
                error = %error,
                "failed to append audit entry"
            ),
        }
    }

    async fn append(&self, entry: NewAccessLog) -> Result<(), sqlx::Error> {
        let mut tx = self.db.begin_tenant_transaction(entry.owner.tenant).await?;

        self.repository.insert_log(&mut tx, entry).await?;

        tx.commit().await
    }
}
