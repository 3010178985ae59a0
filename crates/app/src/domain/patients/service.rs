//! Patients service.

use async_trait::async_trait;
use mockall::automock;

use crate::{
    database::Db,
    domain::{
        patients::{
            data::NewPatient,
            errors::PatientsServiceError,
            records::{PatientRecord, PatientUuid},
            repository::PgPatientsRepository,
        },
        tenants::records::TenantUuid,
    },
};

#[derive(Debug, Clone)]
pub struct PgPatientsService {
    db: Db,
    repository: PgPatientsRepository,
}

impl PgPatientsService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            repository: PgPatientsRepository::new(),
        }
    }
}

#[async_trait]
impl PatientsService for PgPatientsService {
    async fn create_patient(
        &self,
        tenant: TenantUuid,
        patient: NewPatient,
    ) -> Result<PatientRecord, PatientsServiceError> {
        if patient.email.trim().is_empty() {
            return Err(PatientsServiceError::InvalidData);
        }

        let mut tx = self.db.begin_tenant_transaction(tenant).await?;

        let created = self.repository.create_patient(&mut tx, patient).await?;

        tx.commit().await?;

        Ok(created)
    }

    async fn get_patient(
        &self,
        tenant: TenantUuid,
        patient: PatientUuid,
    ) -> Result<PatientRecord, PatientsServiceError> {
        let mut tx = self.db.begin_tenant_transaction(tenant).await?;

        let patient = self.repository.get_patient(&mut tx, patient).await?;

        tx.commit().await?;

        Ok(patient)
    }
}

#[automock]
#[async_trait]
/// Patient persistence operations.
pub trait PatientsService: Send + Sync {
    /// Creates a new patient within the given tenant.
    async fn create_patient(
        &self,
        tenant: TenantUuid,
        patient: NewPatient,
    ) -> Result<PatientRecord, PatientsServiceError>;

    /// Retrieve a single patient.
    async fn get_patient(
        &self,
        tenant: TenantUuid,
        patient: PatientUuid,
    ) -> Result<PatientRecord, PatientsServiceError>;
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::test::TestContext;

    use super::*;

    fn new_patient(email: &str) -> NewPatient {
        NewPatient {
            uuid: PatientUuid::new(),
            email: email.to_string(),
            name: "Siti Rahma".to_string(),
        }
    }

    #[tokio::test]
    async fn create_patient_binds_patient_to_tenant() -> TestResult {
        let ctx = TestContext::new().await;
        let patient = new_patient("siti@example.com");
        let uuid = patient.uuid;

        let created = ctx
            .patients
            .create_patient(ctx.tenant_uuid, patient)
            .await?;

        assert_eq!(created.uuid, uuid);
        assert_eq!(created.tenant_uuid, ctx.tenant_uuid);
        assert_eq!(created.email, "siti@example.com");
        assert!(created.deleted_at.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn create_patient_duplicate_email_returns_already_exists() -> TestResult {
        let ctx = TestContext::new().await;

        ctx.patients
            .create_patient(ctx.tenant_uuid, new_patient("dup@example.com"))
            .await?;

        let result = ctx
            .patients
            .create_patient(ctx.tenant_uuid, new_patient("DUP@example.com"))
            .await;

        assert!(
            matches!(result, Err(PatientsServiceError::AlreadyExists)),
            "expected AlreadyExists, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn create_patient_blank_email_is_rejected() {
        let ctx = TestContext::new().await;

        let result = ctx
            .patients
            .create_patient(ctx.tenant_uuid, new_patient("  "))
            .await;

        assert!(
            matches!(result, Err(PatientsServiceError::InvalidData)),
            "expected InvalidData, got {result:?}"
        );
    }

    #[tokio::test]
    async fn create_patient_unknown_tenant_is_rejected() {
        let ctx = TestContext::new().await;

        let result = ctx
            .patients
            .create_patient(TenantUuid::new(), new_patient("ghost@example.com"))
            .await;

        assert!(
            matches!(result, Err(PatientsServiceError::InvalidTenant)),
            "expected InvalidTenant, got {result:?}"
        );
    }

    #[tokio::test]
    async fn patient_not_visible_to_other_tenant() -> TestResult {
        let ctx = TestContext::new().await;
        let tenant_b = ctx.create_tenant("Tenant B").await;

        let result = ctx
            .patients
            .get_patient(tenant_b, ctx.patient.patient)
            .await;

        assert!(
            matches!(result, Err(PatientsServiceError::NotFound)),
            "expected NotFound for cross-tenant access, got {result:?}"
        );

        Ok(())
    }
}
