//! Tenants service.

use async_trait::async_trait;
use mockall::automock;

use crate::{
    database::Db,
    domain::tenants::{
        data::NewTenant, errors::TenantsServiceError, records::TenantRecord,
        repository::PgTenantsRepository,
    },
};

#[derive(Debug, Clone)]
pub struct PgTenantsService {
    db: Db,
    repository: PgTenantsRepository,
}

impl PgTenantsService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            repository: PgTenantsRepository::new(),
        }
    }
}

#[async_trait]
impl TenantsService for PgTenantsService {
    async fn create_tenant(&self, tenant: NewTenant) -> Result<TenantRecord, TenantsServiceError> {
        if tenant.name.trim().is_empty() {
            return Err(TenantsServiceError::MissingName);
        }

        let mut tx = self.db.begin_transaction().await?;

        let created = self.repository.create_tenant(&mut tx, tenant).await?;

        tx.commit().await?;

        Ok(created)
    }

    async fn list_tenants(&self) -> Result<Vec<TenantRecord>, TenantsServiceError> {
        let mut tx = self.db.begin_transaction().await?;

        let tenants = self.repository.list_tenants(&mut tx).await?;

        tx.commit().await?;

        Ok(tenants)
    }
}

#[automock]
#[async_trait]
/// Tenant administration. Tenants are not row-level scoped.
pub trait TenantsService: Send + Sync {
    /// Creates a new tenant.
    async fn create_tenant(&self, tenant: NewTenant) -> Result<TenantRecord, TenantsServiceError>;

    /// Active tenants, ordered by name.
    async fn list_tenants(&self) -> Result<Vec<TenantRecord>, TenantsServiceError>;
}
