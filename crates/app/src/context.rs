//! App Context

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::{
    auth::{AuthService, PgAuthService},
    database::{self, Db},
    domain::{
        access::{AccessService, AccessSettings, PgAccessService},
        audit::{AuditService, PgAuditService},
    },
};

#[derive(Debug, Error)]
pub enum AppInitError {
    #[error("failed to connect to database")]
    Database(#[source] sqlx::Error),

    #[error("database role bypasses row-level security; connect as the app role")]
    RlsBypassingRole,
}

#[derive(Clone)]
pub struct AppContext {
    pub access: Arc<dyn AccessService>,
    pub audit: Arc<dyn AuditService>,
    pub auth: Arc<dyn AuthService>,
}

impl AppContext {
    /// Build application context from a database URL.
    ///
    /// # Errors
    ///
    /// Returns an error when connecting fails or when the connected role
    /// would bypass row-level security.
    pub async fn from_database_url(
        url: &str,
        settings: AccessSettings,
    ) -> Result<Self, AppInitError> {
        let pool = database::connect(url)
            .await
            .map_err(AppInitError::Database)?;

        if database::role_bypasses_rls(&pool)
            .await
            .map_err(AppInitError::Database)?
        {
            return Err(AppInitError::RlsBypassingRole);
        }

        info!(
            session_ttl = ?settings.session_ttl(),
            otp_lifetime = ?settings.otp_lifetime(),
            "access settings loaded"
        );

        Ok(Self::from_db(&Db::new(pool), settings))
    }

    #[must_use]
    pub fn from_db(db: &Db, settings: AccessSettings) -> Self {
        Self {
            access: Arc::new(PgAccessService::new(db.clone(), settings)),
            audit: Arc::new(PgAuditService::new(db.clone())),
            auth: Arc::new(PgAuthService::new(db.clone())),
        }
    }
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext").finish_non_exhaustive()
    }
}
