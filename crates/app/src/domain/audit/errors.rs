//! Audit service errors.

use sqlx::Error;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuditServiceError {
    #[error("storage error")]
    Sql(#[source] Error),
}

impl From<Error> for AuditServiceError {
    fn from(error: Error) -> Self {
        Self::Sql(error)
    }
}
