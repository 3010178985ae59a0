//! Auth service.

use async_trait::async_trait;
use jiff::Timestamp;
use mockall::automock;
use tracing::warn;
use uuid::Uuid;

use crate::{
    auth::{
        ApiTokenMetadata, ApiTokenVersion, AuthServiceError, IssuedApiToken,
        format_api_token, generate_api_token_secret, models::NewApiToken, parse_api_token,
        repository::PgAuthRepository, token_verifier,
    },
    database::Db,
    domain::{access::secrets::constant_time_eq, patients::records::PatientIdentity},
};

#[derive(Debug, Clone)]
pub struct PgAuthService {
    db: Db,
    repository: PgAuthRepository,
}

impl PgAuthService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            repository: PgAuthRepository::new(),
        }
    }

    /// Issue a new API token for the given patient.
    ///
    /// # Errors
    ///
    /// Returns [`AuthServiceError::UnknownPatient`] when the patient does not
    /// belong to the tenant, or an error if the insert fails.
    pub async fn issue_api_token(
        &self,
        owner: PatientIdentity,
        expires_at: Option<Timestamp>,
    ) -> Result<IssuedApiToken, AuthServiceError> {
        let token_uuid = Uuid::now_v7();
        let version = ApiTokenVersion::V1;
        let secret = generate_api_token_secret();
        let token = format_api_token(token_uuid, version, &secret);

        let new_token = NewApiToken {
            uuid: token_uuid,
            owner,
            version,
            token_hash: token_verifier(&token_uuid, version, &owner, &secret),
            expires_at,
        };

        let mut tx = self.db.begin_tenant_transaction(owner.tenant).await?;

        let metadata = self
            .repository
            .create_api_token(&mut tx, &new_token)
            .await?
            .ok_or(AuthServiceError::UnknownPatient)?;

        tx.commit().await?;

        Ok(IssuedApiToken { token, metadata })
    }

    /// List all tokens for the given patient.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_api_tokens(
        &self,
        owner: PatientIdentity,
    ) -> Result<Vec<ApiTokenMetadata>, AuthServiceError> {
        let mut tx = self.db.begin_transaction().await?;

        let tokens = self.repository.list_api_tokens(&mut tx, owner).await?;

        tx.commit().await?;

        Ok(tokens)
    }

    /// Revoke a token by UUID. Returns `true` if the token was active.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn revoke_api_token(&self, token_uuid: Uuid) -> Result<bool, AuthServiceError> {
        let mut tx = self.db.begin_transaction().await?;

        let revoked = self
            .repository
            .revoke_api_token(&mut tx, token_uuid)
            .await?
            .is_some();

        tx.commit().await?;

        Ok(revoked)
    }

    async fn touch_last_used(&self, token_uuid: Uuid) -> Result<(), sqlx::Error> {
        let mut tx = self.db.begin_transaction().await?;

        self.repository
            .touch_api_token_last_used(&mut tx, token_uuid)
            .await?;

        tx.commit().await
    }
}

#[async_trait]
impl AuthService for PgAuthService {
    async fn authenticate_bearer(
        &self,
        bearer_token: &str,
    ) -> Result<PatientIdentity, AuthServiceError> {
        let parsed_token = parse_api_token(bearer_token).map_err(|_| AuthServiceError::NotFound)?;

        let mut tx = self.db.begin_transaction().await?;

        let token = self
            .repository
            .find_active_api_token(&mut tx, parsed_token.token_uuid, parsed_token.version)
            .await?
            .ok_or(AuthServiceError::NotFound)?;

        tx.commit().await?;

        let expected = token_verifier(
            &parsed_token.token_uuid,
            parsed_token.version,
            &token.owner,
            &parsed_token.secret,
        );

        if token.version != parsed_token.version
            || !constant_time_eq(expected.as_bytes(), token.token_hash.as_bytes())
        {
            return Err(AuthServiceError::NotFound);
        }

        // Auth success does not depend on this write.
        if let Err(error) = self.touch_last_used(parsed_token.token_uuid).await {
            warn!(token_uuid = %parsed_token.token_uuid, "failed to touch api token: {error}");
        }

        Ok(token.owner)
    }
}

#[automock]
#[async_trait]
/// Resolves bearer tokens to the patient they were issued to.
pub trait AuthService: Send + Sync {
    async fn authenticate_bearer(
        &self,
        bearer_token: &str,
    ) -> Result<PatientIdentity, AuthServiceError>;
}
