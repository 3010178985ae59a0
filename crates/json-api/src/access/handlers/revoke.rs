//! Revoke Access Session Handler

use std::sync::Arc;

use salvo::{
    oapi::{ToSchema, extract::PathParam},
    prelude::*,
};
use serde::{Deserialize, Serialize};

use scansehat_app::domain::{access::data::RevokedSession, audit::records::AccessAction};

use crate::{
    access::errors::into_status_error, extensions::*, observability::record_access_event,
    state::State,
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RevokedSessionResponse {
    pub session_token: String,
    pub status: String,
    pub revoked_at: String,
}

impl From<RevokedSession> for RevokedSessionResponse {
    fn from(revoked: RevokedSession) -> Self {
        Self {
            session_token: revoked.session_token,
            status: revoked.status.to_string(),
            revoked_at: revoked.revoked_at.to_string(),
        }
    }
}

/// Revoke Access Session Handler
///
/// Cancels one of the caller's sessions before it is redeemed.
#[endpoint(
    tags("access"),
    summary = "Revoke Access Session",
    security(("bearer_auth" = [])),
    responses(
        (status_code = StatusCode::OK, description = "Session revoked"),
        (status_code = StatusCode::NOT_FOUND, description = "Session not found"),
        (status_code = StatusCode::CONFLICT, description = "Session is no longer pending"),
        (status_code = StatusCode::INTERNAL_SERVER_ERROR, description = "Internal Server Error"),
    ),
)]
#[tracing::instrument(
    name = "access.revoke",
    skip(token, depot),
    fields(tenant_uuid = tracing::field::Empty, patient_uuid = tracing::field::Empty),
    err
)]
pub(crate) async fn handler(
    token: PathParam<String>,
    depot: &mut Depot,
) -> Result<Json<RevokedSessionResponse>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let owner = depot.patient_or_401()?;
    let token = token.into_inner();

    let span = tracing::Span::current();

    span.record("tenant_uuid", tracing::field::display(owner.tenant));
    span.record("patient_uuid", tracing::field::display(owner.patient));

    let revoked = state
        .app
        .access
        .revoke_session(owner, &token)
        .await
        .map_err(into_status_error)?;

    record_access_event(AccessAction::SessionRevoked);

    tracing::info!("revoked access session");

    Ok(Json(revoked.into()))
}

#[cfg(test)]
mod tests {
    use jiff::Timestamp;
    use salvo::test::{ResponseExt, TestClient};
    use testresult::TestResult;

    use scansehat_app::domain::access::{
        AccessServiceError, MockAccessService, records::AccessStatus,
    };

    use crate::test_helpers::{TEST_PATIENT, patient_service, state_with_access};

    use super::*;

    const TOKEN: &str = "fedcba9876543210fedcba9876543210fedcba9876543210fedcba9876543210";

    fn make_service(access: MockAccessService) -> Service {
        patient_service(
            state_with_access(access),
            Router::with_path("access/sessions/{token}/revoke").post(handler),
        )
    }

    fn url() -> String {
        format!("http://example.com/access/sessions/{TOKEN}/revoke")
    }

    #[tokio::test]
    async fn pending_session_is_revoked() -> TestResult {
        let mut access = MockAccessService::new();

        access
            .expect_revoke_session()
            .once()
            .withf(|owner, token| *owner == TEST_PATIENT && token == TOKEN)
            .return_once(|_, token| {
                Ok(RevokedSession {
                    session_token: token.to_string(),
                    status: AccessStatus::Revoked,
                    revoked_at: Timestamp::UNIX_EPOCH,
                })
            });

        let mut res = TestClient::post(url()).send(&make_service(access)).await;

        assert_eq!(res.status_code, Some(StatusCode::OK));

        let body: RevokedSessionResponse = res.take_json().await?;

        assert_eq!(body.session_token, TOKEN);
        assert_eq!(body.status, "revoked");
        assert_eq!(body.revoked_at, Timestamp::UNIX_EPOCH.to_string());

        Ok(())
    }

    #[tokio::test]
    async fn unknown_session_returns_404() -> TestResult {
        let mut access = MockAccessService::new();

        access
            .expect_revoke_session()
            .once()
            .return_once(|_, _| Err(AccessServiceError::SessionNotFound));

        let res = TestClient::post(url()).send(&make_service(access)).await;

        assert_eq!(res.status_code, Some(StatusCode::NOT_FOUND));

        Ok(())
    }

    #[tokio::test]
    async fn redeemed_session_returns_409() -> TestResult {
        let mut access = MockAccessService::new();

        access
            .expect_revoke_session()
            .once()
            .return_once(|_, _| Err(AccessServiceError::NotPending));

        let mut res = TestClient::post(url()).send(&make_service(access)).await;

        assert_eq!(res.status_code, Some(StatusCode::CONFLICT));
        assert!(
            res.take_string().await?.contains("Session is no longer pending"),
            "expected conflict message"
        );

        Ok(())
    }
}
