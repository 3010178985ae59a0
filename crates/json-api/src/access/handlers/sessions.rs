//! Access Session Index Handler

use std::{string::ToString, sync::Arc};

use salvo::{oapi::ToSchema, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use scansehat_app::domain::access::records::AccessSessionRecord;

use crate::{access::errors::into_status_error, extensions::*, state::State};

/// A session as shown to its owner. Secrets, digests, and the ephemeral key
/// are left out.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AccessSessionResponse {
    pub id: Uuid,
    pub doctor_email: String,
    pub channel: String,
    pub status: String,
    pub session_token: String,
    pub expires_at: String,
    pub redeemed_at: Option<String>,
    pub revoked_at: Option<String>,
    pub created_at: String,
}

impl From<AccessSessionRecord> for AccessSessionResponse {
    fn from(session: AccessSessionRecord) -> Self {
        Self {
            id: session.uuid.into_uuid(),
            channel: session.channel().to_string(),
            status: session.status.to_string(),
            doctor_email: session.doctor_email,
            session_token: session.session_token,
            expires_at: session.expires_at.to_string(),
            redeemed_at: session.redeemed_at.as_ref().map(ToString::to_string),
            revoked_at: session.revoked_at.as_ref().map(ToString::to_string),
            created_at: session.created_at.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct AccessSessionsResponse {
    pub sessions: Vec<AccessSessionResponse>,
}

/// Access Session Index Handler
///
/// Lists the caller's sessions, newest first.
#[endpoint(
    tags("access"),
    summary = "List Access Sessions",
    security(("bearer_auth" = []))
)]
pub(crate) async fn handler(depot: &mut Depot) -> Result<Json<AccessSessionsResponse>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let owner = depot.patient_or_401()?;

    let sessions = state
        .app
        .access
        .list_sessions(owner)
        .await
        .map_err(into_status_error)?;

    Ok(Json(AccessSessionsResponse {
        sessions: sessions.into_iter().map(Into::into).collect(),
    }))
}

#[cfg(test)]
mod tests {
    use jiff::Timestamp;
    use salvo::test::{ResponseExt, TestClient};
    use testresult::TestResult;

    use scansehat_app::domain::access::{
        AccessServiceError, MockAccessService,
        records::{AccessSessionUuid, AccessStatus, SecretDigest},
    };

    use crate::test_helpers::{TEST_PATIENT, patient_service, state_with_access};

    use super::*;

    fn make_service(access: MockAccessService) -> Service {
        patient_service(
            state_with_access(access),
            Router::with_path("access/sessions").get(handler),
        )
    }

    fn make_session(status: AccessStatus, digest: SecretDigest) -> AccessSessionRecord {
        AccessSessionRecord {
            uuid: AccessSessionUuid::new(),
            tenant_uuid: TEST_PATIENT.tenant,
            patient_uuid: TEST_PATIENT.patient,
            doctor_email: "doctor@x.com".to_string(),
            digest,
            session_token: "e".repeat(64),
            ephemeral_key: "secret-ephemeral-key".to_string(),
            status,
            expires_at: Timestamp::UNIX_EPOCH,
            redeemed_at: None,
            revoked_at: None,
            created_at: Timestamp::UNIX_EPOCH,
            updated_at: Timestamp::UNIX_EPOCH,
        }
    }

    #[tokio::test]
    async fn lists_sessions_without_secrets() -> TestResult {
        let mut access = MockAccessService::new();

        access
            .expect_list_sessions()
            .once()
            .withf(|owner| *owner == TEST_PATIENT)
            .return_once(|_| {
                Ok(vec![
                    make_session(AccessStatus::Pending, SecretDigest::Qr("qr-digest".to_string())),
                    make_session(AccessStatus::Redeemed, SecretDigest::Otp("otp-digest".to_string())),
                ])
            });

        let mut res = TestClient::get("http://example.com/access/sessions")
            .send(&make_service(access))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::OK));

        let raw = res.take_string().await?;

        assert!(!raw.contains("secret-ephemeral-key"), "ephemeral key leaked");
        assert!(!raw.contains("digest"), "secret digest leaked");

        let body: AccessSessionsResponse = serde_json::from_str(&raw)?;
        let statuses: Vec<&str> = body.sessions.iter().map(|s| s.status.as_str()).collect();
        let channels: Vec<&str> = body.sessions.iter().map(|s| s.channel.as_str()).collect();

        assert_eq!(statuses, ["pending", "redeemed"]);
        assert_eq!(channels, ["qr", "otp"]);

        Ok(())
    }

    #[tokio::test]
    async fn storage_failure_returns_500() -> TestResult {
        let mut access = MockAccessService::new();

        access
            .expect_list_sessions()
            .once()
            .return_once(|_| Err(AccessServiceError::Sql(sqlx::Error::PoolTimedOut)));

        let res = TestClient::get("http://example.com/access/sessions")
            .send(&make_service(access))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::INTERNAL_SERVER_ERROR));

        Ok(())
    }
}
