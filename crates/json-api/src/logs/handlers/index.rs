//! Access Log Index Handler

use std::sync::Arc;

use salvo::{oapi::ToSchema, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use scansehat_app::domain::audit::records::{AccessLogDetails, AccessLogRecord};

use crate::{extensions::*, state::State};

/// Structured payload of a log entry.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AccessLogDetailsResponse {
    /// Number of records disclosed
    pub count: u64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AccessLogResponse {
    pub id: Uuid,
    pub session_id: Option<Uuid>,
    pub doctor_email: String,
    /// e.g. `OTP_ISSUED`, `RECORDS_VIEWED`, `SESSION_EXPIRED`
    pub action: String,
    pub details: Option<AccessLogDetailsResponse>,
    pub created_at: String,
}

impl From<AccessLogRecord> for AccessLogResponse {
    fn from(log: AccessLogRecord) -> Self {
        Self {
            id: log.uuid.into_uuid(),
            session_id: log.session_uuid.map(|uuid| uuid.into_uuid()),
            doctor_email: log.doctor_email,
            action: log.action.to_string(),
            details: log.details.map(|details| match details {
                AccessLogDetails::RecordsViewed { count } => AccessLogDetailsResponse { count },
            }),
            created_at: log.created_at.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct AccessLogsResponse {
    pub logs: Vec<AccessLogResponse>,
}

/// Access Log Index Handler
///
/// Returns the caller's most recent audit entries, newest first.
#[endpoint(
    tags("logs"),
    summary = "List Access Logs",
    security(("bearer_auth" = []))
)]
pub(crate) async fn handler(depot: &mut Depot) -> Result<Json<AccessLogsResponse>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let owner = depot.patient_or_401()?;

    let logs = state
        .app
        .audit
        .list_logs(owner)
        .await
        .or_500("failed to fetch access logs")?;

    Ok(Json(AccessLogsResponse {
        logs: logs.into_iter().map(Into::into).collect(),
    }))
}

#[cfg(test)]
mod tests {
    use jiff::Timestamp;
    use salvo::test::{ResponseExt, TestClient};
    use testresult::TestResult;

    use scansehat_app::domain::{
        access::records::AccessSessionUuid,
        audit::{
            AuditServiceError, MockAuditService,
            records::{AccessAction, AccessLogUuid},
        },
    };

    use crate::test_helpers::{TEST_PATIENT, patient_service, state_with_audit};

    use super::*;

    fn make_service(audit: MockAuditService) -> Service {
        patient_service(state_with_audit(audit), Router::with_path("logs").get(handler))
    }

    fn make_log(action: AccessAction, details: Option<AccessLogDetails>) -> AccessLogRecord {
        AccessLogRecord {
            uuid: AccessLogUuid::new(),
            tenant_uuid: TEST_PATIENT.tenant,
            patient_uuid: TEST_PATIENT.patient,
            session_uuid: Some(AccessSessionUuid::new()),
            doctor_email: "doctor@x.com".to_string(),
            action,
            details,
            created_at: Timestamp::UNIX_EPOCH,
        }
    }

    #[tokio::test]
    async fn lists_logs_for_the_caller() -> TestResult {
        let mut audit = MockAuditService::new();

        audit
            .expect_list_logs()
            .once()
            .withf(|owner| *owner == TEST_PATIENT)
            .return_once(|_| {
                Ok(vec![
                    make_log(
                        AccessAction::RecordsViewed,
                        Some(AccessLogDetails::RecordsViewed { count: 3 }),
                    ),
                    make_log(AccessAction::OtpRedeemed, None),
                    make_log(AccessAction::OtpIssued, None),
                ])
            });

        let mut res = TestClient::get("http://example.com/logs")
            .send(&make_service(audit))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::OK));

        let body: AccessLogsResponse = res.take_json().await?;
        let actions: Vec<&str> = body.logs.iter().map(|log| log.action.as_str()).collect();

        assert_eq!(actions, ["RECORDS_VIEWED", "OTP_REDEEMED", "OTP_ISSUED"]);
        assert_eq!(
            body.logs.first().and_then(|log| log.details.as_ref()).map(|d| d.count),
            Some(3)
        );
        assert!(
            body.logs.iter().all(|log| log.doctor_email == "doctor@x.com"),
            "doctor email carried through"
        );

        Ok(())
    }

    #[tokio::test]
    async fn storage_failure_returns_500() -> TestResult {
        let mut audit = MockAuditService::new();

        audit
            .expect_list_logs()
            .once()
            .return_once(|_| Err(AuditServiceError::Sql(sqlx::Error::PoolTimedOut)));

        let res = TestClient::get("http://example.com/logs")
            .send(&make_service(audit))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::INTERNAL_SERVER_ERROR));

        Ok(())
    }
}
