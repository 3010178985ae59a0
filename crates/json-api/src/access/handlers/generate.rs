//! Generate Access Session Handler

use std::sync::Arc;

use salvo::{
    oapi::{ToSchema, extract::JsonBody},
    prelude::*,
};
use serde::{Deserialize, Serialize};

use scansehat_app::domain::{
    access::{
        data::{IssuedAccessSession, IssuedSecret, NewAccessSession},
        records::AccessChannel,
    },
    audit::records::AccessAction,
};

use crate::{
    access::errors::into_status_error, extensions::*, observability::record_access_event,
    state::State,
};

/// Generate Access Request
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateAccessRequest {
    /// Email of the doctor who may redeem the session
    #[serde(default)]
    pub doctor_email: String,

    /// `otp` (default) or `qr`
    #[serde(default)]
    pub channel: Option<String>,
}

/// Generate Access Response
///
/// Exactly one of `otp` or `qr` is present. `qrPayload` accompanies `qr`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateAccessResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub otp: Option<String>,

    /// QR image as a data URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qr: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qr_payload: Option<String>,

    pub session_token: String,
    pub expires_at: String,
    pub ephemeral_key: String,
}

impl From<IssuedAccessSession> for GenerateAccessResponse {
    fn from(issued: IssuedAccessSession) -> Self {
        let (otp, qr, qr_payload) = match issued.secret {
            IssuedSecret::Otp(code) => (Some(code.into_string()), None, None),
            IssuedSecret::Qr { image, payload } => (None, Some(image), Some(payload)),
        };

        Self {
            otp,
            qr,
            qr_payload,
            session_token: issued.session_token,
            expires_at: issued.expires_at.to_string(),
            ephemeral_key: issued.ephemeral_key,
        }
    }
}

/// Generate Access Handler
///
/// Issues a pending session for a doctor and returns its one-time secret.
#[endpoint(
    tags("access"),
    summary = "Generate Access Session",
    security(("bearer_auth" = [])),
    responses(
        (status_code = StatusCode::CREATED, description = "Session issued"),
        (status_code = StatusCode::BAD_REQUEST, description = "Bad Request"),
        (status_code = StatusCode::UNAUTHORIZED, description = "Unauthorized"),
        (status_code = StatusCode::INTERNAL_SERVER_ERROR, description = "Internal Server Error"),
    ),
)]
#[tracing::instrument(
    name = "access.generate",
    skip(json, depot, res),
    fields(
        tenant_uuid = tracing::field::Empty,
        patient_uuid = tracing::field::Empty,
        channel = tracing::field::Empty
    ),
    err
)]
pub(crate) async fn handler(
    json: JsonBody<GenerateAccessRequest>,
    depot: &mut Depot,
    res: &mut Response,
) -> Result<Json<GenerateAccessResponse>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let owner = depot.patient_or_401()?;
    let request = json.into_inner();

    let channel = request
        .channel
        .as_deref()
        .unwrap_or(AccessChannel::Otp.as_str())
        .parse::<AccessChannel>()
        .map_err(|error| StatusError::bad_request().brief(error.to_string()))?;

    let span = tracing::Span::current();

    span.record("tenant_uuid", tracing::field::display(owner.tenant));
    span.record("patient_uuid", tracing::field::display(owner.patient));
    span.record("channel", tracing::field::display(channel));

    let issued = state
        .app
        .access
        .issue_session(
            owner,
            NewAccessSession {
                doctor_email: request.doctor_email,
                channel,
            },
        )
        .await
        .map_err(into_status_error)?;

    record_access_event(AccessAction::issued(channel));

    tracing::info!(session_uuid = %issued.uuid, %channel, "issued access session");

    res.status_code(StatusCode::CREATED);

    Ok(Json(issued.into()))
}

#[cfg(test)]
mod tests {
    use jiff::Timestamp;
    use salvo::test::{ResponseExt, TestClient};
    use serde_json::json;
    use testresult::TestResult;

    use scansehat_app::domain::access::{
        AccessServiceError, MockAccessService, records::AccessSessionUuid, secrets::generate_otp,
    };

    use crate::test_helpers::{TEST_PATIENT, patient_service, state_with_access};

    use super::*;

    fn make_service(access: MockAccessService) -> Service {
        patient_service(
            state_with_access(access),
            Router::with_path("access/generate").post(handler),
        )
    }

    fn issued(secret: IssuedSecret) -> IssuedAccessSession {
        IssuedAccessSession {
            uuid: AccessSessionUuid::new(),
            session_token: "a".repeat(64),
            ephemeral_key: "b".repeat(64),
            expires_at: Timestamp::UNIX_EPOCH,
            secret,
        }
    }

    #[tokio::test]
    async fn otp_is_the_default_channel() -> TestResult {
        let bundle = generate_otp(jiff::SignedDuration::from_mins(10))?;
        let code = bundle.code.as_str().to_string();

        let mut access = MockAccessService::new();

        access
            .expect_issue_session()
            .once()
            .withf(|owner, request| {
                *owner == TEST_PATIENT
                    && request.doctor_email == "doctor@x.com"
                    && request.channel == AccessChannel::Otp
            })
            .return_once(move |_, _| Ok(issued(IssuedSecret::Otp(bundle.code))));

        let mut res = TestClient::post("http://example.com/access/generate")
            .json(&json!({ "doctorEmail": "doctor@x.com" }))
            .send(&make_service(access))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::CREATED));

        let body: GenerateAccessResponse = res.take_json().await?;

        assert_eq!(body.otp.as_deref(), Some(code.as_str()));
        assert!(body.qr.is_none(), "otp response carries no qr");
        assert!(body.qr_payload.is_none(), "otp response carries no payload");
        assert_eq!(body.session_token, "a".repeat(64));
        assert_eq!(body.ephemeral_key, "b".repeat(64));
        assert_eq!(body.expires_at, Timestamp::UNIX_EPOCH.to_string());

        Ok(())
    }

    #[tokio::test]
    async fn qr_channel_returns_image_and_payload() -> TestResult {
        let mut access = MockAccessService::new();

        access
            .expect_issue_session()
            .once()
            .withf(|_, request| request.channel == AccessChannel::Qr)
            .return_once(|_, _| {
                Ok(issued(IssuedSecret::Qr {
                    image: "data:image/svg+xml;base64,AAAA".to_string(),
                    payload: "{\"sessionToken\":\"t\"}".to_string(),
                }))
            });

        let mut res = TestClient::post("http://example.com/access/generate")
            .json(&json!({ "doctorEmail": "doctor@y.com", "channel": "qr" }))
            .send(&make_service(access))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::CREATED));

        let body: GenerateAccessResponse = res.take_json().await?;

        assert!(body.otp.is_none(), "qr response carries no otp");
        assert_eq!(body.qr.as_deref(), Some("data:image/svg+xml;base64,AAAA"));
        assert_eq!(body.qr_payload.as_deref(), Some("{\"sessionToken\":\"t\"}"));

        Ok(())
    }

    #[tokio::test]
    async fn unknown_channel_returns_400_without_issuing() -> TestResult {
        let mut access = MockAccessService::new();

        access.expect_issue_session().never();

        let mut res = TestClient::post("http://example.com/access/generate")
            .json(&json!({ "doctorEmail": "doctor@x.com", "channel": "sms" }))
            .send(&make_service(access))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::BAD_REQUEST));
        assert!(
            res.take_string().await?.contains("channel must be otp or qr"),
            "expected channel message"
        );

        Ok(())
    }

    #[tokio::test]
    async fn missing_doctor_email_returns_400() -> TestResult {
        let mut access = MockAccessService::new();

        access
            .expect_issue_session()
            .once()
            .withf(|_, request| request.doctor_email.is_empty())
            .return_once(|_, _| Err(AccessServiceError::InvalidDoctorEmail));

        let res = TestClient::post("http://example.com/access/generate")
            .json(&json!({ "channel": "otp" }))
            .send(&make_service(access))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::BAD_REQUEST));

        Ok(())
    }

    #[tokio::test]
    async fn unauthenticated_request_returns_401() -> TestResult {
        let mut access = MockAccessService::new();

        access.expect_issue_session().never();

        let service = crate::test_helpers::anonymous_service(
            state_with_access(access),
            Router::with_path("access/generate").post(handler),
        );

        let res = TestClient::post("http://example.com/access/generate")
            .json(&json!({ "doctorEmail": "doctor@x.com" }))
            .send(&service)
            .await;

        assert_eq!(res.status_code, Some(StatusCode::UNAUTHORIZED));

        Ok(())
    }
}
