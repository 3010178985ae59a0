//! Redeem Access Session Handler

use std::sync::Arc;

use salvo::{
    oapi::{ToSchema, extract::JsonBody},
    prelude::*,
};
use serde::{Deserialize, Serialize};

use scansehat_app::domain::{
    access::data::{Redemption, SessionCredentials},
    audit::records::AccessAction,
};

use crate::{
    access::errors::into_status_error, extensions::*, observability::record_access_event,
    state::State,
};

/// Redeem Access Request
///
/// Carries exactly one of `otp` or `qrPayload`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RedeemAccessRequest {
    #[serde(default)]
    pub doctor_email: String,

    #[serde(default)]
    pub otp: Option<String>,

    #[serde(default)]
    pub qr_payload: Option<String>,
}

/// Session Credentials Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SessionCredentialsResponse {
    pub session_token: String,
    pub expires_at: String,
    pub ephemeral_key: String,
}

impl From<SessionCredentials> for SessionCredentialsResponse {
    fn from(credentials: SessionCredentials) -> Self {
        Self {
            session_token: credentials.session_token,
            expires_at: credentials.expires_at.to_string(),
            ephemeral_key: credentials.ephemeral_key,
        }
    }
}

/// Redeem Access Handler
///
/// Exchanges a one-time secret for the session token and ephemeral key.
/// Anonymous: the doctor proves possession of the secret instead.
#[endpoint(
    tags("access"),
    summary = "Redeem Access Session",
    responses(
        (status_code = StatusCode::OK, description = "Session redeemed"),
        (status_code = StatusCode::BAD_REQUEST, description = "Bad Request"),
        (status_code = StatusCode::UNAUTHORIZED, description = "Invalid OTP"),
        (status_code = StatusCode::NOT_FOUND, description = "No pending session matches"),
        (status_code = StatusCode::GONE, description = "Session expired"),
        (status_code = StatusCode::INTERNAL_SERVER_ERROR, description = "Internal Server Error"),
    ),
)]
#[tracing::instrument(
    name = "access.redeem",
    skip(json, depot),
    fields(channel = tracing::field::Empty),
    err
)]
pub(crate) async fn handler(
    json: JsonBody<RedeemAccessRequest>,
    depot: &mut Depot,
) -> Result<Json<SessionCredentialsResponse>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let request = json.into_inner();

    let redemption = Redemption::from_parts(request.doctor_email, request.otp, request.qr_payload)
        .map_err(into_status_error)?;
    let channel = redemption.secret.channel();

    tracing::Span::current().record("channel", tracing::field::display(channel));

    let credentials = state
        .app
        .access
        .redeem_session(redemption)
        .await
        .map_err(into_status_error)?;

    record_access_event(AccessAction::redeemed(channel));

    tracing::info!(%channel, "redeemed access session");

    Ok(Json(credentials.into()))
}
