//! Access Session Errors

use salvo::http::StatusError;
use tracing::error;

use scansehat_app::domain::{access::AccessServiceError, audit::records::AccessAction};

use crate::observability::record_access_event;

/// Map an access failure onto its HTTP status. Store and internal failures
/// are logged here and reach the caller as a bare 500.
pub(crate) fn into_status_error(error: AccessServiceError) -> StatusError {
    match error {
        AccessServiceError::InvalidDoctorEmail
        | AccessServiceError::MissingCredentials
        | AccessServiceError::MissingDisclosureParameters => {
            StatusError::bad_request().brief(error.to_string())
        }
        AccessServiceError::OtpSessionNotFound
        | AccessServiceError::QrSessionNotFound
        | AccessServiceError::SessionNotFound => StatusError::not_found().brief(error.to_string()),
        AccessServiceError::InvalidOtp | AccessServiceError::InvalidEphemeralKey => {
            StatusError::unauthorized().brief(error.to_string())
        }
        AccessServiceError::PendingRedemption => StatusError::forbidden().brief(error.to_string()),
        AccessServiceError::NotPending => StatusError::conflict().brief(error.to_string()),
        AccessServiceError::Expired => {
            record_access_event(AccessAction::SessionExpired);

            StatusError::gone().brief(error.to_string())
        }
        AccessServiceError::Revoked => StatusError::gone().brief(error.to_string()),
        AccessServiceError::Sql(source) => {
            error!("access session storage failure: {source}");

            StatusError::internal_server_error()
        }
        AccessServiceError::Secret(source) => {
            error!("failed to generate access secret: {source}");

            StatusError::internal_server_error()
        }
        AccessServiceError::Qr(source) => {
            error!("failed to render access qr code: {source}");

            StatusError::internal_server_error()
        }
        AccessServiceError::Timestamp(source) => {
            error!("failed to compute session deadline: {source}");

            StatusError::internal_server_error()
        }
        AccessServiceError::Payload(source) => {
            error!("failed to encode qr payload: {source}");

            StatusError::internal_server_error()
        }
    }
}
