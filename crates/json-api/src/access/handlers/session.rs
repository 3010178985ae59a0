//! Access Session Disclosure Handler

use std::{collections::BTreeMap, sync::Arc};

use salvo::{
    oapi::{ToSchema, extract::PathParam},
    prelude::*,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use scansehat_app::domain::{
    access::data::{Disclosure, DisclosureRequest},
    audit::records::AccessAction,
    records::records::{EncryptionBundle, RecordMetadata, SharedRecord, StructuredMedicalData},
};

use crate::{
    access::errors::into_status_error, extensions::*, observability::record_access_event,
    state::State,
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct EncryptionResponse {
    pub ciphertext: String,
    pub iv: String,
    pub salt: String,
}

impl From<EncryptionBundle> for EncryptionResponse {
    fn from(bundle: EncryptionBundle) -> Self {
        Self {
            ciphertext: bundle.ciphertext,
            iv: bundle.iv,
            salt: bundle.salt,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StructuredDataResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnosis: Option<String>,
    #[serde(default)]
    pub medications: Vec<String>,
    #[serde(default)]
    pub lab_values: BTreeMap<String, Value>,
    #[serde(default)]
    pub vitals: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctor_notes: Option<String>,
    #[serde(default)]
    pub allergies: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctor_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_type: Option<String>,
}

impl From<StructuredMedicalData> for StructuredDataResponse {
    fn from(data: StructuredMedicalData) -> Self {
        Self {
            diagnosis: data.diagnosis,
            medications: data.medications,
            lab_values: data.lab_values,
            vitals: data.vitals,
            doctor_notes: data.doctor_notes,
            allergies: data.allergies,
            doctor_name: data.doctor_name,
            record_type: data.record_type,
        }
    }
}

/// A record as disclosed to a doctor. Internal bookkeeping columns are never
/// part of this shape.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SharedRecordResponse {
    pub id: Uuid,
    pub file_url: String,
    pub file_type: String,
    pub file_size: u64,
    pub encryption: EncryptionResponse,
    pub summary: String,
    /// Uploader-supplied details such as report date or lab name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    /// `verified`, `patient-uploaded`, `low-quality`, or `unknown`
    pub integrity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_data: Option<StructuredDataResponse>,
    pub created_at: String,
}

impl From<SharedRecord> for SharedRecordResponse {
    fn from(record: SharedRecord) -> Self {
        Self {
            id: record.uuid.into_uuid(),
            file_url: record.file_url,
            file_type: record.file_type,
            file_size: record.file_size,
            encryption: record.encryption.into(),
            summary: record.summary,
            metadata: record.metadata.map(RecordMetadata::into_json),
            integrity: record.integrity.to_string(),
            structured_data: record.structured_data.map(Into::into),
            created_at: record.created_at.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DisclosureResponse {
    pub records: Vec<SharedRecordResponse>,
    pub expires_at: String,
}

impl From<Disclosure> for DisclosureResponse {
    fn from(disclosure: Disclosure) -> Self {
        Self {
            records: disclosure.records.into_iter().map(Into::into).collect(),
            expires_at: disclosure.expires_at.to_string(),
        }
    }
}

/// Access Session Disclosure Handler
///
/// Returns the session owner's records to the doctor holding a redeemed
/// session. Expects `doctorEmail` and `ephemeralKey` query parameters.
#[endpoint(
    tags("access"),
    summary = "Read Shared Records",
    responses(
        (status_code = StatusCode::OK, description = "Records disclosed"),
        (status_code = StatusCode::BAD_REQUEST, description = "Missing doctorEmail or ephemeralKey"),
        (status_code = StatusCode::UNAUTHORIZED, description = "Invalid ephemeral key"),
        (status_code = StatusCode::FORBIDDEN, description = "Session pending redemption"),
        (status_code = StatusCode::NOT_FOUND, description = "Session not found"),
        (status_code = StatusCode::GONE, description = "Session expired or revoked"),
        (status_code = StatusCode::INTERNAL_SERVER_ERROR, description = "Internal Server Error"),
    ),
)]
#[tracing::instrument(name = "access.disclose", skip(token, req, depot), err)]
pub(crate) async fn handler(
    token: PathParam<String>,
    req: &mut Request,
    depot: &mut Depot,
) -> Result<Json<DisclosureResponse>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;

    let request = DisclosureRequest {
        session_token: token.into_inner(),
        doctor_email: req.query::<String>("doctorEmail"),
        ephemeral_key: req.query::<String>("ephemeralKey"),
    };

    let disclosure = state
        .app
        .access
        .disclose_records(request)
        .await
        .map_err(into_status_error)?;

    record_access_event(AccessAction::RecordsViewed);

    tracing::info!(count = disclosure.records.len(), "disclosed shared records");

    Ok(Json(disclosure.into()))
}
