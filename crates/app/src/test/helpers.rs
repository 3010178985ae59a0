//! Test Helpers

use serde_json::{Value, json};
use sqlx::{query, query_as, types::Json};

use crate::{
    domain::{
        access::{
            AccessService,
            data::{IssuedAccessSession, NewAccessSession},
            records::{AccessChannel, AccessSessionRecord, AccessSessionUuid},
        },
        patients::records::PatientIdentity,
        records::records::MedicalRecordUuid,
    },
    test::TestContext,
};

impl TestContext {
    pub(crate) async fn issue(
        &self,
        owner: PatientIdentity,
        doctor_email: &str,
        channel: AccessChannel,
    ) -> IssuedAccessSession {
        self.access
            .issue_session(
                owner,
                NewAccessSession {
                    doctor_email: doctor_email.to_string(),
                    channel,
                },
            )
            .await
            .expect("Failed to issue access session")
    }

    /// Insert a record directly, as the upload pipeline would.
    pub(crate) async fn insert_medical_record(
        &self,
        owner: PatientIdentity,
        summary: &str,
    ) -> MedicalRecordUuid {
        self.insert_medical_record_with(
            owner,
            summary,
            json!({"labName": "City Lab Diagnostics", "ocrText": "copied ocr text"}),
            json!({
                "diagnosis": "Hypertension",
                "medications": ["Amlodipine"],
                "labValues": {"HbA1c": "6.1%"},
            }),
        )
        .await
    }

    /// Insert a record with explicit `metadata` and `structured_data` JSON.
    pub(crate) async fn insert_medical_record_with(
        &self,
        owner: PatientIdentity,
        summary: &str,
        metadata: Value,
        structured_data: Value,
    ) -> MedicalRecordUuid {
        let uuid = MedicalRecordUuid::new();

        query(
            "INSERT INTO medical_records \
               (uuid, tenant_uuid, patient_uuid, file_url, file_type, file_size, \
                ciphertext, iv, salt, summary, metadata, ocr_text, tags, integrity, structured_data) \
             VALUES ($1, $2, $3, $4, 'application/pdf', 2048, 'cipher', 'iv', 'salt', $5, \
                $6, 'raw ocr text', ARRAY['lab'], 'verified', $7)",
        )
        .bind(uuid.into_uuid())
        .bind(owner.tenant.into_uuid())
        .bind(owner.patient.into_uuid())
        .bind(format!("https://files.example.com/{uuid}"))
        .bind(summary)
        .bind(Json(metadata))
        .bind(Json(structured_data))
        .execute(self.admin.pool())
        .await
        .expect("Failed to insert medical record");

        uuid
    }

    /// Move a session's deadline into the past without touching its status.
    pub(crate) async fn backdate_session(&self, session: AccessSessionUuid) {
        query("UPDATE access_sessions SET expires_at = now() - interval '1 minute' WHERE uuid = $1")
            .bind(session.into_uuid())
            .execute(self.admin.pool())
            .await
            .expect("Failed to backdate session");
    }

    pub(crate) async fn load_session(&self, session: AccessSessionUuid) -> AccessSessionRecord {
        query_as::<_, AccessSessionRecord>("SELECT * FROM access_sessions WHERE uuid = $1")
            .bind(session.into_uuid())
            .fetch_one(self.admin.pool())
            .await
            .expect("Failed to load session")
    }
}
