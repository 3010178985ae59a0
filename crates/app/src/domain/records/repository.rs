//! Medical Records Repository

use jiff_sqlx::Timestamp as SqlxTimestamp;
use serde_json::Value;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query_as, types::Json};

use crate::domain::{
    patients::records::PatientIdentity,
    records::records::{
        EncryptionBundle, IntegrityBadge, MedicalRecordUuid, RecordMetadata, SharedRecord,
        StructuredMedicalData,
    },
};

const LIST_SHARED_RECORDS_SQL: &str = include_str!("sql/list_shared_records.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgRecordsRepository;

impl PgRecordsRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    /// Records owned by exactly this tenant/patient pair.
    pub(crate) async fn list_shared_records(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        owner: PatientIdentity,
    ) -> Result<Vec<SharedRecord>, sqlx::Error> {
        query_as::<Postgres, SharedRecord>(LIST_SHARED_RECORDS_SQL)
            .bind(owner.tenant.into_uuid())
            .bind(owner.patient.into_uuid())
            .fetch_all(&mut **tx)
            .await
    }
}

impl<'r> FromRow<'r, PgRow> for SharedRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let file_size: i64 = row.try_get("file_size")?;

        let file_size = u64::try_from(file_size).map_err(|e| sqlx::Error::ColumnDecode {
            index: "file_size".to_string(),
            source: Box::new(e),
        })?;

        let integrity = row
            .try_get::<String, _>("integrity")?
            .parse::<IntegrityBadge>()
            .map_err(|e| sqlx::Error::ColumnDecode {
                index: "integrity".to_string(),
                source: Box::new(e),
            })?;

        Ok(Self {
            uuid: MedicalRecordUuid::from_uuid(row.try_get("uuid")?),
            file_url: row.try_get("file_url")?,
            file_type: row.try_get("file_type")?,
            file_size,
            encryption: EncryptionBundle {
                ciphertext: row.try_get("ciphertext")?,
                iv: row.try_get("iv")?,
                salt: row.try_get("salt")?,
            },
            summary: row.try_get("summary")?,
            integrity,
            metadata: json_column(row, "metadata")?.and_then(RecordMetadata::from_json),
            structured_data: json_column(row, "structured_data")?
                .and_then(StructuredMedicalData::from_json),
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
        })
    }
}

/// Schemaless JSONB columns are read as raw JSON and interpreted afterwards,
/// so an unexpected shape degrades one field instead of failing the row.
fn json_column(row: &PgRow, column: &str) -> sqlx::Result<Option<Value>> {
    Ok(row
        .try_get::<Option<Json<Value>>, _>(column)?
        .map(|Json(value)| value))
}
