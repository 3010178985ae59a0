//! Access Logs Repository

use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query_as, types::Json};
use uuid::Uuid;

use crate::domain::{
    access::records::AccessSessionUuid,
    audit::{
        data::NewAccessLog,
        records::{AccessAction, AccessLogDetails, AccessLogRecord, AccessLogUuid},
    },
    patients::records::{PatientIdentity, PatientUuid},
    tenants::records::TenantUuid,
};

const INSERT_ACCESS_LOG_SQL: &str = include_str!("sql/insert_access_log.sql");
const LIST_ACCESS_LOGS_SQL: &str = include_str!("sql/list_access_logs.sql");

/// Page size for the patient-facing log listing.
pub(crate) const ACCESS_LOG_LIMIT: i64 = 100;

#[derive(Debug, Clone, Default)]
pub(crate) struct PgAuditRepository;

impl PgAuditRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn insert_log(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        entry: NewAccessLog,
    ) -> Result<AccessLogRecord, sqlx::Error> {
        query_as::<Postgres, AccessLogRecord>(INSERT_ACCESS_LOG_SQL)
            .bind(entry.uuid.into_uuid())
            .bind(entry.owner.tenant.into_uuid())
            .bind(entry.owner.patient.into_uuid())
            .bind(entry.session_uuid.map(AccessSessionUuid::into_uuid))
            .bind(entry.doctor_email)
            .bind(entry.action.as_str())
            .bind(entry.details.map(Json))
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn list_logs(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        owner: PatientIdentity,
    ) -> Result<Vec<AccessLogRecord>, sqlx::Error> {
        query_as::<Postgres, AccessLogRecord>(LIST_ACCESS_LOGS_SQL)
            .bind(owner.tenant.into_uuid())
            .bind(owner.patient.into_uuid())
            .bind(ACCESS_LOG_LIMIT)
            .fetch_all(&mut **tx)
            .await
    }
}

impl<'r> FromRow<'r, PgRow> for AccessLogRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let action = row
            .try_get::<String, _>("action")?
            .parse::<AccessAction>()
            .map_err(|e| sqlx::Error::ColumnDecode {
                index: "action".to_string(),
                source: Box::new(e),
            })?;

        Ok(Self {
            uuid: AccessLogUuid::from_uuid(row.try_get("uuid")?),
            tenant_uuid: TenantUuid::from_uuid(row.try_get("tenant_uuid")?),
            patient_uuid: PatientUuid::from_uuid(row.try_get("patient_uuid")?),
            session_uuid: row
                .try_get::<Option<Uuid>, _>("session_uuid")?
                .map(AccessSessionUuid::from_uuid),
            doctor_email: row.try_get("doctor_email")?,
            action,
            details: row
                .try_get::<Option<Json<AccessLogDetails>>, _>("details")?
                .map(|Json(details)| details),
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
        })
    }
}
