//! Patients Repository

use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query_as};

use crate::domain::{
    patients::{
        data::NewPatient,
        records::{PatientRecord, PatientUuid},
    },
    tenants::records::TenantUuid,
};

const CREATE_PATIENT_SQL: &str = include_str!("sql/create_patient.sql");
const GET_PATIENT_SQL: &str = include_str!("sql/get_patient.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgPatientsRepository;

impl PgPatientsRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn create_patient(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        patient: NewPatient,
    ) -> Result<PatientRecord, sqlx::Error> {
        query_as::<Postgres, PatientRecord>(CREATE_PATIENT_SQL)
            .bind(patient.uuid.into_uuid())
            .bind(patient.email)
            .bind(patient.name)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn get_patient(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        patient: PatientUuid,
    ) -> Result<PatientRecord, sqlx::Error> {
        query_as::<Postgres, PatientRecord>(GET_PATIENT_SQL)
            .bind(patient.into_uuid())
            .fetch_one(&mut **tx)
            .await
    }
}

impl<'r> FromRow<'r, PgRow> for PatientRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: PatientUuid::from_uuid(row.try_get("uuid")?),
            tenant_uuid: TenantUuid::from_uuid(row.try_get("tenant_uuid")?),
            email: row.try_get("email")?,
            name: row.try_get("name")?,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
            deleted_at: row
                .try_get::<Option<SqlxTimestamp>, _>("deleted_at")?
                .map(SqlxTimestamp::to_jiff),
        })
    }
}
