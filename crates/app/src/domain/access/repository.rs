//! Access Sessions Repository

use jiff::Timestamp;
use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query, query_as};

use crate::domain::{
    access::records::{
        AccessChannel, AccessSessionRecord, AccessSessionUuid, AccessStatus, SecretDigest,
    },
    patients::records::{PatientIdentity, PatientUuid},
    tenants::records::TenantUuid,
};

const INSERT_SESSION_SQL: &str = include_str!("sql/insert_session.sql");
const FIND_LATEST_PENDING_OTP_SESSION_SQL: &str =
    include_str!("sql/find_latest_pending_otp_session.sql");
const FIND_PENDING_QR_SESSION_SQL: &str = include_str!("sql/find_pending_qr_session.sql");
const FIND_SESSION_BY_TOKEN_SQL: &str = include_str!("sql/find_session_by_token.sql");
const FIND_PATIENT_SESSION_SQL: &str = include_str!("sql/find_patient_session.sql");
const CLAIM_PENDING_SESSION_SQL: &str = include_str!("sql/claim_pending_session.sql");
const MARK_SESSION_EXPIRED_SQL: &str = include_str!("sql/mark_session_expired.sql");
const REVOKE_PENDING_SESSION_SQL: &str = include_str!("sql/revoke_pending_session.sql");
const LIST_PATIENT_SESSIONS_SQL: &str = include_str!("sql/list_patient_sessions.sql");
const DELETE_EXPIRED_SESSIONS_SQL: &str = include_str!("sql/delete_expired_sessions.sql");

/// Upper bound on sessions returned to a patient.
pub(crate) const SESSION_LIST_LIMIT: i64 = 100;

/// Row to insert; always created `pending`.
#[derive(Debug)]
pub(crate) struct InsertAccessSession<'a> {
    pub uuid: AccessSessionUuid,
    pub owner: PatientIdentity,
    pub doctor_email: &'a str,
    pub digest: &'a SecretDigest,
    pub session_token: &'a str,
    pub ephemeral_key: &'a str,
    pub expires_at: Timestamp,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct PgAccessSessionsRepository;

impl PgAccessSessionsRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn insert(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        session: InsertAccessSession<'_>,
    ) -> Result<AccessSessionRecord, sqlx::Error> {
        query_as::<Postgres, AccessSessionRecord>(INSERT_SESSION_SQL)
            .bind(session.uuid.into_uuid())
            .bind(session.owner.tenant.into_uuid())
            .bind(session.owner.patient.into_uuid())
            .bind(session.doctor_email)
            .bind(session.digest.channel().as_str())
            .bind(session.digest.otp_hash())
            .bind(session.digest.qr_hash())
            .bind(session.session_token)
            .bind(session.ephemeral_key)
            .bind(SqlxTimestamp::from(session.expires_at))
            .fetch_one(&mut **tx)
            .await
    }

    /// Newest pending OTP session for this doctor. Older pending OTPs are
    /// shadowed until they expire.
    pub(crate) async fn find_latest_pending_otp_session(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        doctor_email: &str,
    ) -> Result<Option<AccessSessionRecord>, sqlx::Error> {
        query_as::<Postgres, AccessSessionRecord>(FIND_LATEST_PENDING_OTP_SESSION_SQL)
            .bind(doctor_email)
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn find_pending_qr_session(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        doctor_email: &str,
        qr_hash: &str,
    ) -> Result<Option<AccessSessionRecord>, sqlx::Error> {
        query_as::<Postgres, AccessSessionRecord>(FIND_PENDING_QR_SESSION_SQL)
            .bind(doctor_email)
            .bind(qr_hash)
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn find_session_by_token(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        session_token: &str,
        doctor_email: &str,
    ) -> Result<Option<AccessSessionRecord>, sqlx::Error> {
        query_as::<Postgres, AccessSessionRecord>(FIND_SESSION_BY_TOKEN_SQL)
            .bind(session_token)
            .bind(doctor_email)
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn find_patient_session(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        owner: PatientIdentity,
        session_token: &str,
    ) -> Result<Option<AccessSessionRecord>, sqlx::Error> {
        query_as::<Postgres, AccessSessionRecord>(FIND_PATIENT_SESSION_SQL)
            .bind(session_token)
            .bind(owner.tenant.into_uuid())
            .bind(owner.patient.into_uuid())
            .fetch_optional(&mut **tx)
            .await
    }

    /// Compare-and-swap `pending -> redeemed`. `None` means another caller
    /// won, or the deadline passed in between.
    pub(crate) async fn claim_pending_session(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        session: AccessSessionUuid,
        now: Timestamp,
    ) -> Result<Option<AccessSessionRecord>, sqlx::Error> {
        query_as::<Postgres, AccessSessionRecord>(CLAIM_PENDING_SESSION_SQL)
            .bind(session.into_uuid())
            .bind(SqlxTimestamp::from(now))
            .fetch_optional(&mut **tx)
            .await
    }

    /// Returns the row only when this call performed the transition.
    pub(crate) async fn mark_expired(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        session: AccessSessionUuid,
    ) -> Result<Option<AccessSessionRecord>, sqlx::Error> {
        query_as::<Postgres, AccessSessionRecord>(MARK_SESSION_EXPIRED_SQL)
            .bind(session.into_uuid())
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn revoke_pending_session(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        owner: PatientIdentity,
        session_token: &str,
        now: Timestamp,
    ) -> Result<Option<AccessSessionRecord>, sqlx::Error> {
        query_as::<Postgres, AccessSessionRecord>(REVOKE_PENDING_SESSION_SQL)
            .bind(session_token)
            .bind(owner.tenant.into_uuid())
            .bind(owner.patient.into_uuid())
            .bind(SqlxTimestamp::from(now))
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn list_patient_sessions(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        owner: PatientIdentity,
    ) -> Result<Vec<AccessSessionRecord>, sqlx::Error> {
        query_as::<Postgres, AccessSessionRecord>(LIST_PATIENT_SESSIONS_SQL)
            .bind(owner.tenant.into_uuid())
            .bind(owner.patient.into_uuid())
            .bind(SESSION_LIST_LIMIT)
            .fetch_all(&mut **tx)
            .await
    }

    /// Housekeeping: drop sessions whose deadline is before `cutoff`.
    pub(crate) async fn delete_expired_sessions(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        cutoff: Timestamp,
    ) -> Result<u64, sqlx::Error> {
        query(DELETE_EXPIRED_SESSIONS_SQL)
            .bind(SqlxTimestamp::from(cutoff))
            .execute(&mut **tx)
            .await
            .map(|result| result.rows_affected())
    }
}

impl<'r> FromRow<'r, PgRow> for AccessSessionRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let channel = row
            .try_get::<String, _>("channel")?
            .parse::<AccessChannel>()
            .map_err(|e| sqlx::Error::ColumnDecode {
                index: "channel".to_string(),
                source: Box::new(e),
            })?;

        let digest_column = match channel {
            AccessChannel::Otp => "otp_hash",
            AccessChannel::Qr => "qr_hash",
        };

        let hash = row
            .try_get::<Option<String>, _>(digest_column)?
            .ok_or_else(|| sqlx::Error::ColumnDecode {
                index: digest_column.to_string(),
                source: format!("{channel} session without {digest_column}").into(),
            })?;

        let digest = match channel {
            AccessChannel::Otp => SecretDigest::Otp(hash),
            AccessChannel::Qr => SecretDigest::Qr(hash),
        };

        let status = row
            .try_get::<String, _>("status")?
            .parse::<AccessStatus>()
            .map_err(|e| sqlx::Error::ColumnDecode {
                index: "status".to_string(),
                source: Box::new(e),
            })?;

        Ok(Self {
            uuid: AccessSessionUuid::from_uuid(row.try_get("uuid")?),
            tenant_uuid: TenantUuid::from_uuid(row.try_get("tenant_uuid")?),
            patient_uuid: PatientUuid::from_uuid(row.try_get("patient_uuid")?),
            doctor_email: row.try_get("doctor_email")?,
            digest,
            session_token: row.try_get("session_token")?,
            ephemeral_key: row.try_get("ephemeral_key")?,
            status,
            expires_at: row.try_get::<SqlxTimestamp, _>("expires_at")?.to_jiff(),
            redeemed_at: row
                .try_get::<Option<SqlxTimestamp>, _>("redeemed_at")?
                .map(SqlxTimestamp::to_jiff),
            revoked_at: row
                .try_get::<Option<SqlxTimestamp>, _>("revoked_at")?
                .map(SqlxTimestamp::to_jiff),
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}
