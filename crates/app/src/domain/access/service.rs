//! Access service.

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use jiff::{SignedDuration, Timestamp};
use mockall::automock;
use sqlx::{Postgres, Transaction};
use tracing::{info, warn};

use crate::{
    database::Db,
    domain::{
        access::{
            data::{
                Disclosure, DisclosureRequest, IssuedAccessSession, IssuedSecret,
                NewAccessSession, QrPayload, Redemption, RedemptionSecret, RevokedSession,
                SessionCredentials,
            },
            errors::AccessServiceError,
            qr::{QrRenderer, SvgQrRenderer},
            records::{
                AccessChannel, AccessSessionRecord, AccessSessionUuid, AccessStatus, SecretDigest,
            },
            repository::{InsertAccessSession, PgAccessSessionsRepository},
            secrets::{constant_time_eq, digest, generate_otp, generate_session_token, verify_otp},
            settings::AccessSettings,
        },
        audit::{
            AuditTrail,
            data::NewAccessLog,
            records::{AccessAction, AccessLogDetails},
        },
        patients::records::PatientIdentity,
        records::PgRecordsRepository,
    },
};

#[derive(Clone)]
pub struct PgAccessService {
    db: Db,
    sessions: PgAccessSessionsRepository,
    records: PgRecordsRepository,
    audit: AuditTrail,
    qr: Arc<dyn QrRenderer>,
    settings: AccessSettings,
}

impl PgAccessService {
    #[must_use]
    pub fn new(db: Db, settings: AccessSettings) -> Self {
        Self::with_qr_renderer(db, settings, Arc::new(SvgQrRenderer))
    }

    #[must_use]
    pub fn with_qr_renderer(db: Db, settings: AccessSettings, qr: Arc<dyn QrRenderer>) -> Self {
        Self {
            audit: AuditTrail::new(db.clone()),
            db,
            sessions: PgAccessSessionsRepository::new(),
            records: PgRecordsRepository::new(),
            qr,
            settings,
        }
    }

    /// Delete sessions whose deadline passed more than `grace` ago.
    ///
    /// Housekeeping only; every read path checks deadlines on its own.
    ///
    /// # Errors
    ///
    /// Returns an error when the cutoff is out of range or the delete fails.
    pub async fn sweep_expired(&self, grace: SignedDuration) -> Result<u64, AccessServiceError> {
        let cutoff = Timestamp::now()
            .checked_sub(grace)
            .map_err(AccessServiceError::Timestamp)?;

        let mut tx = self.db.begin_transaction().await?;

        let deleted = self.sessions.delete_expired_sessions(&mut tx, cutoff).await?;

        tx.commit().await?;

        info!(deleted, %cutoff, "swept expired access sessions");

        Ok(deleted)
    }

    /// Flip a located session to `expired` and commit, logging only when
    /// this call performed the transition.
    async fn expire(
        &self,
        mut tx: Transaction<'static, Postgres>,
        session: &AccessSessionRecord,
    ) -> Result<(), AccessServiceError> {
        let transitioned = self.sessions.mark_expired(&mut tx, session.uuid).await?;

        tx.commit().await?;

        if let Some(expired) = transitioned {
            info!(session_uuid = %expired.uuid, "access session expired");

            self.audit
                .record(NewAccessLog::new(
                    expired.owner(),
                    expired.uuid,
                    expired.doctor_email,
                    AccessAction::SessionExpired,
                ))
                .await;
        }

        Ok(())
    }
}

impl fmt::Debug for PgAccessService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgAccessService")
            .field("db", &self.db)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

const fn session_not_found(channel: AccessChannel) -> AccessServiceError {
    match channel {
        AccessChannel::Otp => AccessServiceError::OtpSessionNotFound,
        AccessChannel::Qr => AccessServiceError::QrSessionNotFound,
    }
}

fn required_email(value: &str) -> Result<&str, AccessServiceError> {
    let trimmed = value.trim();

    if trimmed.is_empty() {
        return Err(AccessServiceError::InvalidDoctorEmail);
    }

    Ok(trimmed)
}

#[async_trait]
impl AccessService for PgAccessService {
    async fn issue_session(
        &self,
        owner: PatientIdentity,
        request: NewAccessSession,
    ) -> Result<IssuedAccessSession, AccessServiceError> {
        let doctor_email = required_email(&request.doctor_email)?;
        let channel = request.channel;

        let now = Timestamp::now();

        let session_token = generate_session_token();
        let ephemeral_key = generate_session_token();

        let expires_at = now
            .checked_add(self.settings.session_ttl())
            .map_err(AccessServiceError::Timestamp)?;

        let (secret_digest, secret) = match channel {
            AccessChannel::Otp => {
                let bundle = generate_otp(self.settings.otp_lifetime())?;

                (SecretDigest::Otp(bundle.hash), IssuedSecret::Otp(bundle.code))
            }
            AccessChannel::Qr => {
                let payload = serde_json::to_string(&QrPayload {
                    session_token: &session_token,
                    doctor_email,
                    issued_at: now,
                })?;

                let image = self.qr.render_data_url(&payload)?;

                (
                    SecretDigest::Qr(digest(&payload)),
                    IssuedSecret::Qr { image, payload },
                )
            }
        };

        let mut tx = self.db.begin_transaction().await?;

        let session = self
            .sessions
            .insert(
                &mut tx,
                InsertAccessSession {
                    uuid: AccessSessionUuid::new(),
                    owner,
                    doctor_email,
                    digest: &secret_digest,
                    session_token: &session_token,
                    ephemeral_key: &ephemeral_key,
                    expires_at,
                },
            )
            .await?;

        tx.commit().await?;

        info!(
            session_uuid = %session.uuid,
            tenant_uuid = %owner.tenant,
            patient_uuid = %owner.patient,
            %channel,
            "access session issued"
        );

        self.audit
            .record(NewAccessLog::new(
                owner,
                session.uuid,
                session.doctor_email,
                AccessAction::issued(channel),
            ))
            .await;

        Ok(IssuedAccessSession {
            uuid: session.uuid,
            session_token,
            ephemeral_key,
            expires_at: session.expires_at,
            secret,
        })
    }

    async fn redeem_session(
        &self,
        redemption: Redemption,
    ) -> Result<SessionCredentials, AccessServiceError> {
        let doctor_email = required_email(&redemption.doctor_email)?;
        let channel = redemption.secret.channel();

        let mut tx = self.db.begin_transaction().await?;

        let session = match &redemption.secret {
            RedemptionSecret::Otp(code) => {
                let session = self
                    .sessions
                    .find_latest_pending_otp_session(&mut tx, doctor_email)
                    .await?
                    .ok_or(AccessServiceError::OtpSessionNotFound)?;

                let verified = session
                    .digest
                    .otp_hash()
                    .is_some_and(|hash| verify_otp(code, hash));

                if !verified {
                    warn!(session_uuid = %session.uuid, "otp verification failed");

                    return Err(AccessServiceError::InvalidOtp);
                }

                session
            }
            RedemptionSecret::Qr(payload) => self
                .sessions
                .find_pending_qr_session(&mut tx, doctor_email, &digest(payload))
                .await?
                .ok_or(AccessServiceError::QrSessionNotFound)?,
        };

        let now = Timestamp::now();

        if session.is_past_deadline(now) {
            self.expire(tx, &session).await?;

            return Err(AccessServiceError::Expired);
        }

        let Some(redeemed) = self
            .sessions
            .claim_pending_session(&mut tx, session.uuid, now)
            .await?
        else {
            warn!(session_uuid = %session.uuid, "lost redemption race");

            return Err(session_not_found(channel));
        };

        tx.commit().await?;

        info!(session_uuid = %redeemed.uuid, %channel, "access session redeemed");

        self.audit
            .record(NewAccessLog::new(
                redeemed.owner(),
                redeemed.uuid,
                redeemed.doctor_email.clone(),
                AccessAction::redeemed(channel),
            ))
            .await;

        Ok(SessionCredentials {
            session_token: redeemed.session_token,
            expires_at: redeemed.expires_at,
            ephemeral_key: redeemed.ephemeral_key,
        })
    }

    async fn disclose_records(
        &self,
        request: DisclosureRequest,
    ) -> Result<Disclosure, AccessServiceError> {
        let doctor_email = request
            .doctor_email
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty());

        let ephemeral_key = request
            .ephemeral_key
            .as_deref()
            .filter(|value| !value.is_empty());

        let (Some(doctor_email), Some(ephemeral_key)) = (doctor_email, ephemeral_key) else {
            return Err(AccessServiceError::MissingDisclosureParameters);
        };

        let mut tx = self.db.begin_transaction().await?;

        let session = self
            .sessions
            .find_session_by_token(&mut tx, &request.session_token, doctor_email)
            .await?
            .ok_or(AccessServiceError::SessionNotFound)?;

        if !constant_time_eq(session.ephemeral_key.as_bytes(), ephemeral_key.as_bytes()) {
            warn!(session_uuid = %session.uuid, "ephemeral key mismatch");

            return Err(AccessServiceError::InvalidEphemeralKey);
        }

        if session.status == AccessStatus::Revoked {
            return Err(AccessServiceError::Revoked);
        }

        if session.status == AccessStatus::Expired || session.is_past_deadline(Timestamp::now()) {
            self.expire(tx, &session).await?;

            return Err(AccessServiceError::Expired);
        }

        if session.status != AccessStatus::Redeemed {
            return Err(AccessServiceError::PendingRedemption);
        }

        tx.commit().await?;

        // Scope comes from the session row, never from the caller.
        let owner = session.owner();

        let mut tx = self.db.begin_tenant_transaction(owner.tenant).await?;

        let records = self.records.list_shared_records(&mut tx, owner).await?;

        tx.commit().await?;

        let count = u64::try_from(records.len()).unwrap_or(u64::MAX);

        info!(session_uuid = %session.uuid, count, "records disclosed");

        self.audit
            .record(
                NewAccessLog::new(
                    owner,
                    session.uuid,
                    session.doctor_email,
                    AccessAction::RecordsViewed,
                )
                .with_details(AccessLogDetails::RecordsViewed { count }),
            )
            .await;

        Ok(Disclosure {
            records,
            expires_at: session.expires_at,
        })
    }

    async fn revoke_session(
        &self,
        owner: PatientIdentity,
        session_token: &str,
    ) -> Result<RevokedSession, AccessServiceError> {
        let now = Timestamp::now();

        let mut tx = self.db.begin_transaction().await?;

        let Some(revoked) = self
            .sessions
            .revoke_pending_session(&mut tx, owner, session_token, now)
            .await?
        else {
            let exists = self
                .sessions
                .find_patient_session(&mut tx, owner, session_token)
                .await?
                .is_some();

            return Err(if exists {
                AccessServiceError::NotPending
            } else {
                AccessServiceError::SessionNotFound
            });
        };

        tx.commit().await?;

        info!(session_uuid = %revoked.uuid, "access session revoked");

        self.audit
            .record(NewAccessLog::new(
                owner,
                revoked.uuid,
                revoked.doctor_email,
                AccessAction::SessionRevoked,
            ))
            .await;

        Ok(RevokedSession {
            session_token: revoked.session_token,
            status: revoked.status,
            revoked_at: revoked.revoked_at.unwrap_or(now),
        })
    }

    async fn list_sessions(
        &self,
        owner: PatientIdentity,
    ) -> Result<Vec<AccessSessionRecord>, AccessServiceError> {
        let mut tx = self.db.begin_transaction().await?;

        let sessions = self.sessions.list_patient_sessions(&mut tx, owner).await?;

        tx.commit().await?;

        Ok(sessions)
    }
}

#[automock]
#[async_trait]
/// Access session lifecycle.
pub trait AccessService: Send + Sync {
    /// Create a pending session and return its one-time secret.
    async fn issue_session(
        &self,
        owner: PatientIdentity,
        request: NewAccessSession,
    ) -> Result<IssuedAccessSession, AccessServiceError>;

    /// Exchange a one-time secret for the session credentials.
    async fn redeem_session(
        &self,
        redemption: Redemption,
    ) -> Result<SessionCredentials, AccessServiceError>;

    /// Read the session owner's records with a redeemed session.
    async fn disclose_records(
        &self,
        request: DisclosureRequest,
    ) -> Result<Disclosure, AccessServiceError>;

    /// Cancel a session that has not been redeemed yet.
    async fn revoke_session(
        &self,
        owner: PatientIdentity,
        session_token: &str,
    ) -> Result<RevokedSession, AccessServiceError>;

    /// The patient's sessions, newest first.
    async fn list_sessions(
        &self,
        owner: PatientIdentity,
    ) -> Result<Vec<AccessSessionRecord>, AccessServiceError>;
}
