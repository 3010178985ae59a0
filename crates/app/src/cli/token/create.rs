use clap::Args;
use jiff::Timestamp;
use scansehat_app::{
    auth::PgAuthService,
    domain::{
        patients::records::{PatientIdentity, PatientUuid},
        tenants::records::TenantUuid,
    },
};
use uuid::Uuid;

#[derive(Debug, Args)]
pub(crate) struct CreateTokenArgs {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: String,

    /// Tenant the patient belongs to
    #[arg(long)]
    tenant_uuid: Uuid,

    /// Patient that should own the token
    #[arg(long)]
    patient_uuid: Uuid,

    /// Optional token expiration timestamp (RFC 3339)
    #[arg(long)]
    token_expires_at: Option<Timestamp>,
}

pub(crate) async fn run(args: CreateTokenArgs) -> Result<(), String> {
    if let Some(expires_at) = args.token_expires_at
        && expires_at <= Timestamp::now()
    {
        return Err("token-expires-at must be in the future".to_string());
    }

    let db = super::super::connect(&args.database_url).await?;

    let owner = PatientIdentity {
        tenant: TenantUuid::from_uuid(args.tenant_uuid),
        patient: PatientUuid::from_uuid(args.patient_uuid),
    };

    let issued = PgAuthService::new(db)
        .issue_api_token(owner, args.token_expires_at)
        .await
        .map_err(|error| format!("failed to create token: {error}"))?;

    println!("token_uuid: {}", issued.metadata.uuid);
    println!("tenant_uuid: {}", issued.metadata.owner.tenant);
    println!("patient_uuid: {}", issued.metadata.owner.patient);
    println!("token_created_at: {}", issued.metadata.created_at);
    if let Some(expires_at) = issued.metadata.expires_at {
        println!("token_expires_at: {expires_at}");
    }
    println!("api_token: {}", issued.token);
    println!("store this token now; it is only shown once");

    Ok(())
}
