use clap::Args;
use scansehat_app::{
    auth::PgAuthService,
    domain::{
        patients::records::{PatientIdentity, PatientUuid},
        tenants::records::TenantUuid,
    },
};
use uuid::Uuid;

#[derive(Debug, Args)]
pub(crate) struct ListTokensArgs {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: String,

    #[arg(long)]
    tenant_uuid: Uuid,

    /// Patient whose tokens should be listed
    #[arg(long)]
    patient_uuid: Uuid,
}

fn or_placeholder(value: Option<jiff::Timestamp>, placeholder: &str) -> String {
    value.map_or_else(|| placeholder.to_string(), |value| value.to_string())
}

pub(crate) async fn run(args: ListTokensArgs) -> Result<(), String> {
    let db = super::super::connect(&args.database_url).await?;

    let owner = PatientIdentity {
        tenant: TenantUuid::from_uuid(args.tenant_uuid),
        patient: PatientUuid::from_uuid(args.patient_uuid),
    };

    let tokens = PgAuthService::new(db)
        .list_api_tokens(owner)
        .await
        .map_err(|error| format!("failed to list tokens: {error}"))?;

    if tokens.is_empty() {
        println!("no tokens found for patient {}", owner.patient);
        return Ok(());
    }

    for token in tokens {
        println!("token_uuid: {}", token.uuid);
        println!("token_version: {}", token.version.as_i16());
        println!("created_at: {}", token.created_at);
        println!("last_used_at: {}", or_placeholder(token.last_used_at, "never"));
        println!("expires_at: {}", or_placeholder(token.expires_at, "none"));
        println!("revoked_at: {}", or_placeholder(token.revoked_at, "active"));
        println!();
    }

    Ok(())
}
