use clap::Args;
use scansehat_app::domain::tenants::{PgTenantsService, TenantsService};

#[derive(Debug, Args)]
pub(crate) struct ListTenantsArgs {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: String,
}

pub(crate) async fn run(args: ListTenantsArgs) -> Result<(), String> {
    let db = super::super::connect(&args.database_url).await?;

    let tenants = PgTenantsService::new(db)
        .list_tenants()
        .await
        .map_err(|error| format!("failed to list tenants: {error}"))?;

    if tenants.is_empty() {
        println!("no tenants");
    }

    for tenant in tenants {
        println!("{}\t{}\t{}", tenant.uuid, tenant.name, tenant.created_at);
    }

    Ok(())
}
