use clap::Args;
use jiff::SignedDuration;
use scansehat_app::domain::access::{AccessSettings, PgAccessService};

#[derive(Debug, Args)]
pub(crate) struct SweepExpiredArgs {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: String,

    /// Keep sessions for this many minutes past their deadline
    #[arg(long, default_value_t = 0)]
    grace_minutes: u32,
}

pub(crate) async fn run(args: SweepExpiredArgs) -> Result<(), String> {
    let db = super::super::connect(&args.database_url).await?;

    let deleted = PgAccessService::new(db, AccessSettings::default())
        .sweep_expired(SignedDuration::from_mins(i64::from(args.grace_minutes)))
        .await
        .map_err(|error| format!("failed to sweep expired sessions: {error}"))?;

    println!("deleted {deleted} expired access sessions");

    Ok(())
}
