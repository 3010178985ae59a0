//! Database Config

use clap::Args;

/// Database settings.
#[derive(Debug, Args)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection string for the runtime app role (must not bypass RLS)
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,
}
