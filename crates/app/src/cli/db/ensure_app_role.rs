use clap::Args;
use sqlx::{Postgres, Transaction, query, query_scalar};

/// Runtime privileges per table. The access log is append-only and medical
/// records are written by the upload pipeline, never by the access service.
const TABLE_PRIVILEGES: [(&str, &str); 6] = [
    ("tenants", "SELECT"),
    ("patients", "SELECT, INSERT, UPDATE"),
    ("patient_tokens", "SELECT, INSERT, UPDATE"),
    ("medical_records", "SELECT"),
    ("access_sessions", "SELECT, INSERT, UPDATE, DELETE"),
    ("access_logs", "SELECT, INSERT"),
];

#[derive(Debug, Args)]
pub(crate) struct EnsureAppRoleArgs {
    /// Administrative PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: String,

    /// Role the JSON API connects as
    #[arg(long, default_value = "scansehat_app")]
    role_name: String,

    /// Password for the runtime role
    #[arg(long, env = "APP_DB_PASSWORD", hide_env_values = true)]
    password: String,
}

async fn quoted(
    tx: &mut Transaction<'_, Postgres>,
    function: &str,
    value: &str,
) -> Result<String, String> {
    query_scalar(&format!("SELECT {function}($1)"))
        .bind(value)
        .fetch_one(&mut **tx)
        .await
        .map_err(|error| format!("failed to quote value with {function}: {error}"))
}

pub(crate) async fn run(args: EnsureAppRoleArgs) -> Result<(), String> {
    if args.role_name.trim().is_empty() {
        return Err("role-name cannot be empty".to_string());
    }

    if args.password.trim().is_empty() {
        return Err("password cannot be empty".to_string());
    }

    let db = super::super::connect(&args.database_url).await?;

    let mut tx = db
        .begin_transaction()
        .await
        .map_err(|error| format!("failed to start transaction: {error}"))?;

    // Role names and passwords cannot be bound as parameters.
    let role = quoted(&mut tx, "quote_ident", &args.role_name).await?;
    let password = quoted(&mut tx, "quote_literal", &args.password).await?;

    let role_exists: bool =
        query_scalar("SELECT EXISTS (SELECT 1 FROM pg_roles WHERE rolname = $1)")
            .bind(&args.role_name)
            .fetch_one(&mut *tx)
            .await
            .map_err(|error| format!("failed to check role existence: {error}"))?;

    let database: String = query_scalar("SELECT quote_ident(current_database())")
        .fetch_one(&mut *tx)
        .await
        .map_err(|error| format!("failed to resolve database name: {error}"))?;

    let verb = if role_exists { "ALTER" } else { "CREATE" };

    let mut statements = vec![
        format!(
            "{verb} ROLE {role} LOGIN PASSWORD {password} \
             NOSUPERUSER NOCREATEDB NOCREATEROLE NOREPLICATION NOBYPASSRLS"
        ),
        format!("GRANT CONNECT ON DATABASE {database} TO {role}"),
        format!("GRANT USAGE ON SCHEMA public TO {role}"),
        format!("REVOKE ALL ON ALL TABLES IN SCHEMA public FROM {role}"),
    ];

    statements.extend(
        TABLE_PRIVILEGES
            .iter()
            .map(|(table, privileges)| format!("GRANT {privileges} ON TABLE {table} TO {role}")),
    );

    for (step, sql) in statements.iter().enumerate() {
        query(sql)
            .execute(&mut *tx)
            .await
            .map_err(|error| format!("failed to apply role step {step}: {error}"))?;
    }

    tx.commit()
        .await
        .map_err(|error| format!("failed to commit changes: {error}"))?;

    println!("ensured app role: {}", args.role_name);
    for (table, privileges) in TABLE_PRIVILEGES {
        println!("  {table}: {privileges}");
    }

    Ok(())
}
