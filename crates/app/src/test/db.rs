//! Per-test PostgreSQL databases inside one shared container.

use std::sync::atomic::{AtomicU64, Ordering};

use once_cell::sync::Lazy;
use sqlx::{Connection, PgConnection, PgPool, query};
use testcontainers::{ContainerAsync, ImageExt, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres as PostgresImage;
use tokio::sync::{OnceCell, mpsc};

pub(super) const SUPERUSER: &str = "scansehat_test";
pub(super) const SUPERUSER_PASSWORD: &str = "scansehat_test_password";

static POSTGRES_CONTAINER: Lazy<OnceCell<ContainerAsync<PostgresImage>>> = Lazy::new(OnceCell::new);

/// Databases queued for dropping once their `TestDb` goes away.
static DROP_QUEUE: Lazy<OnceCell<mpsc::UnboundedSender<String>>> = Lazy::new(OnceCell::new);

static DATABASE_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Only names we generated ourselves are ever interpolated into DDL.
fn is_generated_name(name: &str) -> bool {
    name.len() <= 63
        && name.starts_with("scansehat_test_")
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

async fn start_container() -> ContainerAsync<PostgresImage> {
    PostgresImage::default()
        .with_user(SUPERUSER)
        .with_password(SUPERUSER_PASSWORD)
        .with_db_name(SUPERUSER)
        .with_env_var("POSTGRES_INITDB_ARGS", "--auth-host=trust")
        .start()
        .await
        .expect("Failed to start PostgreSQL container")
}

/// Base URL (no database path) for the shared container.
pub(super) async fn server_url(user: &str, password: &str) -> String {
    let container = POSTGRES_CONTAINER.get_or_init(start_container).await;

    let port = container
        .get_host_port_ipv4(5432)
        .await
        .expect("Failed to get container port");

    let host =
        std::env::var("TESTCONTAINERS_HOST_OVERRIDE").unwrap_or_else(|_| "localhost".to_string());

    format!("postgresql://{user}:{password}@{host}:{port}")
}

async fn start_drop_worker() -> mpsc::UnboundedSender<String> {
    let (sender, mut receiver) = mpsc::unbounded_channel::<String>();

    tokio::spawn(async move {
        while let Some(name) = receiver.recv().await {
            if !is_generated_name(&name) {
                continue;
            }

            let url = format!(
                "{}/postgres",
                server_url(SUPERUSER, SUPERUSER_PASSWORD).await
            );

            if let Ok(mut conn) = PgConnection::connect(&url).await {
                let _ = query(&format!("DROP DATABASE IF EXISTS \"{name}\" WITH (FORCE)"))
                    .execute(&mut conn)
                    .await;
                let _ = conn.close().await;
            }
        }
    });

    sender
}

/// A freshly migrated database, connected as the container superuser.
///
/// Services commit normally; isolation comes from every test owning its
/// own database rather than from rollback.
#[derive(Debug)]
pub struct TestDb {
    pool: PgPool,
    pub name: String,
}

impl Drop for TestDb {
    fn drop(&mut self) {
        if let Some(sender) = DROP_QUEUE.get() {
            let _ = sender.send(self.name.clone());
        }
    }
}

impl TestDb {
    pub async fn new() -> Self {
        DROP_QUEUE.get_or_init(start_drop_worker).await;

        let name = format!(
            "scansehat_test_{}_{}",
            std::process::id(),
            DATABASE_SEQUENCE.fetch_add(1, Ordering::Relaxed)
        );

        assert!(is_generated_name(&name), "generated an invalid name: {name}");

        let base = server_url(SUPERUSER, SUPERUSER_PASSWORD).await;

        let mut conn = PgConnection::connect(&format!("{base}/postgres"))
            .await
            .expect("Failed to connect to postgres database");

        query(&format!("CREATE DATABASE \"{name}\""))
            .execute(&mut conn)
            .await
            .expect("Failed to create test database");

        conn.close()
            .await
            .expect("Failed to close admin connection");

        let pool = PgPool::connect(&format!("{base}/{name}"))
            .await
            .expect("Failed to connect to test database");

        sqlx::migrate!("../../migrations")
            .run(&pool)
            .await
            .expect("Failed to run migrations");

        Self { pool, name }
    }

    /// Superuser pool. Bypasses row-level security; use for fixtures only.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// URL for `user` against this database.
    pub(super) async fn url_for(&self, user: &str, password: &str) -> String {
        format!("{}/{}", server_url(user, password).await, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_generated_names_are_droppable() {
        assert!(is_generated_name("scansehat_test_41_0"), "generated name");
        assert!(!is_generated_name("postgres"), "maintenance db");
        assert!(!is_generated_name("scansehat_test_x\"; DROP"), "quoted injection");
        assert!(
            !is_generated_name(&format!("scansehat_test_{}", "a".repeat(60))),
            "too long"
        );
    }

    #[tokio::test]
    async fn migrations_create_access_tables() {
        let db = TestDb::new().await;

        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT tablename::text FROM pg_tables WHERE schemaname = 'public' ORDER BY 1",
        )
        .fetch_all(db.pool())
        .await
        .expect("Failed to list tables");

        for table in ["access_logs", "access_sessions", "medical_records", "patients"] {
            assert!(
                tables.iter().any(|t| t == table),
                "missing table {table}: {tables:?}"
            );
        }
    }
}
