//! Database preparation run once before the server accepts requests.

use quotesync_engine::Timestamp;

use super::{run_migrations, seed_demo_quotes, Pool};

/// Errors while preparing the database.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("Seeding demo data failed: {0}")]
    Seed(#[from] sqlx::Error),
}

/// Apply migrations, then seed the demo quotes when asked to.
pub async fn prepare_database(
    pool: &Pool,
    seed_demo_data: bool,
    now: Timestamp,
) -> Result<(), StartupError> {
    tracing::info!("Running database migrations...");
    run_migrations(pool).await?;

    if seed_demo_data {
        match seed_demo_quotes(pool, now).await? {
            0 => tracing::info!("Quotes table not empty, demo seed skipped"),
            seeded => tracing::info!(seeded, "Demo quotes seeded"),
        }
    }

    Ok(())
}
