//! Apply the stock ledger schema to the database named by `DATABASE_URL`.

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

use stockledger_infra::{LedgerConfig, PostgresStockLedger};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    stockledger_observability::init();

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let config = LedgerConfig::from_env();

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    PostgresStockLedger::new(pool, config)
        .migrate()
        .await
        .context("failed to apply stock ledger schema")?;

    tracing::info!("migration finished");
    Ok(())
}
