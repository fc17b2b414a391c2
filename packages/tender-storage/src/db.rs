use sqlx::{PgPool, postgres::PgPoolOptions};

use crate::{Result, schema};

const SCHEMA_LOCK_ID: i64 = 7_120_531;

pub struct Db {
	pub pool: PgPool,
}
impl Db {
	pub async fn connect(cfg: &tender_config::Postgres) -> Result<Self> {
		let pool =
			PgPoolOptions::new().max_connections(cfg.pool_max_conns).connect(&cfg.dsn).await?;

		Ok(Self { pool })
	}

	/// Creates the shortlist and recommendation tables and procedures.
	///
	/// The listing relation is owned by the ingestion side and must already exist, because the
	/// shortlist procedure joins against it.
	pub async fn ensure_schema(&self, listing_relation: &str) -> Result<()> {
		let sql = schema::render_schema(listing_relation);
		// Advisory locks are held per connection; the transaction pins one connection.
		let mut tx = self.pool.begin().await?;

		sqlx::query("SELECT pg_advisory_xact_lock($1)")
			.bind(SCHEMA_LOCK_ID)
			.execute(&mut *tx)
			.await?;
		sqlx::raw_sql(&sql).execute(&mut *tx).await?;

		tx.commit().await?;

		tracing::info!(listing_relation, "Schema ensured.");

		Ok(())
	}
}
