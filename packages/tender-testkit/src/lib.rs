//! Test support: a throwaway Postgres database and in-memory engine collaborators.

pub mod filter;
pub mod memory;

mod error;

pub use error::{Error, Result};
pub use memory::{Failure, MemoryBackend, MemoryIdentity, MemoryKeyValueStore, Op};

use std::{env, str::FromStr, thread};

use sqlx::{
	ConnectOptions, Connection, Executor,
	postgres::{PgConnectOptions, PgConnection},
};
use tokio::runtime::Builder;
use uuid::Uuid;

use tender_config::Postgres;
use tender_storage::db::Db;

/// Relation created by [`TestDatabase::seed_listing`].
pub const LISTING_RELATION: &str = "tenders";

const ADMIN_DATABASES: [&str; 2] = ["postgres", "template1"];
/// Four tenders: live (1), expired (2), undated on the secondary source (3) and a legacy row
/// whose deadline only lives in `end_datetime` (4).
const LISTING_FIXTURE: &str = "\
CREATE TABLE tenders (
	id bigint PRIMARY KEY,
	source text,
	bid_number text,
	item_title text,
	ministry text,
	emd_amount numeric,
	publishing_datetime timestamptz,
	bid_end_datetime timestamptz,
	end_datetime timestamptz
);
INSERT INTO tenders (
	id, source, bid_number, item_title, ministry, emd_amount, publishing_datetime,
	bid_end_datetime, end_datetime
) VALUES
	(1, 'gem', 'GEM/2025/B/1', 'Laptop', 'Ministry of Railways', 0, now() - interval '1 day',
		now() + interval '10 days', NULL),
	(2, 'gem', 'GEM/2025/B/2', 'Rail clamps', 'Ministry of Coal', 5000,
		now() - interval '2 days', now() - interval '1 day', NULL),
	(3, 'cpwd', 'CPWD/17', 'Road work', 'Ministry of Railways', NULL, now() - interval '3 days',
		NULL, NULL),
	(4, 'gem', 'GEM/2019/B/4', 'Printer', 'Ministry of Coal', NULL, now() - interval '4 days',
		NULL, now() - interval '2 days');";

/// A uniquely named database created for one test and dropped afterwards.
pub struct TestDatabase {
	name: String,
	dsn: String,
	admin_options: PgConnectOptions,
	cleaned: bool,
}
impl TestDatabase {
	pub async fn new(base_dsn: &str) -> Result<Self> {
		let base_options: PgConnectOptions = PgConnectOptions::from_str(base_dsn)
			.map_err(|err| Error::Message(format!("Failed to parse TENDER_PG_DSN: {err}.")))?;
		let (admin_options, mut admin_conn) = connect_admin(&base_options).await?;
		let name = format!("tender_test_{}", Uuid::new_v4().simple());
		let create_sql = format!(r#"CREATE DATABASE "{}""#, name);

		admin_conn
			.execute(create_sql.as_str())
			.await
			.map_err(|err| Error::Message(format!("Failed to create test database: {err}.")))?;

		let dsn = base_options.clone().database(&name).to_url_lossy().to_string();

		Ok(Self { name, dsn, admin_options, cleaned: false })
	}

	pub fn dsn(&self) -> &str {
		&self.dsn
	}

	/// Connects, creates and seeds the listing relation, then bootstraps the shortlist schema.
	pub async fn seed_listing(&self) -> Result<Db> {
		let cfg = Postgres { dsn: self.dsn.clone(), pool_max_conns: 2 };
		let db = Db::connect(&cfg).await?;

		sqlx::raw_sql(LISTING_FIXTURE).execute(&db.pool).await?;
		db.ensure_schema(LISTING_RELATION).await?;

		Ok(db)
	}

	/// Drops the database now instead of on a helper thread at drop time.
	pub async fn cleanup(mut self) -> Result<()> {
		cleanup_database(&self.name, &self.admin_options).await?;

		self.cleaned = true;

		Ok(())
	}
}
impl Drop for TestDatabase {
	fn drop(&mut self) {
		if self.cleaned {
			return;
		}

		let name = self.name.clone();
		let admin_options = self.admin_options.clone();
		// The test runtime may already be shutting down; clean up on a private one.
		let cleanup_thread = thread::spawn(move || {
			let runtime = match Builder::new_current_thread().enable_all().build() {
				Ok(runtime) => runtime,
				Err(err) => {
					eprintln!("Test database cleanup failed: {err}.");

					return;
				},
			};

			if let Err(err) = runtime.block_on(cleanup_database(&name, &admin_options)) {
				eprintln!("Test database cleanup failed: {err}.");
			}
		});
		let _ = cleanup_thread.join();
	}
}

pub fn env_dsn() -> Option<String> {
	env::var("TENDER_PG_DSN").ok()
}

async fn connect_admin(
	base_options: &PgConnectOptions,
) -> Result<(PgConnectOptions, PgConnection)> {
	let mut last_err = None;

	for database in ADMIN_DATABASES {
		let options = base_options.clone().database(database);

		match PgConnection::connect_with(&options).await {
			Ok(conn) => return Ok((options, conn)),
			Err(err) => {
				last_err = Some(err);
			},
		}
	}

	Err(Error::Message(format!("Failed to connect to an admin database: {last_err:?}.")))
}

async fn cleanup_database(name: &str, admin_options: &PgConnectOptions) -> Result<()> {
	let mut conn = PgConnection::connect_with(admin_options).await.map_err(|err| {
		Error::Message(format!("Failed to connect to admin database for cleanup: {err}."))
	})?;
	let drop_sql = format!(r#"DROP DATABASE IF EXISTS "{}""#, name);
	let _ = sqlx::query(
		"\
SELECT pg_terminate_backend(pid)
FROM pg_stat_activity
WHERE datname = $1 AND pid <> pg_backend_pid()",
	)
	.bind(name)
	.fetch_all(&mut conn)
	.await;

	sqlx::query(drop_sql.as_str())
		.execute(&mut conn)
		.await
		.map_err(|err| Error::Message(format!("Failed to drop test database: {err}.")))?;

	Ok(())
}
