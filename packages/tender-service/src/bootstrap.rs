//! Process-edge wiring: configuration, tracing and the Postgres-backed engine.

use std::{path::Path, sync::Arc};

use tracing_subscriber::EnvFilter;

use crate::{Collaborators, IdentityResolver, KeyValueStore, PgBackend, TenderEngine};
use tender_config::Config;
use tender_storage::db::Db;

/// Installs the global subscriber. Safe to call more than once; later calls are no-ops.
pub fn init_tracing(cfg: &Config) -> color_eyre::Result<()> {
	let filter =
		EnvFilter::try_new(&cfg.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	if tracing_subscriber::fmt().with_env_filter(filter).try_init().is_err() {
		tracing::debug!("Tracing subscriber already installed.");
	}

	Ok(())
}

/// Loads the config at `path`, installs tracing and returns a connected engine.
pub async fn start(
	path: &Path,
	identity: Arc<dyn IdentityResolver>,
	store: Arc<dyn KeyValueStore>,
) -> color_eyre::Result<TenderEngine> {
	let cfg = tender_config::load(path)?;

	init_tracing(&cfg)?;

	connect(cfg, identity, store).await
}

/// Connects to Postgres, ensures the shortlist schema and builds the engine.
pub async fn connect(
	cfg: Config,
	identity: Arc<dyn IdentityResolver>,
	store: Arc<dyn KeyValueStore>,
) -> color_eyre::Result<TenderEngine> {
	let db = Db::connect(&cfg.storage.postgres).await?;

	db.ensure_schema(&cfg.storage.listing_relation).await?;

	let backend = Arc::new(PgBackend::new(db, cfg.storage.listing_relation.clone()));
	let engine = TenderEngine::new(cfg, Collaborators::new(backend, identity, store))?;

	tracing::info!(
		listing_relation = %engine.cfg.storage.listing_relation,
		"Tender engine ready."
	);

	Ok(engine)
}
