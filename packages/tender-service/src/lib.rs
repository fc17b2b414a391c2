pub mod backend;
pub mod bootstrap;
pub mod columns;
pub mod curation;
pub mod kv;
pub mod reconcile;
pub mod recommendations;
pub mod search;
pub mod suggest;
pub mod toggle;

mod error;

pub use backend::PgBackend;
pub use columns::TextColumnCache;
pub use curation::LocalCurationCache;
pub use error::{Error, Result};
pub use kv::FileKeyValueStore;
pub use reconcile::{ReconcileReport, ReconcileSkip};
pub use recommendations::RecommendationCache;
pub use search::SearchResponse;
pub use toggle::{ShortlistToggle, ToggleDirection, ToggleOutcome, ToggleReason, UndoToken};

use std::{
	future::Future,
	pin::Pin,
	sync::{Arc, Mutex, MutexGuard},
	time::{Duration, Instant},
};

use time::UtcOffset;
use uuid::Uuid;

use tender_config::Config;
use tender_domain::{GatePhase, SyncGate, TenderQuery};
use tender_storage::models::{ListingPage, RecommendationRow, ShortlistPage};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Backing store holding listings, shortlists and recommendations.
pub trait TenderBackend
where
	Self: Send + Sync,
{
	fn fetch_page<'a>(&'a self, query: &'a TenderQuery) -> BoxFuture<'a, Result<ListingPage>>;

	fn sample_values<'a>(
		&'a self,
		column: &'a str,
		prefix: &'a str,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<String>>>;

	/// Text-typed columns of the listing relation.
	fn text_columns<'a>(&'a self) -> BoxFuture<'a, Result<Vec<String>>>;

	/// An existing entry must surface as [`Error::Conflict`].
	fn insert_shortlist<'a>(
		&'a self,
		user_id: Uuid,
		tender_id: &'a str,
	) -> BoxFuture<'a, Result<()>>;

	fn delete_shortlist<'a>(
		&'a self,
		user_id: Uuid,
		tender_id: &'a str,
	) -> BoxFuture<'a, Result<()>>;

	fn delete_shortlists<'a>(
		&'a self,
		user_id: Uuid,
		tender_ids: &'a [String],
	) -> BoxFuture<'a, Result<u64>>;

	fn recommended<'a>(
		&'a self,
		user_id: Uuid,
		limit: u32,
		offset: u32,
	) -> BoxFuture<'a, Result<Vec<RecommendationRow>>>;

	fn shortlisted<'a>(
		&'a self,
		user_id: Uuid,
		limit: u32,
		offset: u32,
	) -> BoxFuture<'a, Result<ShortlistPage>>;
}

pub trait IdentityResolver
where
	Self: Send + Sync,
{
	/// `None` when nobody is signed in.
	fn current<'a>(&'a self) -> BoxFuture<'a, Result<Option<Identity>>>;
}

/// Profile-scoped string storage that survives restarts.
pub trait KeyValueStore
where
	Self: Send + Sync,
{
	fn get(&self, key: &str) -> Result<Option<String>>;

	fn set(&self, key: &str, value: &str) -> Result<()>;
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Identity {
	pub user_id: Uuid,
}

#[derive(Clone)]
pub struct Collaborators {
	pub backend: Arc<dyn TenderBackend>,
	pub identity: Arc<dyn IdentityResolver>,
	pub store: Arc<dyn KeyValueStore>,
}
impl Collaborators {
	pub fn new(
		backend: Arc<dyn TenderBackend>,
		identity: Arc<dyn IdentityResolver>,
		store: Arc<dyn KeyValueStore>,
	) -> Self {
		Self { backend, identity, store }
	}
}

/// Discovery, shortlist and recommendation engine behind the UI.
pub struct TenderEngine {
	pub cfg: Config,
	pub collaborators: Collaborators,
	local_offset: UtcOffset,
	curation: Mutex<LocalCurationCache>,
	gate: Mutex<SyncGate>,
	recommendations: Mutex<RecommendationCache>,
	text_columns: TextColumnCache,
}
impl TenderEngine {
	pub fn new(cfg: Config, collaborators: Collaborators) -> Result<Self> {
		Self::with_text_columns(cfg, collaborators, TextColumnCache::default())
	}

	/// Shares a column cache between engines over the same listing relation.
	pub fn with_text_columns(
		cfg: Config,
		collaborators: Collaborators,
		text_columns: TextColumnCache,
	) -> Result<Self> {
		let local_offset = tender_config::parse_offset(&cfg.storage.local_offset)?;
		let curation =
			LocalCurationCache::load(collaborators.store.clone(), &cfg.shortlist.storage_key);
		let gate = SyncGate::new(
			Duration::from_millis(cfg.shortlist.cooldown_ms),
			Duration::from_millis(cfg.shortlist.settle_ms),
		);

		Ok(Self {
			cfg,
			collaborators,
			local_offset,
			curation: Mutex::new(curation),
			gate: Mutex::new(gate),
			recommendations: Mutex::new(RecommendationCache::default()),
			text_columns,
		})
	}

	pub fn is_shortlisted(&self, id: &str) -> bool {
		lock(&self.curation).has(id)
	}

	/// Locally shortlisted ids, sorted.
	pub fn shortlisted_ids(&self) -> Vec<String> {
		lock(&self.curation).all_ids()
	}

	pub fn gate_phase(&self) -> GatePhase {
		lock(&self.gate).phase(now())
	}

	pub fn text_columns(&self) -> &TextColumnCache {
		&self.text_columns
	}

	pub(crate) fn is_read_safe(&self) -> bool {
		lock(&self.gate).is_read_safe(now())
	}

	pub(crate) async fn resolve_identity(&self) -> Result<Option<Identity>> {
		self.collaborators.identity.current().await
	}
}

/// Monotonic clock reading that follows tokio's paused time in tests.
pub(crate) fn now() -> Instant {
	tokio::time::Instant::now().into_std()
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
	mutex.lock().unwrap_or_else(|err| err.into_inner())
}
