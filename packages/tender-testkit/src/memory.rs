//! In-memory implementations of the engine collaborators.

use std::{
	collections::{BTreeMap, HashMap, VecDeque},
	sync::{
		Mutex, MutexGuard,
		atomic::{AtomicBool, Ordering},
	},
	time::Duration,
};

use serde_json::Value;
use uuid::Uuid;

use crate::filter;
use tender_domain::{TenderQuery, fields};
use tender_service::{
	BoxFuture, Error, Identity, IdentityResolver, KeyValueStore, Result, TenderBackend,
};
use tender_storage::models::{ListingPage, RecommendationRow, ShortlistEntry, ShortlistPage};

/// Backend operations, for call counting and failure injection.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Op {
	FetchPage,
	SampleValues,
	TextColumns,
	InsertShortlist,
	DeleteShortlist,
	DeleteShortlists,
	Recommended,
	Shortlisted,
}

/// Failure injected into the next call of an [`Op`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Failure {
	/// The database rejected the statement.
	Server,
	/// The connection dropped; the write may or may not have landed.
	Transport,
	/// A uniqueness constraint fired.
	Conflict,
	/// No pooled connection became available; nothing was sent.
	PoolTimedOut,
}
impl Failure {
	fn into_error(self, op: Op) -> Error {
		let message = format!("Injected failure in {op:?}.");

		match self {
			Self::Server => Error::Storage { message },
			Self::Transport => Error::Transport { message },
			Self::Conflict => Error::Conflict { message },
			Self::PoolTimedOut => tender_storage::Error::Sqlx(sqlx::Error::PoolTimedOut).into(),
		}
	}
}

#[derive(Default)]
struct State {
	rows: Vec<Value>,
	text_columns: Option<Vec<String>>,
	shortlists: BTreeMap<Uuid, Vec<String>>,
	recommendations: HashMap<Uuid, Vec<(i64, String)>>,
	failures: HashMap<Op, VecDeque<Failure>>,
	calls: HashMap<Op, usize>,
	queries: Vec<TenderQuery>,
}

/// Listing rows, shortlists and recommendations held in memory.
#[derive(Default)]
pub struct MemoryBackend {
	state: Mutex<State>,
	delays: Mutex<HashMap<Op, Duration>>,
}
impl MemoryBackend {
	pub fn with_rows(rows: Vec<Value>) -> Self {
		let backend = Self::default();

		backend.state().rows = rows;

		backend
	}

	pub fn push_row(&self, row: Value) {
		self.state().rows.push(row);
	}

	/// Removes the listing rows whose id renders as `id`.
	pub fn remove_row(&self, id: &str) {
		self.state().rows.retain(|row| row_id(row).as_deref() != Some(id));
	}

	/// Overrides the columns reported by [`TenderBackend::text_columns`].
	pub fn set_text_columns(&self, columns: &[&str]) {
		self.state().text_columns = Some(columns.iter().map(|column| column.to_string()).collect());
	}

	/// Seeds the authoritative shortlist without counting a call.
	pub fn seed_shortlist(&self, user_id: Uuid, tender_id: &str) {
		let mut state = self.state();
		let ids = state.shortlists.entry(user_id).or_default();

		if !ids.iter().any(|id| id == tender_id) {
			ids.push(tender_id.to_string());
		}
	}

	pub fn shortlist_of(&self, user_id: Uuid) -> Vec<String> {
		self.state().shortlists.get(&user_id).cloned().unwrap_or_default()
	}

	pub fn recommend(&self, user_id: Uuid, tender_id: i64, source: &str) {
		self.state()
			.recommendations
			.entry(user_id)
			.or_default()
			.push((tender_id, source.to_string()));
	}

	/// Queues `failure` for the next call of `op`.
	pub fn fail_next(&self, op: Op, failure: Failure) {
		self.state().failures.entry(op).or_default().push_back(failure);
	}

	pub fn calls(&self, op: Op) -> usize {
		self.state().calls.get(&op).copied().unwrap_or(0)
	}

	pub fn last_query(&self) -> Option<TenderQuery> {
		self.state().queries.last().cloned()
	}

	/// Delays every later call of `op`, so tests can observe it in flight.
	pub fn set_delay(&self, op: Op, delay: Option<Duration>) {
		let mut delays = lock(&self.delays);

		match delay {
			Some(delay) => delays.insert(op, delay),
			None => delays.remove(&op),
		};
	}

	fn state(&self) -> MutexGuard<'_, State> {
		lock(&self.state)
	}

	/// Waits out the configured delay, counts the call and pops an injected failure.
	async fn enter(&self, op: Op) -> Result<()> {
		let delay = lock(&self.delays).get(&op).copied();

		if let Some(delay) = delay {
			tokio::time::sleep(delay).await;
		}

		let mut state = self.state();

		*state.calls.entry(op).or_default() += 1;

		match state.failures.get_mut(&op).and_then(VecDeque::pop_front) {
			Some(failure) => Err(failure.into_error(op)),
			None => Ok(()),
		}
	}
}

impl TenderBackend for MemoryBackend {
	fn fetch_page<'a>(&'a self, query: &'a TenderQuery) -> BoxFuture<'a, Result<ListingPage>> {
		Box::pin(async move {
			self.enter(Op::FetchPage).await?;

			let mut state = self.state();

			state.queries.push(query.clone());

			let (rows, total) = filter::run(&state.rows, query);

			Ok(ListingPage { rows, total })
		})
	}

	fn sample_values<'a>(
		&'a self,
		column: &'a str,
		prefix: &'a str,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<String>>> {
		Box::pin(async move {
			self.enter(Op::SampleValues).await?;

			let pattern = format!("{}%", tender_domain::query::escape_like(prefix.trim()));
			let values = self
				.state()
				.rows
				.iter()
				.filter_map(|row| row.get(column).and_then(fields::coerce_text))
				.filter(|value| filter::like_match(&pattern, value))
				.take(limit as usize)
				.collect();

			Ok(values)
		})
	}

	fn text_columns<'a>(&'a self) -> BoxFuture<'a, Result<Vec<String>>> {
		Box::pin(async move {
			self.enter(Op::TextColumns).await?;

			let state = self.state();

			if let Some(columns) = &state.text_columns {
				return Ok(columns.clone());
			}

			let mut columns: Vec<String> = Vec::new();

			for row in &state.rows {
				let Some(object) = row.as_object() else {
					continue;
				};

				for (key, value) in object {
					if value.is_string() && !columns.contains(key) {
						columns.push(key.clone());
					}
				}
			}

			Ok(columns)
		})
	}

	fn insert_shortlist<'a>(
		&'a self,
		user_id: Uuid,
		tender_id: &'a str,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			self.enter(Op::InsertShortlist).await?;

			let mut state = self.state();
			let ids = state.shortlists.entry(user_id).or_default();

			if ids.iter().any(|id| id == tender_id) {
				return Err(Error::Conflict {
					message: format!("Tender {tender_id} is already shortlisted."),
				});
			}

			ids.push(tender_id.to_string());

			Ok(())
		})
	}

	fn delete_shortlist<'a>(
		&'a self,
		user_id: Uuid,
		tender_id: &'a str,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			self.enter(Op::DeleteShortlist).await?;

			if let Some(ids) = self.state().shortlists.get_mut(&user_id) {
				ids.retain(|id| id != tender_id);
			}

			Ok(())
		})
	}

	fn delete_shortlists<'a>(
		&'a self,
		user_id: Uuid,
		tender_ids: &'a [String],
	) -> BoxFuture<'a, Result<u64>> {
		Box::pin(async move {
			self.enter(Op::DeleteShortlists).await?;

			let mut state = self.state();
			let Some(ids) = state.shortlists.get_mut(&user_id) else {
				return Ok(0);
			};
			let before = ids.len();

			ids.retain(|id| !tender_ids.contains(id));

			Ok((before - ids.len()) as u64)
		})
	}

	fn recommended<'a>(
		&'a self,
		user_id: Uuid,
		limit: u32,
		offset: u32,
	) -> BoxFuture<'a, Result<Vec<RecommendationRow>>> {
		Box::pin(async move {
			self.enter(Op::Recommended).await?;

			let state = self.state();
			let pairs = state.recommendations.get(&user_id).cloned().unwrap_or_default();
			let total_count = pairs.len() as i64;

			Ok(pairs
				.into_iter()
				.skip(offset as usize)
				.take(limit as usize)
				.map(|(tender_id, source)| RecommendationRow { tender_id, source, total_count })
				.collect())
		})
	}

	fn shortlisted<'a>(
		&'a self,
		user_id: Uuid,
		limit: u32,
		offset: u32,
	) -> BoxFuture<'a, Result<ShortlistPage>> {
		Box::pin(async move {
			self.enter(Op::Shortlisted).await?;

			let state = self.state();
			let ids = state.shortlists.get(&user_id).cloned().unwrap_or_default();
			let rows = ids
				.iter()
				.skip(offset as usize)
				.take(limit as usize)
				.map(|id| ShortlistEntry {
					tender_id: id.clone(),
					tender: state
						.rows
						.iter()
						.find(|row| row_id(row).as_deref() == Some(id.as_str()))
						.cloned(),
				})
				.collect();

			Ok(ShortlistPage { total: ids.len() as u64, rows })
		})
	}
}

/// Signed-in user, switchable at runtime.
#[derive(Default)]
pub struct MemoryIdentity {
	current: Mutex<Option<Identity>>,
	failing: AtomicBool,
}
impl MemoryIdentity {
	pub fn signed_in(user_id: Uuid) -> Self {
		Self { current: Mutex::new(Some(Identity { user_id })), failing: AtomicBool::new(false) }
	}

	pub fn signed_out() -> Self {
		Self::default()
	}

	pub fn sign_in(&self, user_id: Uuid) {
		*lock(&self.current) = Some(Identity { user_id });
	}

	pub fn sign_out(&self) {
		*lock(&self.current) = None;
	}

	/// Makes every lookup fail until reset.
	pub fn set_failing(&self, failing: bool) {
		self.failing.store(failing, Ordering::SeqCst);
	}
}

impl IdentityResolver for MemoryIdentity {
	fn current<'a>(&'a self) -> BoxFuture<'a, Result<Option<Identity>>> {
		Box::pin(async move {
			if self.failing.load(Ordering::SeqCst) {
				return Err(Error::Identity { message: "Session lookup failed.".to_string() });
			}

			Ok(*lock(&self.current))
		})
	}
}

#[derive(Default)]
pub struct MemoryKeyValueStore {
	entries: Mutex<HashMap<String, String>>,
	fail_writes: AtomicBool,
}
impl MemoryKeyValueStore {
	pub fn raw(&self, key: &str) -> Option<String> {
		lock(&self.entries).get(key).cloned()
	}

	/// Stores `value` verbatim, bypassing any encoding.
	pub fn insert_raw(&self, key: &str, value: &str) {
		lock(&self.entries).insert(key.to_string(), value.to_string());
	}

	pub fn set_fail_writes(&self, fail: bool) {
		self.fail_writes.store(fail, Ordering::SeqCst);
	}
}

impl KeyValueStore for MemoryKeyValueStore {
	fn get(&self, key: &str) -> Result<Option<String>> {
		Ok(self.raw(key))
	}

	fn set(&self, key: &str, value: &str) -> Result<()> {
		if self.fail_writes.load(Ordering::SeqCst) {
			return Err(Error::LocalStore { message: "Store is read-only.".to_string() });
		}

		self.insert_raw(key, value);

		Ok(())
	}
}

fn row_id(row: &Value) -> Option<String> {
	row.as_object().and_then(|object| fields::text(object, &fields::ID))
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
	mutex.lock().unwrap_or_else(|err| err.into_inner())
}
