//! Durable local set of shortlisted tender ids.

use std::{collections::BTreeSet, sync::Arc};

use crate::KeyValueStore;

pub struct LocalCurationCache {
	ids: BTreeSet<String>,
	store: Arc<dyn KeyValueStore>,
	key: String,
}
impl LocalCurationCache {
	/// Reads the persisted set. Unreadable or malformed data starts an empty set.
	pub fn load(store: Arc<dyn KeyValueStore>, key: &str) -> Self {
		let ids = match store.get(key) {
			Ok(Some(raw)) => match serde_json::from_str::<Vec<String>>(&raw) {
				Ok(ids) => ids.into_iter().filter(|id| !id.is_empty()).collect(),
				Err(err) => {
					tracing::warn!(error = %err, key, "Discarding malformed shortlist cache.");

					BTreeSet::new()
				},
			},
			Ok(None) => BTreeSet::new(),
			Err(err) => {
				tracing::warn!(error = %err, key, "Failed to read shortlist cache.");

				BTreeSet::new()
			},
		};

		Self { ids, store, key: key.to_string() }
	}

	pub fn has(&self, id: &str) -> bool {
		self.ids.contains(id)
	}

	/// Returns whether the set changed.
	pub fn add(&mut self, id: &str) -> bool {
		self.ids.insert(id.to_string())
	}

	/// Returns whether the set changed.
	pub fn remove(&mut self, id: &str) -> bool {
		self.ids.remove(id)
	}

	pub fn all_ids(&self) -> Vec<String> {
		self.ids.iter().cloned().collect()
	}

	pub fn len(&self) -> usize {
		self.ids.len()
	}

	pub fn is_empty(&self) -> bool {
		self.ids.is_empty()
	}

	pub fn replace_all<I>(&mut self, ids: I)
	where
		I: IntoIterator<Item = String>,
	{
		self.ids = ids.into_iter().filter(|id| !id.is_empty()).collect();
	}

	/// Writes the set through to the store. Failures are logged and otherwise ignored.
	pub fn persist(&self) {
		let encoded = match serde_json::to_string(&self.ids) {
			Ok(encoded) => encoded,
			Err(err) => {
				tracing::warn!(error = %err, "Failed to encode shortlist cache.");

				return;
			},
		};

		if let Err(err) = self.store.set(&self.key, &encoded) {
			tracing::warn!(error = %err, key = %self.key, "Failed to persist shortlist cache.");
		}
	}
}
