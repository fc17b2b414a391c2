use std::sync::{Arc, Mutex};

use crate::{TenderBackend, lock};
use tender_domain::fields;

/// Searchable text columns discovered on the listing relation.
///
/// Discovery runs once; [`TextColumnCache::invalidate`] forces the next search to rediscover,
/// e.g. after the listing relation was migrated.
#[derive(Clone, Debug, Default)]
pub struct TextColumnCache {
	discovered: Arc<Mutex<Option<Vec<String>>>>,
}
impl TextColumnCache {
	pub async fn searchable(&self, backend: &dyn TenderBackend) -> Vec<String> {
		if let Some(columns) = lock(&self.discovered).as_ref() {
			return columns.clone();
		}

		match backend.text_columns().await {
			Ok(found) if !found.is_empty() => {
				let columns = searchable_subset(&found);

				tracing::debug!(columns = ?columns, "Discovered searchable text columns.");

				*lock(&self.discovered) = Some(columns.clone());

				columns
			},
			Ok(_) => {
				tracing::warn!("Listing relation reported no text columns; using fallback list.");

				fallback_columns()
			},
			Err(err) => {
				tracing::warn!(error = %err, "Text column discovery failed; using fallback list.");

				fallback_columns()
			},
		}
	}

	pub fn invalidate(&self) {
		*lock(&self.discovered) = None;
	}

	pub fn is_cached(&self) -> bool {
		lock(&self.discovered).is_some()
	}
}

/// Candidates present on the relation, in candidate priority order.
pub fn searchable_subset(found: &[String]) -> Vec<String> {
	fields::SEARCHABLE_TEXT
		.iter()
		.filter(|candidate| found.iter().any(|column| column == *candidate))
		.map(|candidate| candidate.to_string())
		.collect()
}

/// Canonical column of each searchable attribute.
pub fn fallback_columns() -> Vec<String> {
	[
		fields::BID_NUMBER,
		fields::TITLE,
		fields::CATEGORY,
		fields::MINISTRY,
		fields::DEPARTMENT,
		fields::ORGANIZATION_NAME,
	]
	.iter()
	.map(|field| field.primary().to_string())
	.collect()
}
