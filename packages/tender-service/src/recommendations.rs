use std::collections::BTreeMap;

use uuid::Uuid;

use tender_config::Sources;
use tender_domain::{RecommendationPair, TenderSource};
use tender_storage::models::RecommendationRow;

/// Recommendation pairs of the last user they were fetched for.
#[derive(Debug, Default)]
pub struct RecommendationCache {
	owner: Option<Uuid>,
	pairs: Vec<RecommendationPair>,
}
impl RecommendationCache {
	/// Cached pairs, only when they belong to `owner`.
	pub fn get(&self, owner: Uuid) -> Option<&[RecommendationPair]> {
		(self.owner == Some(owner)).then_some(self.pairs.as_slice())
	}

	pub fn owner(&self) -> Option<Uuid> {
		self.owner
	}

	pub fn store(&mut self, owner: Uuid, pairs: Vec<RecommendationPair>) {
		self.owner = Some(owner);
		self.pairs = pairs;
	}

	pub fn invalidate(&mut self) {
		self.owner = None;
		self.pairs.clear();
	}
}

/// Maps procedure rows onto pairs, dropping rows whose source code is not configured.
pub fn pairs_from_rows(rows: &[RecommendationRow], sources: &Sources) -> Vec<RecommendationPair> {
	let mut pairs = Vec::with_capacity(rows.len());

	for row in rows {
		let code = row.source.trim();
		let source = if code.eq_ignore_ascii_case(&sources.primary) {
			TenderSource::Primary
		} else if code.eq_ignore_ascii_case(&sources.secondary) {
			TenderSource::Secondary
		} else {
			tracing::debug!(tender_id = row.tender_id, source = code, "Skipping recommendation.");

			continue;
		};

		pairs.push(RecommendationPair { id: row.tender_id, source });
	}

	pairs
}

/// Recommended ids per source, ready for an `IN` filter.
pub fn ids_by_source(pairs: &[RecommendationPair]) -> BTreeMap<TenderSource, Vec<String>> {
	let mut grouped: BTreeMap<TenderSource, Vec<String>> = BTreeMap::new();

	for pair in pairs {
		let ids = grouped.entry(pair.source).or_default();
		let id = pair.id.to_string();

		if !ids.contains(&id) {
			ids.push(id);
		}
	}

	grouped
}
