use crate::TenderEngine;
use tender_domain::{SuggestField, suggest};

impl TenderEngine {
	/// Most frequent values of `field` starting with `prefix`. Short prefixes and backing-store
	/// failures yield no suggestions.
	pub async fn suggest(&self, field: SuggestField, prefix: &str) -> Vec<String> {
		if !suggest::prefix_is_searchable(prefix) {
			return Vec::new();
		}

		let prefix = prefix.trim();
		let sampled = self
			.collaborators
			.backend
			.sample_values(field.column(), prefix, self.cfg.suggest.sample_size)
			.await;

		match sampled {
			Ok(values) => suggest::rank_suggestions(values, self.cfg.suggest.top_k as usize),
			Err(err) => {
				tracing::warn!(error = %err, field = ?field, prefix, "Suggestion lookup failed.");

				Vec::new()
			},
		}
	}
}
