use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use crate::fields;

/// Prefixes shorter than this never reach the backing store.
pub const MIN_SUGGEST_PREFIX_CHARS: usize = 2;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestField {
	Ministry,
	Department,
	Organization,
}
impl SuggestField {
	pub fn column(self) -> &'static str {
		match self {
			Self::Ministry => fields::MINISTRY.primary(),
			Self::Department => fields::DEPARTMENT.primary(),
			Self::Organization => fields::ORGANIZATION_NAME.primary(),
		}
	}
}

pub fn prefix_is_searchable(prefix: &str) -> bool {
	prefix.trim().chars().count() >= MIN_SUGGEST_PREFIX_CHARS
}

/// Grouping key: NFKC, case-folded, whitespace collapsed.
pub fn suggestion_key(value: &str) -> String {
	let folded: String = value.nfkc().collect::<String>().to_lowercase();

	folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Ranks sampled values by descending frequency.
///
/// Values are grouped by [`suggestion_key`] and displayed with the spelling seen first. Equal
/// counts keep first-seen order, so the output depends only on the sample order.
pub fn rank_suggestions<I, S>(values: I, top_k: usize) -> Vec<String>
where
	I: IntoIterator<Item = S>,
	S: AsRef<str>,
{
	let mut index: HashMap<String, usize> = HashMap::new();
	let mut groups: Vec<(String, usize)> = Vec::new();

	for value in values {
		let display = value.as_ref().split_whitespace().collect::<Vec<_>>().join(" ");

		if display.is_empty() {
			continue;
		}

		let key = suggestion_key(&display);

		match index.get(&key) {
			Some(&slot) => groups[slot].1 += 1,
			None => {
				index.insert(key, groups.len());
				groups.push((display, 1));
			},
		}
	}

	// Stable sort keeps first-seen order among equal counts.
	groups.sort_by(|a, b| b.1.cmp(&a.1));
	groups.into_iter().take(top_k).map(|(display, _)| display).collect()
}
