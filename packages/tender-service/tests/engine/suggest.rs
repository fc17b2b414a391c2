use serde_json::json;

use tender_domain::SuggestField;
use tender_testkit::{Failure, Op};

use super::{harness, harness_with, listing, test_config, with};

fn ministries(values: &[&str]) -> Vec<serde_json::Value> {
	values
		.iter()
		.enumerate()
		.map(|(idx, ministry)| with(listing(idx as i64 + 1), "ministry", json!(ministry)))
		.collect()
}

#[tokio::test]
async fn ranks_sampled_values_by_frequency() {
	let h = harness(ministries(&["Ministry X", "Ministry X", "Ministry Y", "Defence"]));
	let suggestions = h.engine.suggest(SuggestField::Ministry, "mi").await;

	assert_eq!(suggestions, vec!["Ministry X", "Ministry Y"]);
}

#[tokio::test]
async fn short_prefixes_skip_the_backing_store() {
	let h = harness(ministries(&["Ministry X"]));

	assert!(h.engine.suggest(SuggestField::Ministry, " m ").await.is_empty());
	assert_eq!(h.backend.calls(Op::SampleValues), 0);
}

#[tokio::test]
async fn respects_top_k() {
	let mut cfg = test_config();

	cfg.suggest.top_k = 1;

	let h = harness_with(cfg, ministries(&["Ministry Y", "Ministry X", "Ministry X"]));

	assert_eq!(h.engine.suggest(SuggestField::Ministry, "Min").await, vec!["Ministry X"]);
}

#[tokio::test]
async fn lookup_failure_yields_no_suggestions() {
	let h = harness(ministries(&["Ministry X"]));

	h.backend.fail_next(Op::SampleValues, Failure::Transport);

	assert!(h.engine.suggest(SuggestField::Ministry, "Mi").await.is_empty());
	assert_eq!(h.engine.suggest(SuggestField::Ministry, "Mi").await, vec!["Ministry X"]);
}
