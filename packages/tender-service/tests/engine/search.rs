use std::time::Duration as StdDuration;

use serde_json::{Value, json};
use time::Duration;
use uuid::Uuid;

use tender_domain::{
	EmdFilter, QueryParams, ReverseAuctionFilter, SortKey, SourceSelector, StatusFilter,
	TenderStatus,
};
use tender_service::SearchResponse;
use tender_testkit::{Failure, Op};

use super::{Harness, from_now, harness, harness_with, ids, listing, test_config, with};

fn params() -> tender_domain::QueryParamsBuilder {
	QueryParams::builder()
}

fn shortlisted() -> QueryParams {
	params().status(StatusFilter::Shortlisted).build().expect("Valid params.")
}

#[tokio::test]
async fn standard_path_paginates() {
	let h = harness((1..=45).map(listing).collect());
	let response =
		h.engine.search(&params().page(3).page_size(20).build().expect("Valid params.")).await;

	assert_eq!(response.total, 45);
	assert_eq!(response.total_pages, 3);
	assert_eq!(response.page, 3);
	assert_eq!(ids(&response), vec!["41", "42", "43", "44", "45"]);

	let query = h.backend.last_query().expect("A query must have run.");

	assert_eq!((query.range.from, query.range.to), (40, 59));
}

#[tokio::test]
async fn page_size_is_clamped_to_the_configured_maximum() {
	let h = harness(vec![listing(1)]);
	let response =
		h.engine.search(&params().page_size(5_000).build().expect("Valid params.")).await;

	assert_eq!(response.page_size, 100);

	let response = h.engine.search(&params().build().expect("Valid params.")).await;

	assert_eq!(response.page_size, 20);
}

#[tokio::test]
async fn rows_are_normalized_with_membership() {
	let h = harness(vec![
		with(listing(1), "bid_end_datetime", json!("2025-03-10 14:30")),
		listing(2),
	]);

	h.engine.toggle("2").await;

	let response =
		h.engine.search(&params().sort(SortKey::ValueHigh).build().expect("Valid params.")).await;
	let first = &response.rows[0];
	let deadline = first.deadline.expect("Deadline must parse.");

	assert_eq!(first.id, "1");
	assert_eq!(first.title.as_deref(), Some("Item 1"));
	assert_eq!((deadline.hour(), deadline.minute()), (14, 30));
	assert_eq!(deadline.offset().whole_minutes(), 330);
	assert!(!first.is_shortlisted);
	assert!(response.rows[1].is_shortlisted);
}

#[tokio::test(start_paused = true)]
async fn shortlist_reads_wait_for_the_cooldown() {
	let h = harness(vec![listing(1), listing(2), listing(3)]);

	h.engine.toggle("3").await;

	let suppressed = h.engine.search(&shortlisted()).await;

	assert!(suppressed.rows.is_empty());
	assert_eq!(h.backend.calls(Op::FetchPage), 0);

	tokio::time::advance(StdDuration::from_millis(700)).await;

	let response = h.engine.search(&shortlisted()).await;

	assert_eq!(ids(&response), vec!["3"]);
	assert!(response.rows[0].is_shortlisted);
	assert_eq!(h.backend.calls(Op::FetchPage), 1);
}

#[tokio::test(start_paused = true)]
async fn shortlist_reads_are_suppressed_while_a_toggle_is_in_flight() {
	let h = harness(vec![listing(1)]);

	h.backend.set_delay(Op::InsertShortlist, Some(StdDuration::from_secs(1)));

	let (_, during) = tokio::join!(h.engine.toggle("1"), async {
		tokio::time::sleep(StdDuration::from_millis(100)).await;

		h.engine.search(&shortlisted()).await
	});

	assert!(during.rows.is_empty());
	assert_eq!(h.backend.calls(Op::FetchPage), 0);
}

#[tokio::test]
async fn empty_shortlist_skips_the_backing_store() {
	let h = harness(vec![listing(1)]);
	let response = h.engine.search(&shortlisted()).await;

	assert!(response.rows.is_empty());
	assert_eq!(response.total, 0);
	assert_eq!(h.backend.calls(Op::FetchPage), 0);
}

fn sourced(id: i64, source: &str) -> Value {
	with(listing(id), "source", json!(source))
}

#[tokio::test]
async fn recommendations_are_scoped_per_source_and_cached() {
	let h = harness(vec![
		sourced(1, "gem"),
		sourced(2, "gem"),
		sourced(3, "cpwd"),
		sourced(4, "cpwd"),
	]);
	let recommended = params().recommendations_only(true).build().expect("Valid params.");

	h.backend.recommend(h.user, 1, "gem");
	h.backend.recommend(h.user, 4, "cpwd");
	// Id 2 exists only under the primary feed.
	h.backend.recommend(h.user, 2, "cpwd");

	let first = h.engine.search(&recommended).await;
	let mut found = ids(&first);

	found.sort();

	assert_eq!(found, vec!["1", "4"]);

	h.engine.search(&recommended).await;

	assert_eq!(h.backend.calls(Op::Recommended), 1);
}

#[tokio::test]
async fn identity_change_refetches_recommendations() {
	let h = harness(vec![sourced(1, "gem"), sourced(2, "gem")]);
	let recommended = params().recommendations_only(true).build().expect("Valid params.");
	let other = Uuid::new_v4();

	h.backend.recommend(h.user, 1, "gem");
	h.backend.recommend(other, 2, "gem");

	assert_eq!(ids(&h.engine.search(&recommended).await), vec!["1"]);

	h.identity.sign_in(other);

	assert_eq!(ids(&h.engine.search(&recommended).await), vec!["2"]);
	assert_eq!(h.backend.calls(Op::Recommended), 2);
}

#[tokio::test]
async fn signed_out_recommendations_are_empty() {
	let h = harness(vec![listing(1)]);

	h.identity.sign_out();

	let response =
		h.engine.search(&params().recommendations_only(true).build().expect("Valid params.")).await;

	assert!(response.rows.is_empty());
	assert_eq!(h.backend.calls(Op::Recommended), 0);
	assert_eq!(h.backend.calls(Op::FetchPage), 0);
}

#[tokio::test]
async fn empty_recommendation_set_skips_the_record_query() {
	let h = harness(vec![listing(1)]);
	let response =
		h.engine.search(&params().recommendations_only(true).build().expect("Valid params.")).await;

	assert!(response.rows.is_empty());
	assert_eq!(h.backend.calls(Op::Recommended), 1);
	assert_eq!(h.backend.calls(Op::FetchPage), 0);
}

async fn search_status(h: &Harness, status: StatusFilter) -> SearchResponse {
	let params =
		params().status(status).sort(SortKey::DeadlineSoonest).build().expect("Valid params.");

	h.engine.search(&params).await
}

#[tokio::test]
async fn status_facets_partition_by_deadline() {
	let h = harness(vec![
		with(listing(1), "bid_end_datetime", from_now(-Duration::days(1))),
		with(listing(2), "bid_end_datetime", from_now(Duration::days(2))),
		with(listing(3), "bid_end_datetime", from_now(Duration::days(30))),
		listing(4),
	]);
	let closed = search_status(&h, StatusFilter::Closed).await;
	let closing = search_status(&h, StatusFilter::ClosingSoon).await;
	let active = search_status(&h, StatusFilter::Active).await;
	let all = search_status(&h, StatusFilter::All).await;

	assert_eq!(ids(&closed), vec!["1"]);
	assert_eq!(closed.rows[0].status, TenderStatus::Closed);
	assert_eq!(ids(&closing), vec!["2"]);
	assert_eq!(closing.rows[0].status, TenderStatus::ClosingSoon);
	assert_eq!(ids(&active), vec!["3", "4"]);
	assert!(active.rows.iter().all(|tender| tender.status == TenderStatus::Active));
	assert_eq!(ids(&all), vec!["1", "2", "3", "4"]);
}

#[tokio::test]
async fn status_facets_read_legacy_deadline_columns() {
	let h = harness(vec![
		with(listing(1), "end_datetime", from_now(-Duration::days(1))),
		with(
			with(listing(2), "bid_end_datetime", json!("TBD")),
			"closing_datetime",
			from_now(Duration::days(2)),
		),
		with(listing(3), "bid_end", from_now(Duration::days(30))),
	]);
	let closed = search_status(&h, StatusFilter::Closed).await;
	let closing = search_status(&h, StatusFilter::ClosingSoon).await;
	let active = search_status(&h, StatusFilter::Active).await;
	let all = search_status(&h, StatusFilter::All).await;

	assert_eq!(ids(&closed), vec!["1"]);
	assert_eq!(closed.rows[0].status, TenderStatus::Closed);
	assert_eq!(ids(&closing), vec!["2"]);
	assert_eq!(closing.rows[0].status, TenderStatus::ClosingSoon);
	assert_eq!(ids(&active), vec!["3"]);
	assert_eq!(active.rows[0].status, TenderStatus::Active);
	assert_eq!(ids(&all), vec!["1", "2", "3"]);
}

#[tokio::test]
async fn negative_facets_include_missing_values() {
	let h = harness(vec![
		with(listing(1), "emd_amount", json!(null)),
		with(listing(2), "emd_amount", json!(0)),
		with(listing(3), "emd_amount", json!(5000)),
		listing(4),
	]);
	let not_required = h
		.engine
		.search(&params().emd(EmdFilter::NotRequired).build().expect("Valid params."))
		.await;
	let required =
		h.engine.search(&params().emd(EmdFilter::Required).build().expect("Valid params.")).await;

	assert_eq!(ids(&not_required), vec!["1", "2", "4"]);
	assert_eq!(ids(&required), vec!["3"]);

	let h = harness(vec![
		with(listing(1), "bid_to_ra_enabled", json!(true)),
		with(listing(2), "bid_to_ra_enabled", json!(false)),
		listing(3),
	]);
	let disabled = h
		.engine
		.search(
			&params()
				.reverse_auction(ReverseAuctionFilter::Disabled)
				.build()
				.expect("Valid params."),
		)
		.await;

	assert_eq!(ids(&disabled), vec!["2", "3"]);
}

#[tokio::test]
async fn source_selector_treats_missing_source_as_primary() {
	let mut legacy = listing(3);

	legacy.as_object_mut().expect("Listing is an object.").remove("source");

	let h = harness(vec![sourced(1, "gem"), sourced(2, "cpwd"), legacy]);
	let primary = h
		.engine
		.search(&params().source(SourceSelector::Primary).build().expect("Valid params."))
		.await;
	let secondary = h
		.engine
		.search(&params().source(SourceSelector::Secondary).build().expect("Valid params."))
		.await;

	assert_eq!(ids(&primary), vec!["1", "3"]);
	assert_eq!(ids(&secondary), vec!["2"]);
}

#[tokio::test]
async fn free_text_searches_discovered_columns_once() {
	let h = harness(vec![
		with(listing(1), "ministry", json!("Ministry of Railways")),
		with(listing(2), "ministry", json!("Ministry of Coal")),
		with(listing(3), "item_title", json!("Rail clamps")),
	]);
	let term = params().search("rail").build().expect("Valid params.");

	assert_eq!(ids(&h.engine.search(&term).await), vec!["1", "3"]);
	assert_eq!(ids(&h.engine.search(&term).await), vec!["1", "3"]);
	assert_eq!(h.backend.calls(Op::TextColumns), 1);

	h.engine.text_columns().invalidate();
	h.engine.search(&term).await;

	assert_eq!(h.backend.calls(Op::TextColumns), 2);
}

#[tokio::test]
async fn discovery_failure_falls_back_to_canonical_columns() {
	let h = harness(vec![with(listing(1), "ministry", json!("Ministry of Railways"))]);

	h.backend.fail_next(Op::TextColumns, Failure::Server);

	let response =
		h.engine.search(&params().search("railways").build().expect("Valid params.")).await;

	assert_eq!(ids(&response), vec!["1"]);
	assert!(!h.engine.text_columns().is_cached());
}

#[tokio::test]
async fn backing_store_failure_yields_an_empty_page() {
	let h = harness(vec![listing(1)]);

	h.backend.fail_next(Op::FetchPage, Failure::Server);

	let response = h.engine.search(&params().page(2).build().expect("Valid params.")).await;

	assert!(response.rows.is_empty());
	assert_eq!(response.total, 0);
	assert_eq!(response.page, 2);

	let recovered = h.engine.search(&params().build().expect("Valid params.")).await;

	assert_eq!(ids(&recovered), vec!["1"]);
}

#[tokio::test]
async fn estimated_count_mode_reaches_the_query() {
	let mut cfg = test_config();

	cfg.search.count_mode = "estimated".to_string();

	let h = harness_with(cfg, vec![listing(1)]);

	h.engine.search(&params().build().expect("Valid params.")).await;

	let query = h.backend.last_query().expect("A query must have run.");

	assert_eq!(query.count, tender_domain::CountMode::Estimated);
}
