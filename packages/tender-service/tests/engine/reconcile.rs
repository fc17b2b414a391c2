use std::time::Duration as StdDuration;

use serde_json::json;
use time::Duration;

use tender_domain::GatePhase;
use tender_service::ReconcileSkip;
use tender_testkit::{Failure, Op};

use super::{Harness, STORAGE_KEY, from_now, harness, harness_with, listing, test_config, with};

/// Remote shortlist with one live, one expired and one vanished entry.
fn seeded() -> Harness {
	let h = harness(vec![
		with(listing(1), "bid_end_datetime", from_now(Duration::days(10))),
		with(listing(2), "bid_end_datetime", from_now(-Duration::hours(1))),
	]);

	for id in ["1", "2", "3"] {
		h.backend.seed_shortlist(h.user, id);
	}

	h
}

#[tokio::test(start_paused = true)]
async fn removes_expired_and_vanished_entries() {
	let h = seeded();

	h.store.insert_raw(STORAGE_KEY, r#"["1","2","3","9"]"#);

	let engine = h.restart();
	let report = engine.reconcile().await;

	assert_eq!(report.skipped, None);
	assert_eq!(report.kept, vec!["1"]);
	assert_eq!(report.expired, vec!["2"]);
	assert_eq!(report.vanished, vec!["3"]);
	assert_eq!(report.remote_deleted, 2);
	assert!(report.local_replaced);
	assert_eq!(engine.shortlisted_ids(), vec!["1"]);
	assert_eq!(h.backend.shortlist_of(h.user), vec!["1"]);
	assert_eq!(h.store.raw(STORAGE_KEY), Some(r#"["1"]"#.to_string()));
}

#[tokio::test(start_paused = true)]
async fn reconciliation_is_idempotent() {
	let h = seeded();
	let first = h.engine.reconcile().await;
	let second = h.engine.reconcile().await;

	assert_eq!(first.kept, second.kept);
	assert_eq!(second.remote_deleted, 0);
	assert!(second.expired.is_empty());
	assert!(second.vanished.is_empty());
	assert_eq!(h.backend.calls(Op::DeleteShortlists), 1);
}

#[tokio::test(start_paused = true)]
async fn signed_out_reconciliation_is_a_no_op() {
	let h = seeded();

	h.store.insert_raw(STORAGE_KEY, r#"["2"]"#);
	h.identity.sign_out();

	let engine = h.restart();
	let report = engine.reconcile().await;

	assert_eq!(report.skipped, Some(ReconcileSkip::Unauthenticated));
	assert_eq!(engine.shortlisted_ids(), vec!["2"]);
	assert_eq!(h.backend.calls(Op::Shortlisted), 0);
}

#[tokio::test(start_paused = true)]
async fn reconciliation_waits_for_pending_toggles() {
	let h = seeded();

	h.engine.toggle("1").await;

	let report = h.engine.reconcile().await;

	assert_eq!(report.skipped, Some(ReconcileSkip::SyncInFlight));
	assert!(!report.local_replaced);
	assert_eq!(h.backend.calls(Op::Shortlisted), 0);

	tokio::time::advance(StdDuration::from_millis(700)).await;

	let report = h.engine.reconcile().await;

	assert_eq!(report.skipped, None);
}

#[tokio::test(start_paused = true)]
async fn toggle_started_mid_fetch_keeps_the_local_set() {
	let h = seeded();

	h.backend.push_row(listing(7));
	h.backend.set_delay(Op::Shortlisted, Some(StdDuration::from_millis(100)));

	let (report, outcome) = tokio::join!(h.engine.reconcile(), async {
		tokio::time::sleep(StdDuration::from_millis(10)).await;

		h.engine.toggle("7").await
	});

	assert!(outcome.persisted);
	assert_eq!(report.skipped, Some(ReconcileSkip::SyncInFlight));
	assert!(!report.local_replaced);
	assert_eq!(report.kept, vec!["7"]);
	assert_eq!(report.remote_deleted, 2);
	assert!(h.engine.is_shortlisted("7"));
	assert_eq!(h.backend.shortlist_of(h.user), vec!["1", "7"]);
}

#[tokio::test(start_paused = true)]
async fn toggle_settled_during_a_slow_delete_keeps_the_local_set() {
	let h = seeded();

	h.backend.push_row(listing(7));
	h.backend.set_delay(Op::DeleteShortlists, Some(StdDuration::from_secs(2)));

	let (report, outcome) = tokio::join!(h.engine.reconcile(), async {
		tokio::time::sleep(StdDuration::from_millis(10)).await;

		h.engine.toggle("7").await
	});

	assert!(outcome.persisted);
	assert_eq!(h.engine.gate_phase(), GatePhase::Idle);
	assert_eq!(report.skipped, Some(ReconcileSkip::SyncInFlight));
	assert!(!report.local_replaced);
	assert_eq!(report.kept, vec!["7"]);
	assert_eq!(report.remote_deleted, 2);
	assert!(h.engine.is_shortlisted("7"));
	assert_eq!(h.backend.shortlist_of(h.user), vec!["1", "7"]);

	let next = h.engine.reconcile().await;

	assert!(next.local_replaced);
	assert_eq!(h.engine.shortlisted_ids(), vec!["1", "7"]);
}

#[tokio::test(start_paused = true)]
async fn pages_through_the_authoritative_shortlist() {
	let mut cfg = test_config();

	cfg.shortlist.reconcile_page_size = 2;

	let h = harness_with(cfg, (1..=5).map(listing).collect());

	for id in 1..=5 {
		h.backend.seed_shortlist(h.user, &id.to_string());
	}

	let report = h.engine.reconcile().await;

	assert_eq!(report.kept, vec!["1", "2", "3", "4", "5"]);
	assert_eq!(h.backend.calls(Op::Shortlisted), 3);
	assert_eq!(h.engine.shortlisted_ids().len(), 5);
}

#[tokio::test(start_paused = true)]
async fn fetch_failure_leaves_local_state_untouched() {
	let h = seeded();

	h.store.insert_raw(STORAGE_KEY, r#"["2","3"]"#);

	let engine = h.restart();

	h.backend.fail_next(Op::Shortlisted, Failure::Transport);

	let report = engine.reconcile().await;

	assert_eq!(report.skipped, Some(ReconcileSkip::QueryError));
	assert_eq!(engine.shortlisted_ids(), vec!["2", "3"]);
	assert_eq!(h.backend.calls(Op::DeleteShortlists), 0);
}

#[tokio::test(start_paused = true)]
async fn remote_delete_failure_still_prunes_locally() {
	let h = seeded();

	h.backend.fail_next(Op::DeleteShortlists, Failure::Server);

	let report = h.engine.reconcile().await;

	assert_eq!(report.remote_deleted, 0);
	assert!(report.local_replaced);
	assert_eq!(h.engine.shortlisted_ids(), vec!["1"]);
	assert_eq!(h.backend.shortlist_of(h.user), vec!["1", "2", "3"]);
	assert_eq!(json!(report.expired), json!(["2"]));
}
