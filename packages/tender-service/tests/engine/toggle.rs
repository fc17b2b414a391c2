use std::time::Duration;

use tender_domain::GatePhase;
use tender_service::{ToggleOutcome, ToggleReason};
use tender_testkit::{Failure, Op};

use super::{STORAGE_KEY, harness, listing};

#[tokio::test(start_paused = true)]
async fn toggle_twice_restores_membership() {
	let h = harness(vec![listing(7)]);
	let added = h.engine.toggle("7").await;

	assert_eq!(added, ToggleOutcome { persisted: true, reason: None, shortlisted: true });
	assert!(h.engine.is_shortlisted("7"));
	assert_eq!(h.backend.shortlist_of(h.user), vec!["7".to_string()]);

	let removed = h.engine.toggle("7").await;

	assert_eq!(removed, ToggleOutcome { persisted: true, reason: None, shortlisted: false });
	assert!(!h.engine.is_shortlisted("7"));
	assert!(h.backend.shortlist_of(h.user).is_empty());
	assert_eq!(h.backend.calls(Op::InsertShortlist), 1);
	assert_eq!(h.backend.calls(Op::DeleteShortlist), 1);
}

#[tokio::test(start_paused = true)]
async fn existing_remote_entry_counts_as_added() {
	let h = harness(vec![listing(7)]);

	h.backend.seed_shortlist(h.user, "7");

	let outcome = h.engine.toggle("7").await;

	assert!(outcome.persisted);
	assert_eq!(outcome.reason, None);
	assert!(h.engine.is_shortlisted("7"));
}

#[tokio::test(start_paused = true)]
async fn injected_unique_violation_counts_as_added() {
	let h = harness(vec![listing(7)]);

	h.backend.fail_next(Op::InsertShortlist, Failure::Conflict);

	let outcome = h.engine.toggle("7").await;

	assert!(outcome.persisted);
	assert!(h.engine.is_shortlisted("7"));
}

#[tokio::test(start_paused = true)]
async fn rejected_add_is_rolled_back() {
	let h = harness(vec![listing(7)]);

	h.backend.fail_next(Op::InsertShortlist, Failure::Server);

	let outcome = h.engine.toggle("7").await;

	assert_eq!(
		outcome,
		ToggleOutcome {
			persisted: false,
			reason: Some(ToggleReason::ServerErrorAdd),
			shortlisted: false,
		}
	);
	assert!(!h.engine.is_shortlisted("7"));
	assert_eq!(h.store.raw(STORAGE_KEY), Some("[]".to_string()));
}

#[tokio::test(start_paused = true)]
async fn rejected_remove_is_rolled_back() {
	let h = harness(vec![listing(7)]);

	assert!(h.engine.toggle("7").await.persisted);

	h.backend.fail_next(Op::DeleteShortlist, Failure::Server);

	let outcome = h.engine.toggle("7").await;

	assert_eq!(outcome.reason, Some(ToggleReason::ServerErrorRemove));
	assert!(outcome.shortlisted);
	assert!(h.engine.is_shortlisted("7"));
	assert_eq!(h.store.raw(STORAGE_KEY), Some("[\"7\"]".to_string()));
}

#[tokio::test(start_paused = true)]
async fn transport_failure_keeps_optimistic_state() {
	let h = harness(vec![listing(7)]);

	h.backend.fail_next(Op::InsertShortlist, Failure::Transport);

	let outcome = h.engine.toggle("7").await;

	assert_eq!(outcome.reason, Some(ToggleReason::Unexpected));
	assert!(!outcome.persisted);
	assert!(h.engine.is_shortlisted("7"));
}

#[tokio::test(start_paused = true)]
async fn pool_timeout_rolls_back_the_add() {
	let h = harness(vec![listing(7)]);

	h.backend.fail_next(Op::InsertShortlist, Failure::PoolTimedOut);

	let outcome = h.engine.toggle("7").await;

	assert_eq!(
		outcome,
		ToggleOutcome {
			persisted: false,
			reason: Some(ToggleReason::ServerErrorAdd),
			shortlisted: false,
		}
	);
	assert!(!h.engine.is_shortlisted("7"));
	assert!(h.backend.shortlist_of(h.user).is_empty());
	assert_eq!(h.store.raw(STORAGE_KEY), Some("[]".to_string()));
}

#[tokio::test(start_paused = true)]
async fn pool_timeout_rolls_back_the_remove() {
	let h = harness(vec![listing(7)]);

	assert!(h.engine.toggle("7").await.persisted);

	h.backend.fail_next(Op::DeleteShortlist, Failure::PoolTimedOut);

	let outcome = h.engine.toggle("7").await;

	assert_eq!(outcome.reason, Some(ToggleReason::ServerErrorRemove));
	assert!(outcome.shortlisted);
	assert!(h.engine.is_shortlisted("7"));
}

#[tokio::test(start_paused = true)]
async fn identity_failure_keeps_optimistic_state() {
	let h = harness(vec![listing(7)]);

	h.identity.set_failing(true);

	let outcome = h.engine.toggle("7").await;

	assert_eq!(outcome.reason, Some(ToggleReason::Unexpected));
	assert!(h.engine.is_shortlisted("7"));
	assert_eq!(h.backend.calls(Op::InsertShortlist), 0);
}

#[tokio::test(start_paused = true)]
async fn signed_out_toggle_stays_local() {
	let h = harness(vec![listing(7)]);

	h.identity.sign_out();

	let outcome = h.engine.toggle("7").await;

	assert_eq!(
		outcome,
		ToggleOutcome {
			persisted: false,
			reason: Some(ToggleReason::Unauthenticated),
			shortlisted: true,
		}
	);
	assert!(h.engine.is_shortlisted("7"));
	assert_eq!(h.backend.calls(Op::InsertShortlist), 0);
	assert!(h.restart().is_shortlisted("7"));
}

#[tokio::test(start_paused = true)]
async fn local_store_failure_does_not_block_the_toggle() {
	let h = harness(vec![listing(7)]);

	h.store.set_fail_writes(true);

	let outcome = h.engine.toggle("7").await;

	assert!(outcome.persisted);
	assert!(h.engine.is_shortlisted("7"));
	assert_eq!(h.store.raw(STORAGE_KEY), None);
}

#[tokio::test(start_paused = true)]
async fn blank_id_is_rejected_without_side_effects() {
	let h = harness(vec![]);
	let outcome = h.engine.toggle("  ").await;

	assert_eq!(outcome.reason, Some(ToggleReason::Unexpected));
	assert!(h.engine.shortlisted_ids().is_empty());
	assert_eq!(h.engine.gate_phase(), GatePhase::Idle);
}

#[tokio::test(start_paused = true)]
async fn gate_cools_down_after_a_toggle() {
	let h = harness(vec![listing(7)]);

	h.engine.toggle("7").await;

	assert_eq!(h.engine.gate_phase(), GatePhase::Cooldown);

	tokio::time::advance(Duration::from_millis(699)).await;

	assert_eq!(h.engine.gate_phase(), GatePhase::Cooldown);

	tokio::time::advance(Duration::from_millis(1)).await;

	assert_eq!(h.engine.gate_phase(), GatePhase::Idle);
}

#[tokio::test(start_paused = true)]
async fn slow_write_extends_the_cooldown_by_the_settle_window() {
	let h = harness(vec![listing(7)]);

	h.backend.set_delay(Op::InsertShortlist, Some(Duration::from_secs(2)));
	h.engine.toggle("7").await;

	assert_eq!(h.engine.gate_phase(), GatePhase::Cooldown);

	tokio::time::advance(Duration::from_millis(300)).await;

	assert_eq!(h.engine.gate_phase(), GatePhase::Idle);
}
