use serde::Serialize;
use time::OffsetDateTime;

use crate::{Identity, Result, TenderEngine, lock, now};
use tender_domain::{fields, normalize};
use tender_storage::models::ShortlistEntry;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileSkip {
	Unauthenticated,
	/// A toggle was in flight or cooling down.
	SyncInFlight,
	QueryError,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct ReconcileReport {
	pub skipped: Option<ReconcileSkip>,
	/// Ids in the local cache after reconciliation.
	pub kept: Vec<String>,
	/// Entries whose listing no longer exists.
	pub vanished: Vec<String>,
	/// Entries whose deadline has passed.
	pub expired: Vec<String>,
	pub remote_deleted: u64,
	/// False when the local cache was left untouched.
	pub local_replaced: bool,
}
impl ReconcileReport {
	fn skipped(reason: ReconcileSkip) -> Self {
		Self { skipped: Some(reason), ..Self::default() }
	}
}

#[derive(Debug, Default)]
struct Classified {
	live: Vec<String>,
	vanished: Vec<String>,
	expired: Vec<String>,
}

impl TenderEngine {
	/// Replaces the local shortlist with the live subset of the authoritative one and deletes
	/// stale entries remotely. Safe to repeat.
	pub async fn reconcile(&self) -> ReconcileReport {
		let identity = match self.resolve_identity().await {
			Ok(Some(identity)) => identity,
			Ok(None) => return ReconcileReport::skipped(ReconcileSkip::Unauthenticated),
			Err(err) => {
				tracing::warn!(error = %err, "Identity lookup failed during reconciliation.");

				return ReconcileReport::skipped(ReconcileSkip::QueryError);
			},
		};

		let generation = {
			let mut gate = lock(&self.gate);

			if !gate.is_read_safe(now()) {
				tracing::debug!("Reconciliation skipped while a toggle is syncing.");

				return ReconcileReport::skipped(ReconcileSkip::SyncInFlight);
			}

			gate.generation()
		};

		let entries = match self.fetch_authoritative(identity).await {
			Ok(entries) => entries,
			Err(err) => {
				tracing::warn!(error = %err, "Failed to fetch the authoritative shortlist.");

				return ReconcileReport::skipped(ReconcileSkip::QueryError);
			},
		};
		let classified = classify(&entries, OffsetDateTime::now_utc(), self.local_offset);
		let stale: Vec<String> =
			classified.vanished.iter().chain(&classified.expired).cloned().collect();
		let mut report = ReconcileReport {
			skipped: None,
			kept: classified.live.clone(),
			vanished: classified.vanished,
			expired: classified.expired,
			remote_deleted: 0,
			local_replaced: false,
		};

		if !stale.is_empty() {
			match self.collaborators.backend.delete_shortlists(identity.user_id, &stale).await {
				Ok(deleted) => report.remote_deleted = deleted,
				Err(err) => {
					tracing::warn!(
						error = %err,
						stale = stale.len(),
						"Failed to delete stale shortlist entries; retrying on next reconciliation."
					);
				},
			}
		}

		{
			let mut curation = lock(&self.curation);
			// Any toggle since the gate check owns the local set, even one that already settled.
			let untouched = {
				let mut gate = lock(&self.gate);

				gate.is_read_safe(now()) && gate.generation() == generation
			};

			if !untouched {
				tracing::debug!(
					"Local shortlist left untouched; a toggle started mid-reconciliation."
				);

				report.skipped = Some(ReconcileSkip::SyncInFlight);
				report.kept = curation.all_ids();

				return report;
			}

			curation.replace_all(classified.live);
			curation.persist();
		}

		report.local_replaced = true;

		tracing::info!(
			kept = report.kept.len(),
			vanished = report.vanished.len(),
			expired = report.expired.len(),
			remote_deleted = report.remote_deleted,
			"Shortlist reconciled."
		);

		report
	}

	async fn fetch_authoritative(&self, identity: Identity) -> Result<Vec<ShortlistEntry>> {
		let page_size = self.cfg.shortlist.reconcile_page_size.max(1);
		let mut entries = Vec::new();
		let mut offset: u32 = 0;

		loop {
			let page =
				self.collaborators.backend.shortlisted(identity.user_id, page_size, offset).await?;
			let fetched = page.rows.len();

			entries.extend(page.rows);

			if fetched == 0 || entries.len() as u64 >= page.total {
				break;
			}

			offset = offset.saturating_add(fetched as u32);
		}

		Ok(entries)
	}
}

fn classify(
	entries: &[ShortlistEntry],
	now: OffsetDateTime,
	local_offset: time::UtcOffset,
) -> Classified {
	let mut classified = Classified::default();

	for entry in entries {
		let id = entry.tender_id.trim().to_string();

		if id.is_empty() {
			continue;
		}

		match entry.tender.as_ref().and_then(|tender| tender.as_object()) {
			None => classified.vanished.push(id),
			Some(row) => match normalize::timestamp(row, &fields::DEADLINE, local_offset) {
				Some(deadline) if deadline < now => classified.expired.push(id),
				_ => classified.live.push(id),
			},
		}
	}

	classified
}
