//! Optimistic shortlist toggle with server confirmation.
//!
//! A toggle flips local membership first so the UI reacts immediately, then writes the change
//! to the backing store. A definite server rejection undoes the flip; an ambiguous failure keeps
//! it and leaves the next reconciliation to settle the truth. While any toggle is in flight the
//! sync gate suppresses shortlist reads, which would otherwise race replication.

use std::sync::Mutex;

use serde::Serialize;

use crate::{
	Error, Identity, LocalCurationCache, Result, TenderBackend, TenderEngine, lock, now,
};
use tender_domain::SyncGate;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToggleReason {
	Unauthenticated,
	ServerErrorAdd,
	ServerErrorRemove,
	Unexpected,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct ToggleOutcome {
	/// True when the backing store confirmed the change.
	pub persisted: bool,
	pub reason: Option<ToggleReason>,
	/// Local membership after the toggle settled.
	pub shortlisted: bool,
}
impl ToggleOutcome {
	fn persisted(shortlisted: bool) -> Self {
		Self { persisted: true, reason: None, shortlisted }
	}

	fn local_only(reason: ToggleReason, shortlisted: bool) -> Self {
		Self { persisted: false, reason: Some(reason), shortlisted }
	}
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToggleDirection {
	Add,
	Remove,
}

/// Membership before an optimistic flip. Consumed by [`ShortlistToggle::undo`].
#[derive(Debug)]
#[must_use]
pub struct UndoToken {
	id: String,
	was_member: bool,
}
impl UndoToken {
	pub fn id(&self) -> &str {
		&self.id
	}

	pub fn direction(&self) -> ToggleDirection {
		if self.was_member { ToggleDirection::Remove } else { ToggleDirection::Add }
	}
}

/// One toggle of one tender id, split into its local and remote halves.
pub struct ShortlistToggle {
	id: String,
}
impl ShortlistToggle {
	pub fn new(id: impl Into<String>) -> Self {
		Self { id: id.into() }
	}

	/// Flips membership and persists it locally.
	pub fn apply(&self, cache: &mut LocalCurationCache) -> UndoToken {
		let was_member = cache.has(&self.id);

		if was_member {
			cache.remove(&self.id);
		} else {
			cache.add(&self.id);
		}

		cache.persist();

		UndoToken { id: self.id.clone(), was_member }
	}

	/// Writes the flip to the backing store. An add that already exists counts as done.
	pub async fn commit_remote(
		&self,
		backend: &dyn TenderBackend,
		identity: Identity,
		token: &UndoToken,
	) -> Result<()> {
		match token.direction() {
			ToggleDirection::Add => match backend.insert_shortlist(identity.user_id, &self.id).await
			{
				Err(Error::Conflict { .. }) => {
					tracing::debug!(tender_id = %self.id, "Tender was already shortlisted remotely.");

					Ok(())
				},
				other => other,
			},
			ToggleDirection::Remove => backend.delete_shortlist(identity.user_id, &self.id).await,
		}
	}

	/// Restores membership from before [`ShortlistToggle::apply`].
	///
	/// A no-op when the id was flipped again in the meantime.
	pub fn undo(&self, cache: &mut LocalCurationCache, token: UndoToken) {
		if cache.has(&token.id) == token.was_member {
			return;
		}

		if token.was_member {
			cache.add(&token.id);
		} else {
			cache.remove(&token.id);
		}

		cache.persist();
	}
}

/// Holds the sync gate in `Syncing` for the lifetime of one toggle.
struct SyncTicket<'a> {
	gate: &'a Mutex<SyncGate>,
}
impl<'a> SyncTicket<'a> {
	fn enter(gate: &'a Mutex<SyncGate>) -> Self {
		lock(gate).begin(now());

		Self { gate }
	}
}
impl Drop for SyncTicket<'_> {
	fn drop(&mut self) {
		lock(self.gate).finish(now());
	}
}

impl TenderEngine {
	/// Toggles shortlist membership of `id`. Never fails; the outcome says what stuck.
	pub async fn toggle(&self, id: &str) -> ToggleOutcome {
		let id = id.trim();

		if id.is_empty() {
			tracing::warn!("Ignoring toggle of an empty tender id.");

			return ToggleOutcome::local_only(ToggleReason::Unexpected, false);
		}

		let _ticket = SyncTicket::enter(&self.gate);
		let toggle = ShortlistToggle::new(id);
		let token = toggle.apply(&mut lock(&self.curation));
		let shortlisted = token.direction() == ToggleDirection::Add;
		let identity = match self.resolve_identity().await {
			Ok(Some(identity)) => identity,
			Ok(None) => {
				tracing::debug!(tender_id = id, "Toggle kept locally while signed out.");

				return ToggleOutcome::local_only(ToggleReason::Unauthenticated, shortlisted);
			},
			Err(err) => {
				tracing::warn!(error = %err, tender_id = id, "Identity lookup failed during toggle.");

				return ToggleOutcome::local_only(ToggleReason::Unexpected, shortlisted);
			},
		};

		match toggle.commit_remote(self.collaborators.backend.as_ref(), identity, &token).await {
			Ok(()) => ToggleOutcome::persisted(shortlisted),
			Err(err) if err.is_ambiguous() => {
				tracing::warn!(
					error = %err,
					tender_id = id,
					direction = ?token.direction(),
					"Shortlist write outcome unknown; keeping local state."
				);

				ToggleOutcome::local_only(ToggleReason::Unexpected, shortlisted)
			},
			Err(err) => {
				let reason = match token.direction() {
					ToggleDirection::Add => ToggleReason::ServerErrorAdd,
					ToggleDirection::Remove => ToggleReason::ServerErrorRemove,
				};

				tracing::warn!(
					error = %err,
					tender_id = id,
					direction = ?token.direction(),
					"Shortlist write rejected; reverting."
				);
				toggle.undo(&mut lock(&self.curation), token);

				ToggleOutcome::local_only(reason, self.is_shortlisted(id))
			},
		}
	}
}
