//! Single source of truth for "is it safe to read the shortlist view".
//!
//! `Idle -> Syncing -> Cooldown -> Idle`. A toggle enters `Syncing` with a hold window; when
//! the last overlapping toggle finishes the gate cools down until the later of the hold
//! window and the settle window, then reads are allowed again.
//!
//! Every `begin` also bumps a generation counter, so a long reader can tell whether any toggle
//! started since it looked, even one that has already settled.

use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum GatePhase {
	Idle,
	Syncing,
	Cooldown,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum State {
	Idle,
	Syncing { in_flight: u32, hold_until: Instant },
	Cooldown { until: Instant },
}

#[derive(Debug)]
pub struct SyncGate {
	state: State,
	hold: Duration,
	settle: Duration,
	generation: u64,
}
impl SyncGate {
	pub fn new(hold: Duration, settle: Duration) -> Self {
		Self { state: State::Idle, hold, settle, generation: 0 }
	}

	/// Number of toggles started so far.
	pub fn generation(&self) -> u64 {
		self.generation
	}

	pub fn begin(&mut self, now: Instant) {
		self.generation = self.generation.wrapping_add(1);
		self.state = match self.state {
			State::Syncing { in_flight, hold_until } => State::Syncing {
				in_flight: in_flight.saturating_add(1),
				hold_until: hold_until.max(now + self.hold),
			},
			State::Idle | State::Cooldown { .. } =>
				State::Syncing { in_flight: 1, hold_until: now + self.hold },
		};
	}

	/// Ends one toggle. Unmatched calls are ignored.
	pub fn finish(&mut self, now: Instant) {
		if let State::Syncing { in_flight, hold_until } = self.state {
			self.state = if in_flight > 1 {
				State::Syncing { in_flight: in_flight - 1, hold_until }
			} else {
				State::Cooldown { until: hold_until.max(now + self.settle) }
			};
		}
	}

	pub fn phase(&mut self, now: Instant) -> GatePhase {
		if let State::Cooldown { until } = self.state
			&& now >= until
		{
			self.state = State::Idle;
		}

		match self.state {
			State::Idle => GatePhase::Idle,
			State::Syncing { .. } => GatePhase::Syncing,
			State::Cooldown { .. } => GatePhase::Cooldown,
		}
	}

	pub fn is_read_safe(&mut self, now: Instant) -> bool {
		self.phase(now) == GatePhase::Idle
	}
}
