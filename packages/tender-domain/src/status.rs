use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

/// How close to its deadline a tender must be before it is reported as closing soon.
///
/// Used both when deriving [`TenderStatus`] and when translating a status facet into a
/// deadline range, so the two can never disagree.
pub const CLOSING_SOON_WINDOW: Duration = Duration::days(3);

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TenderStatus {
	Active,
	ClosingSoon,
	Closed,
}
impl TenderStatus {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Active => "active",
			Self::ClosingSoon => "closing_soon",
			Self::Closed => "closed",
		}
	}
}

pub fn derive_status(deadline: Option<OffsetDateTime>, now: OffsetDateTime) -> TenderStatus {
	let Some(deadline) = deadline else {
		return TenderStatus::Active;
	};

	if deadline <= now {
		TenderStatus::Closed
	} else if deadline - now <= CLOSING_SOON_WINDOW {
		TenderStatus::ClosingSoon
	} else {
		TenderStatus::Active
	}
}
