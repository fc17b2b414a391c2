use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

use crate::status::TenderStatus;

/// Upstream feed a listing row was scraped from.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TenderSource {
	Primary,
	Secondary,
}
impl TenderSource {
	pub const ALL: [Self; 2] = [Self::Primary, Self::Secondary];

	/// Value stored in the listing `source` column for this feed.
	pub fn code(self, sources: &tender_config::Sources) -> &str {
		match self {
			Self::Primary => sources.primary.as_str(),
			Self::Secondary => sources.secondary.as_str(),
		}
	}

	/// Rows without a recognizable code predate the secondary feed and belong to the primary one.
	pub fn from_code(code: Option<&str>, sources: &tender_config::Sources) -> Self {
		match code {
			Some(code) if code.trim().eq_ignore_ascii_case(&sources.secondary) => Self::Secondary,
			_ => Self::Primary,
		}
	}
}

/// Server-computed suggestion for one user.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct RecommendationPair {
	pub id: i64,
	pub source: TenderSource,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct TenderDocument {
	pub storage_path: Option<String>,
	pub public_url: Option<String>,
	pub page_count: Option<u32>,
}

/// Canonical tender shape handed to the UI.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Tender {
	pub id: String,
	pub source: TenderSource,
	pub bid_number: Option<String>,
	pub title: Option<String>,
	pub category: Option<String>,
	pub ministry: Option<String>,
	pub department: Option<String>,
	pub organization_name: Option<String>,
	pub organization_address: Option<String>,
	pub postal_code: Option<String>,
	pub quantity: Option<f64>,
	pub estimated_value: Option<f64>,
	pub emd_amount: Option<f64>,
	pub reverse_auction: bool,
	pub extraction_complete: bool,
	pub bid_type: Option<String>,
	pub evaluation_method: Option<String>,
	#[serde(with = "crate::time_serde::option")]
	pub published_at: Option<OffsetDateTime>,
	#[serde(with = "crate::time_serde::option")]
	pub deadline: Option<OffsetDateTime>,
	pub status: TenderStatus,
	pub document: TenderDocument,
	pub is_shortlisted: bool,
	/// Source record as stored, for UI fields without a canonical counterpart.
	pub raw: Value,
}
impl Tender {
	pub fn emd_required(&self) -> bool {
		self.emd_amount.map(|amount| amount > 0.0).unwrap_or(false)
	}
}
