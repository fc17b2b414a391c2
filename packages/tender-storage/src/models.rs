use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One page of raw listing rows plus the count of all rows matching the filters.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ListingPage {
	pub rows: Vec<Value>,
	pub total: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, sqlx::FromRow)]
pub struct RecommendationRow {
	pub tender_id: i64,
	pub source: String,
	pub total_count: i64,
}

/// Result of `shortlisted_tenders_json`.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct ShortlistPage {
	pub total: u64,
	#[serde(default)]
	pub rows: Vec<ShortlistEntry>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ShortlistEntry {
	#[serde(deserialize_with = "id_as_string")]
	pub tender_id: String,
	/// Listing row the entry points at; `None` once the listing is gone.
	#[serde(default)]
	pub tender: Option<Value>,
}

fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
	D: Deserializer<'de>,
{
	match Value::deserialize(deserializer)? {
		Value::String(raw) => Ok(raw),
		Value::Number(number) => Ok(number.to_string()),
		other => Err(serde::de::Error::custom(format!("Invalid tender_id {other}."))),
	}
}
