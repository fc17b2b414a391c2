use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use time::{OffsetDateTime, UtcOffset};

use crate::{
	date,
	fields::{self, Field},
	status,
	tender::{Tender, TenderDocument, TenderSource},
};

static POSTAL_CODE_IN_ADDRESS: LazyLock<Option<Regex>> =
	LazyLock::new(|| Regex::new(r"\b(\d{3})\s?(\d{3})\b").ok());

/// Everything normalization depends on besides the row itself.
pub struct NormalizeContext<'a> {
	pub now: OffsetDateTime,
	pub local_offset: UtcOffset,
	pub sources: &'a tender_config::Sources,
}

/// Maps a listing row of any known schema generation onto [`Tender`].
///
/// Never fails. Missing or malformed attributes become `None` or `false`, and a row that is
/// not a JSON object yields a tender with an empty id that still carries the raw value.
pub fn normalize(
	raw: &Value,
	ctx: &NormalizeContext<'_>,
	is_shortlisted: impl Fn(&str) -> bool,
) -> Tender {
	let empty = Map::new();
	let row = raw.as_object().unwrap_or(&empty);
	let id = fields::text(row, &fields::ID).unwrap_or_default();
	let deadline = timestamp(row, &fields::DEADLINE, ctx.local_offset);
	let organization_address = fields::text(row, &fields::ORGANIZATION_ADDRESS);
	let postal_code = fields::text(row, &fields::POSTAL_CODE)
		.or_else(|| organization_address.as_deref().and_then(postal_code_from_address));
	let category = fields::text(row, &fields::CATEGORY);
	let title = fields::text(row, &fields::TITLE).or_else(|| category.clone());
	let is_shortlisted = !id.is_empty() && is_shortlisted(&id);

	Tender {
		source: TenderSource::from_code(
			fields::text(row, &fields::SOURCE).as_deref(),
			ctx.sources,
		),
		bid_number: fields::text(row, &fields::BID_NUMBER),
		title,
		category,
		ministry: fields::text(row, &fields::MINISTRY),
		department: fields::text(row, &fields::DEPARTMENT),
		organization_name: fields::text(row, &fields::ORGANIZATION_NAME),
		organization_address,
		postal_code,
		quantity: fields::number(row, &fields::QUANTITY),
		estimated_value: fields::number(row, &fields::ESTIMATED_VALUE),
		emd_amount: fields::number(row, &fields::EMD_AMOUNT),
		reverse_auction: fields::flag(row, &fields::REVERSE_AUCTION).unwrap_or(false),
		extraction_complete: fields::flag(row, &fields::EXTRACTION_COMPLETE).unwrap_or(false),
		bid_type: fields::text(row, &fields::BID_TYPE),
		evaluation_method: fields::text(row, &fields::EVALUATION_METHOD),
		published_at: timestamp(row, &fields::PUBLISHED_AT, ctx.local_offset),
		deadline,
		status: status::derive_status(deadline, ctx.now),
		document: TenderDocument {
			storage_path: fields::text(row, &fields::DOCUMENT_PATH),
			public_url: fields::text(row, &fields::DOCUMENT_URL),
			page_count: fields::number(row, &fields::PAGE_COUNT)
				.filter(|count| *count >= 0.0 && *count <= u32::MAX as f64)
				.map(|count| count as u32),
		},
		is_shortlisted,
		id,
		raw: raw.clone(),
	}
}

/// Reads the first candidate column that holds a parsable instant.
pub fn timestamp(
	row: &Map<String, Value>,
	field: &Field,
	local_offset: UtcOffset,
) -> Option<OffsetDateTime> {
	field.columns.iter().filter_map(|column| row.get(*column)).find_map(|value| match value {
		Value::String(raw) => date::parse_timestamp(raw, local_offset),
		Value::Number(number) => number.as_f64().and_then(date::from_epoch),
		_ => None,
	})
}

fn postal_code_from_address(address: &str) -> Option<String> {
	let caps = POSTAL_CODE_IN_ADDRESS.as_ref()?.captures_iter(address).last()?;

	Some(format!("{}{}", caps.get(1)?.as_str(), caps.get(2)?.as_str()))
}
