//! Candidate column lists for every logical tender attribute.
//!
//! Listing rows come from several scraper generations that named the same attribute
//! differently. Each attribute is declared once here as an ordered list; the first column
//! holding a usable value wins. The first entry of each list is also the column the
//! listing relation is filtered and sorted on.

use serde_json::{Map, Value};

#[derive(Clone, Copy, Debug)]
pub struct Field {
	pub name: &'static str,
	pub columns: &'static [&'static str],
}
impl Field {
	/// Column used for filtering and sorting on the listing relation.
	pub const fn primary(&self) -> &'static str {
		self.columns[0]
	}
}

pub const ID: Field = Field { name: "id", columns: &["id", "tender_id", "bid_id"] };
pub const SOURCE: Field = Field { name: "source", columns: &["source", "portal"] };
pub const BID_NUMBER: Field =
	Field { name: "bid_number", columns: &["bid_number", "bid_no", "ra_number"] };
pub const TITLE: Field = Field {
	name: "title",
	columns: &["item_title", "product_title", "item", "title", "work_name"],
};
pub const CATEGORY: Field =
	Field { name: "category", columns: &["item_category", "category", "category_of_tendered"] };
pub const MINISTRY: Field =
	Field { name: "ministry", columns: &["ministry", "ministry_name", "ministry_state_name"] };
pub const DEPARTMENT: Field =
	Field { name: "department", columns: &["department", "department_name"] };
pub const ORGANIZATION_NAME: Field = Field {
	name: "organization_name",
	columns: &["organization_name", "organisation_name", "organisation", "organization"],
};
pub const ORGANIZATION_ADDRESS: Field = Field {
	name: "organization_address",
	columns: &["organization_address", "organisation_address", "buyer_address", "address"],
};
pub const POSTAL_CODE: Field =
	Field { name: "postal_code", columns: &["pincode", "postal_code", "pin_code"] };
pub const QUANTITY: Field =
	Field { name: "quantity", columns: &["total_quantity", "quantity", "quantity_required"] };
pub const ESTIMATED_VALUE: Field = Field {
	name: "estimated_value",
	columns: &["estimated_value", "estimated_cost", "estimated_bid_value"],
};
pub const EMD_AMOUNT: Field = Field { name: "emd_amount", columns: &["emd_amount", "emd"] };
pub const REVERSE_AUCTION: Field = Field {
	name: "reverse_auction",
	columns: &["bid_to_ra_enabled", "ra_enabled", "reverse_auction"],
};
pub const EXTRACTION_COMPLETE: Field = Field {
	name: "extraction_complete",
	columns: &["extraction_complete", "is_extracted", "extraction_status"],
};
pub const BID_TYPE: Field =
	Field { name: "bid_type", columns: &["type_of_bid", "bid_type", "tender_type"] };
pub const EVALUATION_METHOD: Field =
	Field { name: "evaluation_method", columns: &["evaluation_method", "evaluation_type"] };
pub const PUBLISHED_AT: Field = Field {
	name: "published_at",
	columns: &["publishing_datetime", "start_datetime", "bid_date", "published_at", "created_at"],
};
pub const DEADLINE: Field = Field {
	name: "deadline",
	columns: &["bid_end_datetime", "end_datetime", "closing_datetime", "bid_end", "end_date"],
};
pub const DOCUMENT_PATH: Field =
	Field { name: "document_path", columns: &["pdf_storage_path", "pdf_path"] };
pub const DOCUMENT_URL: Field =
	Field { name: "document_url", columns: &["pdf_public_url", "pdf_url"] };
pub const PAGE_COUNT: Field =
	Field { name: "page_count", columns: &["page_count", "pdf_page_count"] };

/// Text columns free-text search may look at, in priority order.
pub const SEARCHABLE_TEXT: &[&str] = &[
	"bid_number",
	"item_title",
	"product_title",
	"item",
	"title",
	"item_category",
	"category",
	"ministry",
	"department",
	"organization_name",
	"organisation_name",
];

/// Returns the first candidate value that is present and not blank.
pub fn resolve<'a>(row: &'a Map<String, Value>, field: &Field) -> Option<&'a Value> {
	field.columns.iter().filter_map(|column| row.get(*column)).find(|value| is_usable(value))
}

pub fn text(row: &Map<String, Value>, field: &Field) -> Option<String> {
	field.columns.iter().filter_map(|column| row.get(*column)).find_map(coerce_text)
}

pub fn number(row: &Map<String, Value>, field: &Field) -> Option<f64> {
	field.columns.iter().filter_map(|column| row.get(*column)).find_map(coerce_number)
}

pub fn flag(row: &Map<String, Value>, field: &Field) -> Option<bool> {
	field.columns.iter().filter_map(|column| row.get(*column)).find_map(coerce_flag)
}

pub fn coerce_text(value: &Value) -> Option<String> {
	match value {
		Value::String(raw) => {
			let trimmed = raw.trim();

			if trimmed.is_empty() { None } else { Some(trimmed.to_string()) }
		},
		Value::Number(number) => Some(number.to_string()),
		Value::Bool(flag) => Some(flag.to_string()),
		_ => None,
	}
}

/// Accepts JSON numbers and strings such as `"₹ 1,50,000.50"` or `"2500 INR"`.
pub fn coerce_number(value: &Value) -> Option<f64> {
	match value {
		Value::Number(number) => number.as_f64().filter(|value| value.is_finite()),
		Value::String(raw) => {
			let start = raw.find(|ch: char| ch.is_ascii_digit())?;
			let negative = raw[..start].trim_end().ends_with('-');
			let digits: String = raw[start..]
				.chars()
				.take_while(|ch| ch.is_ascii_digit() || matches!(ch, ',' | '.'))
				.filter(|ch| *ch != ',')
				.collect();
			let value = digits.trim_end_matches('.').parse::<f64>().ok()?;

			Some(if negative { -value } else { value }).filter(|value| value.is_finite())
		},
		_ => None,
	}
}

pub fn coerce_flag(value: &Value) -> Option<bool> {
	match value {
		Value::Bool(flag) => Some(*flag),
		Value::Number(number) => number.as_i64().map(|value| value != 0),
		Value::String(raw) => match raw.trim().to_ascii_lowercase().as_str() {
			"yes" | "y" | "true" | "t" | "1" | "enabled" | "completed" | "complete" | "done" =>
				Some(true),
			"no" | "n" | "false" | "f" | "0" | "disabled" | "pending" | "failed" => Some(false),
			_ => None,
		},
		_ => None,
	}
}

fn is_usable(value: &Value) -> bool {
	match value {
		Value::Null => false,
		Value::String(raw) => !raw.trim().is_empty(),
		_ => true,
	}
}
