//! Declarative description of one listing read.
//!
//! The Query Builder composes a [`TenderQuery`]; a backing store renders it into its own
//! dialect. Filters are ANDed; [`Predicate::Any`] is the only way to express a disjunction.

use serde::Serialize;
use time::OffsetDateTime;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Scalar {
	Text(String),
	Integer(i64),
	Float(f64),
	Bool(bool),
	Timestamp(#[serde(with = "crate::time_serde")] OffsetDateTime),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
	Eq,
	Neq,
	Gt,
	Gte,
	Lt,
	Lte,
}
impl CompareOp {
	pub fn as_sql(self) -> &'static str {
		match self {
			Self::Eq => "=",
			Self::Neq => "<>",
			Self::Gt => ">",
			Self::Gte => ">=",
			Self::Lt => "<",
			Self::Lte => "<=",
		}
	}
}

/// Where a comparison or sort key reads its value.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "kind", content = "columns", rename_all = "snake_case")]
pub enum Column {
	Named(String),
	/// First alias that holds a timestamp. For fields renamed across schema generations.
	FirstTimestamp(Vec<String>),
}
impl Column {
	pub fn first_timestamp(columns: &[&str]) -> Self {
		Self::FirstTimestamp(columns.iter().map(|column| column.to_string()).collect())
	}

	pub fn names(&self) -> Vec<&str> {
		match self {
			Self::Named(column) => vec![column.as_str()],
			Self::FirstTimestamp(columns) => columns.iter().map(String::as_str).collect(),
		}
	}
}
impl From<&str> for Column {
	fn from(column: &str) -> Self {
		Self::Named(column.to_string())
	}
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Predicate {
	Compare { column: Column, op: CompareOp, value: Scalar },
	/// Case-insensitive pattern match; `%` and `_` are wildcards, `\` escapes them.
	ILike { column: String, pattern: String },
	/// Set membership, compared on the column's text rendering.
	In { column: String, values: Vec<String> },
	IsNull { column: Column },
	Any { predicates: Vec<Predicate> },
	All { predicates: Vec<Predicate> },
}
impl Predicate {
	pub fn compare(column: impl Into<Column>, op: CompareOp, value: Scalar) -> Self {
		Self::Compare { column: column.into(), op, value }
	}

	pub fn eq(column: impl Into<Column>, value: Scalar) -> Self {
		Self::compare(column, CompareOp::Eq, value)
	}

	pub fn ilike(column: &str, pattern: impl Into<String>) -> Self {
		Self::ILike { column: column.to_string(), pattern: pattern.into() }
	}

	pub fn is_in(column: &str, values: Vec<String>) -> Self {
		Self::In { column: column.to_string(), values }
	}

	pub fn is_null(column: impl Into<Column>) -> Self {
		Self::IsNull { column: column.into() }
	}

	pub fn any(predicates: Vec<Predicate>) -> Self {
		Self::Any { predicates }
	}

	pub fn all(predicates: Vec<Predicate>) -> Self {
		Self::All { predicates }
	}

	/// Every column the predicate touches, depth first.
	pub fn columns(&self) -> Vec<&str> {
		let mut out = Vec::new();

		self.collect_columns(&mut out);

		out
	}

	fn collect_columns<'a>(&'a self, out: &mut Vec<&'a str>) {
		match self {
			Self::Compare { column, .. } | Self::IsNull { column } => out.extend(column.names()),
			Self::ILike { column, .. } | Self::In { column, .. } => out.push(column.as_str()),
			Self::Any { predicates } | Self::All { predicates } =>
				predicates.iter().for_each(|predicate| predicate.collect_columns(out)),
		}
	}
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct SortSpec {
	pub column: Column,
	pub descending: bool,
}
impl SortSpec {
	pub fn asc(column: impl Into<Column>) -> Self {
		Self { column: column.into(), descending: false }
	}

	pub fn desc(column: impl Into<Column>) -> Self {
		Self { column: column.into(), descending: true }
	}
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CountMode {
	#[default]
	Exact,
	Estimated,
}
impl CountMode {
	pub fn from_config(raw: &str) -> Self {
		if raw == "estimated" { Self::Estimated } else { Self::Exact }
	}
}

/// Inclusive offset range of one page, `[from, to]`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct PageRange {
	pub from: u64,
	pub to: u64,
}
impl PageRange {
	/// Page numbers are 1-based; page 0 is treated as page 1 and a zero size as one.
	pub fn for_page(page: u32, page_size: u32) -> Self {
		let page = u64::from(page.max(1));
		let size = u64::from(page_size.max(1));
		let from = (page - 1) * size;

		Self { from, to: from + size - 1 }
	}

	pub fn offset(&self) -> u64 {
		self.from
	}

	pub fn limit(&self) -> u64 {
		self.to - self.from + 1
	}
}

pub fn total_pages(total: u64, page_size: u32) -> u64 {
	total.div_ceil(u64::from(page_size.max(1)))
}

/// Escapes `%`, `_` and `\` so user text matches literally inside an ILIKE pattern.
pub fn escape_like(raw: &str) -> String {
	let mut out = String::with_capacity(raw.len());

	for ch in raw.chars() {
		if matches!(ch, '%' | '_' | '\\') {
			out.push('\\');
		}

		out.push(ch);
	}

	out
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TenderQuery {
	pub filters: Vec<Predicate>,
	pub sort: Vec<SortSpec>,
	pub range: PageRange,
	pub count: CountMode,
}
