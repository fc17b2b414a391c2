//! Evaluates [`TenderQuery`] values over JSON rows with the same semantics the SQL rendering
//! has: comparisons against NULL are false, `IN` compares text renderings, ILIKE honours
//! backslash escapes, and NULLs sort last in both directions.

use std::cmp::Ordering;

use serde_json::Value;
use time::{OffsetDateTime, UtcOffset};

use tender_domain::{Column, CompareOp, Predicate, Scalar, SortSpec, TenderQuery, date, fields};

/// Rows matching every filter, sorted and cut to the query range, plus the match count.
pub fn run(rows: &[Value], query: &TenderQuery) -> (Vec<Value>, u64) {
	let mut matched: Vec<&Value> =
		rows.iter().filter(|row| query.filters.iter().all(|p| matches(row, p))).collect();
	let total = matched.len() as u64;

	matched.sort_by(|a, b| compare_rows(a, b, &query.sort));

	let offset = usize::try_from(query.range.offset()).unwrap_or(usize::MAX);
	let limit = usize::try_from(query.range.limit()).unwrap_or(usize::MAX);
	let page = matched.into_iter().skip(offset).take(limit).cloned().collect();

	(page, total)
}

pub fn matches(row: &Value, predicate: &Predicate) -> bool {
	match predicate {
		Predicate::Compare { column, op, value } => compare(resolve(row, column), *op, value),
		Predicate::ILike { column, pattern } => column_value(row, column)
			.and_then(fields::coerce_text)
			.map(|text| like_match(pattern, &text))
			.unwrap_or(false),
		Predicate::In { column, values } => column_value(row, column)
			.and_then(fields::coerce_text)
			.map(|text| values.contains(&text))
			.unwrap_or(false),
		Predicate::IsNull { column } => resolve(row, column).is_none(),
		Predicate::Any { predicates } => predicates.iter().any(|p| matches(row, p)),
		Predicate::All { predicates } => predicates.iter().all(|p| matches(row, p)),
	}
}

/// Case-insensitive LIKE with `%`, `_` and backslash escapes.
pub fn like_match(pattern: &str, text: &str) -> bool {
	let tokens = tokenize(&pattern.to_lowercase());
	let text: Vec<char> = text.to_lowercase().chars().collect();
	let (mut p, mut t) = (0, 0);
	let mut backtrack: Option<(usize, usize)> = None;

	while t < text.len() {
		match tokens.get(p) {
			Some(Token::AnyRun) => {
				backtrack = Some((p, t));
				p += 1;
			},
			Some(Token::AnyOne) => {
				p += 1;
				t += 1;
			},
			Some(Token::Literal(ch)) if *ch == text[t] => {
				p += 1;
				t += 1;
			},
			_ => match backtrack {
				Some((star, start)) => {
					p = star + 1;
					t = start + 1;
					backtrack = Some((star, start + 1));
				},
				None => return false,
			},
		}
	}

	while matches!(tokens.get(p), Some(Token::AnyRun)) {
		p += 1;
	}

	p == tokens.len()
}

#[derive(Debug, PartialEq)]
enum Token {
	AnyRun,
	AnyOne,
	Literal(char),
}

#[derive(Debug)]
enum SortValue {
	Number(f64),
	Time(OffsetDateTime),
	Flag(bool),
	Text(String),
}

fn tokenize(pattern: &str) -> Vec<Token> {
	let mut tokens = Vec::new();
	let mut chars = pattern.chars();

	while let Some(ch) = chars.next() {
		tokens.push(match ch {
			'%' => Token::AnyRun,
			'_' => Token::AnyOne,
			'\\' => Token::Literal(chars.next().unwrap_or('\\')),
			other => Token::Literal(other),
		});
	}

	tokens
}

fn column_value<'a>(row: &'a Value, column: &str) -> Option<&'a Value> {
	row.get(column).filter(|value| !value.is_null())
}

fn resolve<'a>(row: &'a Value, column: &Column) -> Option<&'a Value> {
	match column {
		Column::Named(name) => column_value(row, name),
		Column::FirstTimestamp(names) => names
			.iter()
			.filter_map(|name| column_value(row, name))
			.find(|value| timestamp(value).is_some()),
	}
}

fn compare(value: Option<&Value>, op: CompareOp, scalar: &Scalar) -> bool {
	let Some(value) = value else {
		return false;
	};
	let ordering = match scalar {
		Scalar::Text(expected) =>
			fields::coerce_text(value).map(|text| text.as_str().cmp(expected.as_str())),
		Scalar::Integer(expected) =>
			fields::coerce_number(value).and_then(|number| number.partial_cmp(&(*expected as f64))),
		Scalar::Float(expected) =>
			fields::coerce_number(value).and_then(|number| number.partial_cmp(expected)),
		Scalar::Bool(expected) => fields::coerce_flag(value).map(|flag| flag.cmp(expected)),
		Scalar::Timestamp(expected) => timestamp(value).map(|ts| ts.cmp(expected)),
	};

	match ordering {
		Some(ordering) => holds(op, ordering),
		None => false,
	}
}

fn holds(op: CompareOp, ordering: Ordering) -> bool {
	match op {
		CompareOp::Eq => ordering == Ordering::Equal,
		CompareOp::Neq => ordering != Ordering::Equal,
		CompareOp::Gt => ordering == Ordering::Greater,
		CompareOp::Gte => ordering != Ordering::Less,
		CompareOp::Lt => ordering == Ordering::Less,
		CompareOp::Lte => ordering != Ordering::Greater,
	}
}

fn timestamp(value: &Value) -> Option<OffsetDateTime> {
	match value {
		Value::String(raw) => date::parse_timestamp(raw, UtcOffset::UTC),
		Value::Number(number) => number.as_f64().and_then(date::from_epoch),
		_ => None,
	}
}

fn sort_value(value: Option<&Value>) -> Option<SortValue> {
	match value? {
		Value::Number(number) => number.as_f64().map(SortValue::Number),
		Value::Bool(flag) => Some(SortValue::Flag(*flag)),
		Value::String(raw) => Some(match date::parse_timestamp(raw, UtcOffset::UTC) {
			Some(ts) => SortValue::Time(ts),
			None => SortValue::Text(raw.clone()),
		}),
		_ => None,
	}
}

fn compare_values(a: &SortValue, b: &SortValue) -> Ordering {
	match (a, b) {
		(SortValue::Number(a), SortValue::Number(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
		(SortValue::Time(a), SortValue::Time(b)) => a.cmp(b),
		(SortValue::Flag(a), SortValue::Flag(b)) => a.cmp(b),
		(SortValue::Text(a), SortValue::Text(b)) => a.cmp(b),
		(a, b) => format!("{a:?}").cmp(&format!("{b:?}")),
	}
}

fn compare_rows(a: &Value, b: &Value, sort: &[SortSpec]) -> Ordering {
	for spec in sort {
		let left = sort_value(resolve(a, &spec.column));
		let right = sort_value(resolve(b, &spec.column));
		let ordering = match (left, right) {
			(None, None) => Ordering::Equal,
			(None, Some(_)) => Ordering::Greater,
			(Some(_), None) => Ordering::Less,
			(Some(left), Some(right)) => {
				let ordering = compare_values(&left, &right);

				if spec.descending { ordering.reverse() } else { ordering }
			},
		};

		if ordering != Ordering::Equal {
			return ordering;
		}
	}

	Ordering::Equal
}
