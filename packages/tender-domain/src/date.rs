//! Timestamp parsing for listing rows.
//!
//! Rows arrive from several scrapers and schema generations, so the same column may hold an
//! RFC 3339 instant, a Postgres `timestamptz` rendering, or a naive wall-clock value typed in
//! by the portal. Naive values are read as wall-clock components in the caller's local offset;
//! they are never treated as UTC and shifted.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use time::{
	Date, Month, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset,
	format_description::well_known::Rfc3339,
};

static ISO_TIMESTAMP: LazyLock<Option<Regex>> = LazyLock::new(|| {
	Regex::new(
		r"^(\d{4})-(\d{2})-(\d{2})(?:[ T](\d{1,2}):(\d{2})(?::(\d{2})(?:\.(\d{1,9}))?)?)?\s*(Z|z|[+-]\d{2}(?::?\d{2})?)?$",
	)
	.ok()
});
static DAY_FIRST_TIMESTAMP: LazyLock<Option<Regex>> = LazyLock::new(|| {
	Regex::new(
		r"^(\d{1,2})[-/](\d{1,2})[-/](\d{4})(?:\s+(\d{1,2}):(\d{2})(?::(\d{2}))?(?:\s*([AaPp][Mm]))?)?$",
	)
	.ok()
});

/// Parses a listing timestamp. Returns `None` for anything unrecognized.
pub fn parse_timestamp(raw: &str, local: UtcOffset) -> Option<OffsetDateTime> {
	let trimmed = raw.trim();

	if trimmed.is_empty() {
		return None;
	}
	if let Ok(parsed) = OffsetDateTime::parse(trimmed, &Rfc3339) {
		return Some(parsed);
	}
	if let Some(caps) = ISO_TIMESTAMP.as_ref().and_then(|re| re.captures(trimmed)) {
		return parse_iso(&caps, local);
	}
	if let Some(caps) = DAY_FIRST_TIMESTAMP.as_ref().and_then(|re| re.captures(trimmed)) {
		return parse_day_first(&caps, local);
	}

	None
}

/// Interprets an epoch value; values above 10^11 are taken as milliseconds.
pub fn from_epoch(value: f64) -> Option<OffsetDateTime> {
	if !value.is_finite() {
		return None;
	}

	let seconds = if value.abs() >= 1e11 { value / 1_000.0 } else { value };

	OffsetDateTime::from_unix_timestamp(seconds.trunc() as i64).ok()
}

fn parse_iso(caps: &Captures<'_>, local: UtcOffset) -> Option<OffsetDateTime> {
	let date = build_date(number(caps, 1)?, number(caps, 2)?, number(caps, 3)?)?;
	let time = build_time(
		optional_number(caps, 4)?.unwrap_or(0),
		optional_number(caps, 5)?.unwrap_or(0),
		optional_number(caps, 6)?.unwrap_or(0),
		caps.get(7).map(|m| m.as_str()),
	)?;
	let offset = match caps.get(8) {
		Some(raw) => parse_offset(raw.as_str())?,
		None => local,
	};

	Some(PrimitiveDateTime::new(date, time).assume_offset(offset))
}

fn parse_day_first(caps: &Captures<'_>, local: UtcOffset) -> Option<OffsetDateTime> {
	let date = build_date(number(caps, 3)?, number(caps, 2)?, number(caps, 1)?)?;
	let mut hour = optional_number(caps, 4)?.unwrap_or(0);

	if let Some(meridiem) = caps.get(7) {
		if hour == 0 || hour > 12 {
			return None;
		}

		let pm = meridiem.as_str().eq_ignore_ascii_case("pm");

		hour = match (pm, hour) {
			(false, 12) => 0,
			(true, 12) => 12,
			(true, h) => h + 12,
			(false, h) => h,
		};
	}

	let time = build_time(
		hour,
		optional_number(caps, 5)?.unwrap_or(0),
		optional_number(caps, 6)?.unwrap_or(0),
		None,
	)?;

	Some(PrimitiveDateTime::new(date, time).assume_offset(local))
}

fn build_date(year: u32, month: u32, day: u32) -> Option<Date> {
	let month = Month::try_from(u8::try_from(month).ok()?).ok()?;

	Date::from_calendar_date(i32::try_from(year).ok()?, month, u8::try_from(day).ok()?).ok()
}

fn build_time(hour: u32, minute: u32, second: u32, fraction: Option<&str>) -> Option<Time> {
	let nanos = match fraction {
		Some(digits) => {
			let padded = format!("{digits:0<9}");

			padded.get(..9)?.parse::<u32>().ok()?
		},
		None => 0,
	};

	Time::from_hms_nano(
		u8::try_from(hour).ok()?,
		u8::try_from(minute).ok()?,
		u8::try_from(second).ok()?,
		nanos,
	)
	.ok()
}

fn parse_offset(raw: &str) -> Option<UtcOffset> {
	if raw.eq_ignore_ascii_case("z") {
		return Some(UtcOffset::UTC);
	}

	let (sign, digits) = raw.split_at(1);
	let digits = digits.replace(':', "");
	let hours: i8 = digits.get(..2)?.parse().ok()?;
	let minutes: i8 = match digits.get(2..) {
		Some("") | None => 0,
		Some(rest) => rest.parse().ok()?,
	};
	let factor = if sign == "-" { -1 } else { 1 };

	UtcOffset::from_hms(hours * factor, minutes * factor, 0).ok()
}

fn number(caps: &Captures<'_>, index: usize) -> Option<u32> {
	caps.get(index)?.as_str().parse().ok()
}

/// `Some(None)` when the group is absent, `None` when present but unparsable.
fn optional_number(caps: &Captures<'_>, index: usize) -> Option<Option<u32>> {
	match caps.get(index) {
		Some(m) => m.as_str().parse().ok().map(Some),
		None => Some(None),
	}
}
