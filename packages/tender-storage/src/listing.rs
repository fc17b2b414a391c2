//! Renders [`TenderQuery`] values against the listing relation.

use serde_json::Value;
use sqlx::{Postgres, QueryBuilder};

use tender_domain::{Column, CountMode, Predicate, Scalar, TenderQuery, query::escape_like};

use crate::{Error, Result, db::Db, models::ListingPage};

const TEXT_DATA_TYPES: [&str; 3] = ["text", "character varying", "character"];
const ISO_DATE_PREFIX: &str = r"^\d{4}-\d{2}-\d{2}";

/// Double-quotes a column name after checking it is a plain lower-case identifier.
pub fn quote_ident(raw: &str) -> Result<String> {
	let mut chars = raw.chars();
	let valid_start = matches!(chars.next(), Some(ch) if ch.is_ascii_lowercase() || ch == '_');

	if !valid_start || !chars.all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_')
	{
		return Err(Error::InvalidArgument(format!("Column name '{raw}' is not allowed.")));
	}

	Ok(format!("\"{raw}\""))
}

pub fn quote_relation(raw: &str) -> Result<String> {
	let parts: Vec<&str> = raw.split('.').collect();

	if parts.len() > 2 {
		return Err(Error::InvalidArgument(format!("Relation name '{raw}' is not allowed.")));
	}

	let quoted = parts.into_iter().map(quote_ident).collect::<Result<Vec<_>>>()?;

	Ok(quoted.join("."))
}

pub fn select_rows<'a>(
	relation: &str,
	query: &'a TenderQuery,
) -> Result<QueryBuilder<'a, Postgres>> {
	let mut builder = QueryBuilder::new("SELECT to_jsonb(t) AS row FROM ");

	builder.push(quote_relation(relation)?);
	builder.push(" AS t");
	push_filters(&mut builder, &query.filters)?;

	if !query.sort.is_empty() {
		builder.push(" ORDER BY ");

		for (idx, sort) in query.sort.iter().enumerate() {
			if idx > 0 {
				builder.push(", ");
			}

			builder.push(column_sql(&sort.column)?);
			builder.push(if sort.descending { " DESC NULLS LAST" } else { " ASC NULLS LAST" });
		}
	}

	builder.push(" LIMIT ");
	builder.push_bind(to_i64(query.range.limit())?);
	builder.push(" OFFSET ");
	builder.push_bind(to_i64(query.range.offset())?);

	Ok(builder)
}

pub fn count_rows<'a>(
	relation: &str,
	filters: &'a [Predicate],
) -> Result<QueryBuilder<'a, Postgres>> {
	let mut builder = QueryBuilder::new("SELECT count(*) FROM ");

	builder.push(quote_relation(relation)?);
	builder.push(" AS t");
	push_filters(&mut builder, filters)?;

	Ok(builder)
}

pub async fn fetch_page(db: &Db, relation: &str, query: &TenderQuery) -> Result<ListingPage> {
	let rows: Vec<Value> =
		select_rows(relation, query)?.build_query_scalar().fetch_all(&db.pool).await?;
	let total = match query.count {
		CountMode::Estimated if query.filters.is_empty() =>
			match estimate_rows(db, relation).await? {
				Some(estimate) => estimate,
				None => exact_count(db, relation, &query.filters).await?,
			},
		_ => exact_count(db, relation, &query.filters).await?,
	};

	tracing::debug!(relation, rows = rows.len(), total, "Listing page fetched.");

	Ok(ListingPage { rows, total })
}

/// Values of `column` starting with `prefix`, at most `limit` of them, duplicates included.
pub async fn sample_values(
	db: &Db,
	relation: &str,
	column: &str,
	prefix: &str,
	limit: u32,
) -> Result<Vec<String>> {
	let column = quote_ident(column)?;
	let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT t.{column}::text FROM "));

	builder.push(quote_relation(relation)?);
	builder.push(format!(" AS t WHERE t.{column}::text ILIKE "));
	builder.push_bind(format!("{}%", escape_like(prefix.trim())));
	builder.push(" LIMIT ");
	builder.push_bind(i64::from(limit));

	let values: Vec<Option<String>> = builder.build_query_scalar().fetch_all(&db.pool).await?;

	Ok(values.into_iter().flatten().collect())
}

pub async fn text_columns(db: &Db, relation: &str) -> Result<Vec<String>> {
	let (schema, table) = match relation.split_once('.') {
		Some((schema, table)) => (Some(schema), table),
		None => (None, relation),
	};
	let columns: Vec<String> = sqlx::query_scalar(
		"\
SELECT column_name::text
FROM information_schema.columns
WHERE table_schema = coalesce($1, current_schema())
	AND table_name = $2
	AND data_type = ANY($3)
ORDER BY ordinal_position",
	)
	.bind(schema)
	.bind(table)
	.bind(TEXT_DATA_TYPES.iter().map(|ty| ty.to_string()).collect::<Vec<_>>())
	.fetch_all(&db.pool)
	.await?;

	Ok(columns)
}

async fn exact_count(db: &Db, relation: &str, filters: &[Predicate]) -> Result<u64> {
	let count: i64 = count_rows(relation, filters)?.build_query_scalar().fetch_one(&db.pool).await?;

	Ok(u64::try_from(count).unwrap_or(0))
}

/// Planner estimate; `None` when the relation was never analyzed.
async fn estimate_rows(db: &Db, relation: &str) -> Result<Option<u64>> {
	let estimate: Option<i64> =
		sqlx::query_scalar("SELECT reltuples::bigint FROM pg_class WHERE oid = $1::regclass")
			.bind(relation)
			.fetch_optional(&db.pool)
			.await?;

	Ok(estimate.and_then(|value| u64::try_from(value).ok()))
}

fn push_filters<'a>(
	builder: &mut QueryBuilder<'a, Postgres>,
	filters: &'a [Predicate],
) -> Result<()> {
	for (idx, predicate) in filters.iter().enumerate() {
		builder.push(if idx == 0 { " WHERE " } else { " AND " });
		push_predicate(builder, predicate)?;
	}

	Ok(())
}

fn push_predicate<'a>(
	builder: &mut QueryBuilder<'a, Postgres>,
	predicate: &'a Predicate,
) -> Result<()> {
	match predicate {
		Predicate::Compare { column, op, value } => {
			builder.push(format!("{} {} ", column_sql(column)?, op.as_sql()));
			push_scalar(builder, value);
		},
		Predicate::ILike { column, pattern } => {
			builder.push(format!("t.{}::text ILIKE ", quote_ident(column)?));
			builder.push_bind(pattern.as_str());
		},
		Predicate::In { column, values } => {
			if values.is_empty() {
				builder.push("FALSE");
			} else {
				builder.push(format!("t.{}::text = ANY(", quote_ident(column)?));
				builder.push_bind(values.as_slice());
				builder.push(")");
			}
		},
		Predicate::IsNull { column } => {
			builder.push(format!("{} IS NULL", column_sql(column)?));
		},
		Predicate::Any { predicates } => push_group(builder, predicates, " OR ", "FALSE")?,
		Predicate::All { predicates } => push_group(builder, predicates, " AND ", "TRUE")?,
	}

	Ok(())
}

/// Alias columns are read through the row's JSON form, so aliases the relation lacks are NULL.
/// Values that do not start with an ISO date are skipped instead of failing the cast.
fn column_sql(column: &Column) -> Result<String> {
	match column {
		Column::Named(name) => Ok(format!("t.{}", quote_ident(name)?)),
		Column::FirstTimestamp(names) => {
			if names.is_empty() {
				return Ok("NULL::timestamptz".to_string());
			}

			let mut candidates = Vec::with_capacity(names.len());

			for name in names {
				quote_ident(name)?;

				let value = format!("to_jsonb(t)->>'{name}'");

				candidates.push(format!(
					"CASE WHEN {value} ~ '{ISO_DATE_PREFIX}' THEN ({value})::timestamptz END"
				));
			}

			Ok(format!("COALESCE({})", candidates.join(", ")))
		},
	}
}

fn push_group<'a>(
	builder: &mut QueryBuilder<'a, Postgres>,
	predicates: &'a [Predicate],
	joiner: &str,
	empty: &str,
) -> Result<()> {
	if predicates.is_empty() {
		builder.push(empty);

		return Ok(());
	}

	builder.push("(");

	for (idx, predicate) in predicates.iter().enumerate() {
		if idx > 0 {
			builder.push(joiner);
		}

		push_predicate(builder, predicate)?;
	}

	builder.push(")");

	Ok(())
}

fn push_scalar<'a>(builder: &mut QueryBuilder<'a, Postgres>, value: &'a Scalar) {
	match value {
		Scalar::Text(text) => builder.push_bind(text.as_str()),
		Scalar::Integer(number) => builder.push_bind(*number),
		Scalar::Float(number) => builder.push_bind(*number),
		Scalar::Bool(flag) => builder.push_bind(*flag),
		Scalar::Timestamp(ts) => builder.push_bind(*ts),
	};
}

fn to_i64(value: u64) -> Result<i64> {
	i64::try_from(value).map_err(|_| Error::InvalidArgument(format!("Value {value} is out of range.")))
}
