//! Calls into the remote procedures installed by [`crate::db::Db::ensure_schema`].

use serde_json::Value;
use uuid::Uuid;

use crate::{
	Error, Result,
	db::Db,
	models::{RecommendationRow, ShortlistPage},
};

pub async fn recommended_tenders_with_count(
	db: &Db,
	user_id: Uuid,
	limit: u32,
	offset: u32,
) -> Result<Vec<RecommendationRow>> {
	let rows = sqlx::query_as::<_, RecommendationRow>(
		"\
SELECT tender_id, source, total_count
FROM recommended_tenders_with_count($1, $2, $3)",
	)
	.bind(user_id)
	.bind(to_i32(limit)?)
	.bind(to_i32(offset)?)
	.fetch_all(&db.pool)
	.await?;

	Ok(rows)
}

pub async fn shortlisted_tenders_json(
	db: &Db,
	user_id: Uuid,
	limit: u32,
	offset: u32,
) -> Result<ShortlistPage> {
	let payload: Value = sqlx::query_scalar("SELECT shortlisted_tenders_json($1, $2, $3)")
		.bind(user_id)
		.bind(to_i32(limit)?)
		.bind(to_i32(offset)?)
		.fetch_one(&db.pool)
		.await?;

	serde_json::from_value(payload)
		.map_err(|err| Error::Decode(format!("Invalid shortlisted_tenders_json payload: {err}")))
}

fn to_i32(value: u32) -> Result<i32> {
	i32::try_from(value).map_err(|_| Error::InvalidArgument(format!("Value {value} is out of range.")))
}
