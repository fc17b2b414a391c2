use uuid::Uuid;

use crate::{Result, db::Db};

/// Plain insert: an existing row surfaces as a unique violation for the caller to judge.
pub async fn insert(db: &Db, user_id: Uuid, tender_id: &str) -> Result<()> {
	sqlx::query("INSERT INTO user_shortlists (user_id, tender_id) VALUES ($1, $2)")
		.bind(user_id)
		.bind(tender_id)
		.execute(&db.pool)
		.await?;

	Ok(())
}

/// Returns the number of rows removed; zero is not an error.
pub async fn delete(db: &Db, user_id: Uuid, tender_id: &str) -> Result<u64> {
	let result = sqlx::query("DELETE FROM user_shortlists WHERE user_id = $1 AND tender_id = $2")
		.bind(user_id)
		.bind(tender_id)
		.execute(&db.pool)
		.await?;

	Ok(result.rows_affected())
}

pub async fn delete_many(db: &Db, user_id: Uuid, tender_ids: &[String]) -> Result<u64> {
	if tender_ids.is_empty() {
		return Ok(0);
	}

	let result =
		sqlx::query("DELETE FROM user_shortlists WHERE user_id = $1 AND tender_id = ANY($2)")
			.bind(user_id)
			.bind(tender_ids)
			.execute(&db.pool)
			.await?;

	Ok(result.rows_affected())
}
