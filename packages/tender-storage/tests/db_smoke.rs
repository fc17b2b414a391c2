use serde_json::Value;
use uuid::Uuid;

use time::OffsetDateTime;

use tender_domain::{
	Column, CompareOp, CountMode, PageRange, Predicate, Scalar, SortSpec, TenderQuery, fields,
};
use tender_storage::{db::Db, listing, procedures, shortlists};
use tender_testkit::{LISTING_RELATION, TestDatabase};

async fn bootstrapped(test_db: &TestDatabase) -> Db {
	test_db.seed_listing().await.expect("Failed to seed the listing relation.")
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set TENDER_PG_DSN to run."]
async fn schema_bootstrap_is_repeatable() {
	let Some(base_dsn) = tender_testkit::env_dsn() else {
		eprintln!("Skipping schema_bootstrap_is_repeatable; set TENDER_PG_DSN to run this test.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = bootstrapped(&test_db).await;

	db.ensure_schema(LISTING_RELATION).await.expect("Second bootstrap must succeed.");

	let count: i64 = sqlx::query_scalar(
		"SELECT count(*) FROM information_schema.tables WHERE table_name = 'user_shortlists'",
	)
	.fetch_one(&db.pool)
	.await
	.expect("Failed to query schema tables.");

	assert_eq!(count, 1);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set TENDER_PG_DSN to run."]
async fn shortlist_writes_and_procedure_agree() {
	let Some(base_dsn) = tender_testkit::env_dsn() else {
		eprintln!("Skipping shortlist_writes_and_procedure_agree; set TENDER_PG_DSN to run.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = bootstrapped(&test_db).await;
	let user = Uuid::new_v4();

	shortlists::insert(&db, user, "1").await.expect("First insert must succeed.");
	shortlists::insert(&db, user, "404").await.expect("Insert of a vanished id must succeed.");

	let duplicate =
		shortlists::insert(&db, user, "1").await.expect_err("Duplicate insert must fail.");

	assert!(duplicate.is_unique_violation());

	let page = procedures::shortlisted_tenders_json(&db, user, 10, 0)
		.await
		.expect("Procedure must succeed.");

	assert_eq!(page.total, 2);

	let live = page.rows.iter().find(|entry| entry.tender_id == "1").expect("Entry 1 exists.");
	let vanished =
		page.rows.iter().find(|entry| entry.tender_id == "404").expect("Entry 404 exists.");

	assert_eq!(
		live.tender.as_ref().and_then(|row| row.get("item_title")),
		Some(&Value::from("Laptop"))
	);
	assert!(vanished.tender.is_none());

	let removed = shortlists::delete_many(&db, user, &["404".to_string(), "9".to_string()])
		.await
		.expect("Batch delete must succeed.");

	assert_eq!(removed, 1);
	assert_eq!(shortlists::delete(&db, user, "1").await.expect("Delete must succeed."), 1);
	assert_eq!(shortlists::delete(&db, user, "1").await.expect("Delete must succeed."), 0);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set TENDER_PG_DSN to run."]
async fn recommendations_report_the_full_count() {
	let Some(base_dsn) = tender_testkit::env_dsn() else {
		eprintln!("Skipping recommendations_report_the_full_count; set TENDER_PG_DSN to run.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = bootstrapped(&test_db).await;
	let user = Uuid::new_v4();

	sqlx::query(
		"\
INSERT INTO tender_recommendations (user_id, tender_id, source, score)
VALUES ($1, 1, 'gem', 0.9), ($1, 3, 'cpwd', 0.5), ($1, 2, 'gem', 0.1)",
	)
	.bind(user)
	.execute(&db.pool)
	.await
	.expect("Failed to seed recommendations.");

	let rows = procedures::recommended_tenders_with_count(&db, user, 2, 0)
		.await
		.expect("Procedure must succeed.");

	assert_eq!(rows.len(), 2);
	assert_eq!(rows[0].tender_id, 1);
	assert_eq!(rows[1].source, "cpwd");
	assert!(rows.iter().all(|row| row.total_count == 3));

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set TENDER_PG_DSN to run."]
async fn listing_queries_filter_sort_and_count() {
	let Some(base_dsn) = tender_testkit::env_dsn() else {
		eprintln!("Skipping listing_queries_filter_sort_and_count; set TENDER_PG_DSN to run.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = bootstrapped(&test_db).await;
	let query = TenderQuery {
		filters: vec![
			Predicate::ilike("ministry", "%railways%"),
			Predicate::any(vec![
				Predicate::is_null("emd_amount"),
				Predicate::eq("emd_amount", Scalar::Float(0.0)),
			]),
		],
		sort: vec![SortSpec::asc("bid_end_datetime"), SortSpec::asc("id")],
		range: PageRange::for_page(1, 1),
		count: CountMode::Exact,
	};
	let page =
		listing::fetch_page(&db, LISTING_RELATION, &query).await.expect("Query must succeed.");

	assert_eq!(page.total, 2);
	assert_eq!(page.rows.len(), 1);
	assert_eq!(page.rows[0].get("id"), Some(&Value::from(1)));

	let samples = listing::sample_values(&db, LISTING_RELATION, "ministry", "ministry of r", 10)
		.await
		.expect("Sampling must succeed.");

	assert_eq!(samples.len(), 2);

	let columns =
		listing::text_columns(&db, LISTING_RELATION).await.expect("Discovery must succeed.");

	assert_eq!(columns, vec!["source", "bid_number", "item_title", "ministry"]);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set TENDER_PG_DSN to run."]
async fn alias_deadlines_filter_and_sort() {
	let Some(base_dsn) = tender_testkit::env_dsn() else {
		eprintln!("Skipping alias_deadlines_filter_and_sort; set TENDER_PG_DSN to run.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = bootstrapped(&test_db).await;
	let deadline = Column::first_timestamp(fields::DEADLINE.columns);
	let query = TenderQuery {
		filters: vec![Predicate::compare(
			deadline.clone(),
			CompareOp::Lte,
			Scalar::Timestamp(OffsetDateTime::now_utc()),
		)],
		sort: vec![SortSpec::asc(deadline), SortSpec::asc("id")],
		range: PageRange::for_page(1, 10),
		count: CountMode::Exact,
	};
	let page =
		listing::fetch_page(&db, LISTING_RELATION, &query).await.expect("Query must succeed.");
	let ids: Vec<_> = page.rows.iter().filter_map(|row| row.get("id").cloned()).collect();

	assert_eq!(page.total, 2);
	assert_eq!(ids, vec![Value::from(4), Value::from(2)]);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
