use uuid::Uuid;

use crate::{BoxFuture, Error, Result, TenderBackend};
use tender_domain::TenderQuery;
use tender_storage::{
	db::Db,
	listing,
	models::{ListingPage, RecommendationRow, ShortlistPage},
	procedures, shortlists,
};

/// [`TenderBackend`] over the Postgres pool and the configured listing relation.
pub struct PgBackend {
	db: Db,
	listing_relation: String,
}
impl PgBackend {
	pub fn new(db: Db, listing_relation: impl Into<String>) -> Self {
		Self { db, listing_relation: listing_relation.into() }
	}

	pub fn db(&self) -> &Db {
		&self.db
	}
}

impl TenderBackend for PgBackend {
	fn fetch_page<'a>(&'a self, query: &'a TenderQuery) -> BoxFuture<'a, Result<ListingPage>> {
		Box::pin(async move {
			Ok(listing::fetch_page(&self.db, &self.listing_relation, query).await?)
		})
	}

	fn sample_values<'a>(
		&'a self,
		column: &'a str,
		prefix: &'a str,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<String>>> {
		Box::pin(async move {
			Ok(listing::sample_values(&self.db, &self.listing_relation, column, prefix, limit)
				.await?)
		})
	}

	fn text_columns<'a>(&'a self) -> BoxFuture<'a, Result<Vec<String>>> {
		Box::pin(async move { Ok(listing::text_columns(&self.db, &self.listing_relation).await?) })
	}

	fn insert_shortlist<'a>(
		&'a self,
		user_id: Uuid,
		tender_id: &'a str,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move { Ok(shortlists::insert(&self.db, user_id, tender_id).await?) })
	}

	fn delete_shortlist<'a>(
		&'a self,
		user_id: Uuid,
		tender_id: &'a str,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			let removed = shortlists::delete(&self.db, user_id, tender_id).await?;

			if removed == 0 {
				tracing::debug!(%user_id, tender_id, "Shortlist entry was already absent.");
			}

			Ok(())
		})
	}

	fn delete_shortlists<'a>(
		&'a self,
		user_id: Uuid,
		tender_ids: &'a [String],
	) -> BoxFuture<'a, Result<u64>> {
		Box::pin(async move { Ok(shortlists::delete_many(&self.db, user_id, tender_ids).await?) })
	}

	fn recommended<'a>(
		&'a self,
		user_id: Uuid,
		limit: u32,
		offset: u32,
	) -> BoxFuture<'a, Result<Vec<RecommendationRow>>> {
		Box::pin(async move {
			procedures::recommended_tenders_with_count(&self.db, user_id, limit, offset)
				.await
				.map_err(Error::from)
		})
	}

	fn shortlisted<'a>(
		&'a self,
		user_id: Uuid,
		limit: u32,
		offset: u32,
	) -> BoxFuture<'a, Result<ShortlistPage>> {
		Box::pin(async move {
			procedures::shortlisted_tenders_json(&self.db, user_id, limit, offset)
				.await
				.map_err(Error::from)
		})
	}
}
