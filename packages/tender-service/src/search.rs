//! Query Builder: turns [`QueryParams`] into a backing-store query on one of three paths.

use serde::Serialize;
use time::OffsetDateTime;

use crate::{
	Result, TenderEngine, lock,
	recommendations::{self, RecommendationCache},
};
use tender_config::Sources;
use tender_domain::{
	AccessPath, CLOSING_SOON_WINDOW, Column, CompareOp, CountMode, EmdFilter, NormalizeContext,
	PageRange, Predicate, QueryParams, ReverseAuctionFilter, Scalar, SortKey, SortSpec,
	SourceSelector, StatusFilter, Tender, TenderQuery, TenderSource, fields, normalize, query,
};

#[derive(Clone, Debug, Serialize)]
pub struct SearchResponse {
	pub rows: Vec<Tender>,
	pub total: u64,
	pub page: u32,
	pub page_size: u32,
	pub total_pages: u64,
}
impl SearchResponse {
	pub fn empty(page: u32, page_size: u32) -> Self {
		Self { rows: Vec::new(), total: 0, page, page_size, total_pages: 0 }
	}
}

impl TenderEngine {
	/// Runs one search. Backing-store failures are logged and yield an empty page.
	pub async fn search(&self, params: &QueryParams) -> SearchResponse {
		let page_size = self.effective_page_size(params);
		let path = params.access_path();

		match self.search_inner(params, page_size).await {
			Ok(response) => response,
			Err(err) => {
				tracing::warn!(error = %err, path = ?path, page = params.page(), "Search failed.");

				SearchResponse::empty(params.page(), page_size)
			},
		}
	}

	fn effective_page_size(&self, params: &QueryParams) -> u32 {
		params
			.page_size()
			.unwrap_or(self.cfg.search.default_page_size)
			.clamp(1, self.cfg.search.max_page_size.max(1))
	}

	async fn search_inner(&self, params: &QueryParams, page_size: u32) -> Result<SearchResponse> {
		let now = OffsetDateTime::now_utc();
		let scope = match params.access_path() {
			AccessPath::Recommendations => match self.recommendation_scope().await? {
				Some(scope) => Some(scope),
				None => return Ok(SearchResponse::empty(params.page(), page_size)),
			},
			AccessPath::Shortlist => {
				if !self.is_read_safe() {
					tracing::debug!("Shortlist read suppressed while a toggle is syncing.");

					return Ok(SearchResponse::empty(params.page(), page_size));
				}

				let ids = self.shortlisted_ids();

				if ids.is_empty() {
					return Ok(SearchResponse::empty(params.page(), page_size));
				}

				Some(Predicate::is_in(fields::ID.primary(), ids))
			},
			AccessPath::Standard => None,
		};
		let search_columns = match params.search() {
			Some(_) => self.text_columns().searchable(self.collaborators.backend.as_ref()).await,
			None => Vec::new(),
		};
		let mut filters: Vec<Predicate> = scope.into_iter().collect();

		filters.extend(facet_filters(params, &search_columns, now, &self.cfg.sources));

		let query = TenderQuery {
			filters,
			sort: sort_specs(params.sort()),
			range: PageRange::for_page(params.page(), page_size),
			count: CountMode::from_config(&self.cfg.search.count_mode),
		};
		let page = self.collaborators.backend.fetch_page(&query).await?;
		let ctx =
			NormalizeContext { now, local_offset: self.local_offset, sources: &self.cfg.sources };
		let rows = {
			let curation = lock(&self.curation);

			page.rows.iter().map(|raw| normalize(raw, &ctx, |id| curation.has(id))).collect()
		};

		Ok(SearchResponse {
			rows,
			total: page.total,
			page: params.page(),
			page_size,
			total_pages: query::total_pages(page.total, page_size),
		})
	}

	/// `None` when there is nothing to recommend: signed out or an empty recommendation set.
	async fn recommendation_scope(&self) -> Result<Option<Predicate>> {
		let Some(identity) = self.resolve_identity().await? else {
			tracing::debug!("Recommendations requested while signed out.");

			return Ok(None);
		};
		let cached = lock(&self.recommendations).get(identity.user_id).map(<[_]>::to_vec);
		let pairs = match cached {
			Some(pairs) => pairs,
			None => {
				let max_pairs = self.cfg.recommendations.max_pairs;
				let rows =
					self.collaborators.backend.recommended(identity.user_id, max_pairs, 0).await?;

				if let Some(first) = rows.first()
					&& usize::try_from(first.total_count).unwrap_or(0) > rows.len()
				{
					tracing::info!(
						total = first.total_count,
						kept = rows.len(),
						"Recommendation set truncated."
					);
				}

				let pairs = recommendations::pairs_from_rows(&rows, &self.cfg.sources);

				store_recommendations(&mut lock(&self.recommendations), identity.user_id, &pairs);

				pairs
			},
		};

		if pairs.is_empty() {
			return Ok(None);
		}

		let scope = recommendations::ids_by_source(&pairs)
			.into_iter()
			.map(|(source, ids)| {
				Predicate::all(vec![
					source_predicate(source, &self.cfg.sources),
					Predicate::is_in(fields::ID.primary(), ids),
				])
			})
			.collect();

		Ok(Some(Predicate::any(scope)))
	}
}

fn store_recommendations(
	cache: &mut RecommendationCache,
	owner: uuid::Uuid,
	pairs: &[tender_domain::RecommendationPair],
) {
	if let Some(previous) = cache.owner()
		&& previous != owner
	{
		tracing::debug!("Identity changed; replacing cached recommendations.");
		cache.invalidate();
	}

	cache.store(owner, pairs.to_vec());
}

/// Facet predicates, ANDed by the caller.
pub fn facet_filters(
	params: &QueryParams,
	search_columns: &[String],
	now: OffsetDateTime,
	sources: &Sources,
) -> Vec<Predicate> {
	let mut filters = Vec::new();

	if let Some(term) = params.search() {
		let pattern = format!("%{}%", query::escape_like(term));

		filters.push(Predicate::any(
			search_columns.iter().map(|column| Predicate::ilike(column, pattern.clone())).collect(),
		));
	}
	if let Some(status) = status_predicate(params.status(), now) {
		filters.push(status);
	}

	let emd = fields::EMD_AMOUNT.primary();

	match params.emd() {
		EmdFilter::Any => {},
		EmdFilter::Required =>
			filters.push(Predicate::compare(emd, CompareOp::Gt, Scalar::Float(0.0))),
		EmdFilter::NotRequired => filters.push(Predicate::any(vec![
			Predicate::is_null(emd),
			Predicate::eq(emd, Scalar::Float(0.0)),
		])),
	}

	let reverse_auction = fields::REVERSE_AUCTION.primary();

	match params.reverse_auction() {
		ReverseAuctionFilter::Any => {},
		ReverseAuctionFilter::Enabled =>
			filters.push(Predicate::eq(reverse_auction, Scalar::Bool(true))),
		ReverseAuctionFilter::Disabled => filters.push(Predicate::any(vec![
			Predicate::is_null(reverse_auction),
			Predicate::eq(reverse_auction, Scalar::Bool(false)),
		])),
	}

	// Case-insensitive equality: escaped, no wildcards.
	if let Some(bid_type) = params.bid_type() {
		filters.push(Predicate::ilike(fields::BID_TYPE.primary(), query::escape_like(bid_type)));
	}
	if let Some(method) = params.evaluation_method() {
		filters
			.push(Predicate::ilike(fields::EVALUATION_METHOD.primary(), query::escape_like(method)));
	}

	match params.source() {
		SourceSelector::All => {},
		SourceSelector::Primary => filters.push(source_predicate(TenderSource::Primary, sources)),
		SourceSelector::Secondary =>
			filters.push(source_predicate(TenderSource::Secondary, sources)),
	}

	filters
}

/// Deadline as the normalizer reads it: the first alias column holding a timestamp.
pub fn deadline_column() -> Column {
	Column::first_timestamp(fields::DEADLINE.columns)
}

/// Status facets partition rows exactly like the derived status does.
pub fn status_predicate(status: StatusFilter, now: OffsetDateTime) -> Option<Predicate> {
	let deadline = deadline_column();
	let soon = now + CLOSING_SOON_WINDOW;

	match status {
		StatusFilter::All | StatusFilter::Shortlisted => None,
		StatusFilter::Active => Some(Predicate::any(vec![
			Predicate::is_null(deadline.clone()),
			Predicate::compare(deadline, CompareOp::Gt, Scalar::Timestamp(soon)),
		])),
		StatusFilter::ClosingSoon => Some(Predicate::all(vec![
			Predicate::compare(deadline.clone(), CompareOp::Gt, Scalar::Timestamp(now)),
			Predicate::compare(deadline, CompareOp::Lte, Scalar::Timestamp(soon)),
		])),
		StatusFilter::Closed =>
			Some(Predicate::compare(deadline, CompareOp::Lte, Scalar::Timestamp(now))),
	}
}

/// Rows without a source value predate the secondary feed and count as primary.
pub fn source_predicate(source: TenderSource, sources: &Sources) -> Predicate {
	let column = fields::SOURCE.primary();
	let code = Predicate::eq(column, Scalar::Text(source.code(sources).to_string()));

	match source {
		TenderSource::Primary => Predicate::any(vec![code, Predicate::is_null(column)]),
		TenderSource::Secondary => code,
	}
}

/// Sort columns for `key`, always ending with the id tie-break.
pub fn sort_specs(key: SortKey) -> Vec<SortSpec> {
	let primary = match key {
		SortKey::Newest => SortSpec::desc(fields::PUBLISHED_AT.primary()),
		SortKey::DeadlineSoonest => SortSpec::asc(deadline_column()),
		SortKey::DeadlineLatest => SortSpec::desc(deadline_column()),
		SortKey::ValueHigh => SortSpec::desc(fields::ESTIMATED_VALUE.primary()),
		SortKey::ValueLow => SortSpec::asc(fields::ESTIMATED_VALUE.primary()),
		SortKey::EmdHigh => SortSpec::desc(fields::EMD_AMOUNT.primary()),
	};

	vec![primary, SortSpec::asc(fields::ID.primary())]
}
