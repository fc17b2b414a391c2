use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
	#[default]
	All,
	Active,
	ClosingSoon,
	Closed,
	Shortlisted,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmdFilter {
	#[default]
	Any,
	Required,
	NotRequired,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReverseAuctionFilter {
	#[default]
	Any,
	Enabled,
	Disabled,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
	#[default]
	Newest,
	DeadlineSoonest,
	DeadlineLatest,
	ValueHigh,
	ValueLow,
	EmdHigh,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceSelector {
	#[default]
	All,
	Primary,
	Secondary,
}

/// Data-access path a search takes. Each path reads a different record set.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessPath {
	Recommendations,
	Shortlist,
	Standard,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParamsError {
	#[error("Recommendations and the shortlist status filter cannot be combined.")]
	ConflictingModes,
}

/// Immutable search parameters. Build with [`QueryParams::builder`].
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct QueryParams {
	page: u32,
	page_size: Option<u32>,
	search: Option<String>,
	status: StatusFilter,
	recommendations_only: bool,
	emd: EmdFilter,
	reverse_auction: ReverseAuctionFilter,
	bid_type: Option<String>,
	evaluation_method: Option<String>,
	sort: SortKey,
	source: SourceSelector,
}
impl QueryParams {
	pub fn builder() -> QueryParamsBuilder {
		QueryParamsBuilder::default()
	}

	pub fn page(&self) -> u32 {
		self.page
	}

	/// `None` means the configured default page size.
	pub fn page_size(&self) -> Option<u32> {
		self.page_size
	}

	pub fn search(&self) -> Option<&str> {
		self.search.as_deref()
	}

	pub fn status(&self) -> StatusFilter {
		self.status
	}

	pub fn recommendations_only(&self) -> bool {
		self.recommendations_only
	}

	pub fn emd(&self) -> EmdFilter {
		self.emd
	}

	pub fn reverse_auction(&self) -> ReverseAuctionFilter {
		self.reverse_auction
	}

	pub fn bid_type(&self) -> Option<&str> {
		self.bid_type.as_deref()
	}

	pub fn evaluation_method(&self) -> Option<&str> {
		self.evaluation_method.as_deref()
	}

	pub fn sort(&self) -> SortKey {
		self.sort
	}

	pub fn source(&self) -> SourceSelector {
		self.source
	}

	pub fn access_path(&self) -> AccessPath {
		if self.recommendations_only {
			AccessPath::Recommendations
		} else if self.status == StatusFilter::Shortlisted {
			AccessPath::Shortlist
		} else {
			AccessPath::Standard
		}
	}

	/// Same parameters on another page.
	pub fn with_page(&self, page: u32) -> Self {
		Self { page: page.max(1), ..self.clone() }
	}
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct QueryParamsBuilder {
	page: Option<u32>,
	page_size: Option<u32>,
	search: Option<String>,
	status: StatusFilter,
	recommendations_only: bool,
	emd: EmdFilter,
	reverse_auction: ReverseAuctionFilter,
	bid_type: Option<String>,
	evaluation_method: Option<String>,
	sort: SortKey,
	source: SourceSelector,
}
impl QueryParamsBuilder {
	pub fn page(mut self, page: u32) -> Self {
		self.page = Some(page);

		self
	}

	pub fn page_size(mut self, page_size: u32) -> Self {
		self.page_size = Some(page_size);

		self
	}

	pub fn search(mut self, search: impl Into<String>) -> Self {
		self.search = Some(search.into());

		self
	}

	pub fn status(mut self, status: StatusFilter) -> Self {
		self.status = status;

		self
	}

	pub fn recommendations_only(mut self, enabled: bool) -> Self {
		self.recommendations_only = enabled;

		self
	}

	pub fn emd(mut self, emd: EmdFilter) -> Self {
		self.emd = emd;

		self
	}

	pub fn reverse_auction(mut self, reverse_auction: ReverseAuctionFilter) -> Self {
		self.reverse_auction = reverse_auction;

		self
	}

	pub fn bid_type(mut self, bid_type: impl Into<String>) -> Self {
		self.bid_type = Some(bid_type.into());

		self
	}

	pub fn evaluation_method(mut self, evaluation_method: impl Into<String>) -> Self {
		self.evaluation_method = Some(evaluation_method.into());

		self
	}

	pub fn sort(mut self, sort: SortKey) -> Self {
		self.sort = sort;

		self
	}

	pub fn source(mut self, source: SourceSelector) -> Self {
		self.source = source;

		self
	}

	/// Blank text filters are dropped; page is clamped to at least 1 and page size to at
	/// least 1. The upper page size bound is applied by the search service.
	pub fn build(self) -> Result<QueryParams, ParamsError> {
		if self.recommendations_only && self.status == StatusFilter::Shortlisted {
			return Err(ParamsError::ConflictingModes);
		}

		Ok(QueryParams {
			page: self.page.unwrap_or(1).max(1),
			page_size: self.page_size.map(|size| size.max(1)),
			search: non_blank(self.search),
			status: self.status,
			recommendations_only: self.recommendations_only,
			emd: self.emd,
			reverse_auction: self.reverse_auction,
			bid_type: non_blank(self.bid_type),
			evaluation_method: non_blank(self.evaluation_method),
			sort: self.sort,
			source: self.source,
		})
	}
}

fn non_blank(value: Option<String>) -> Option<String> {
	value.map(|raw| raw.trim().to_string()).filter(|raw| !raw.is_empty())
}
