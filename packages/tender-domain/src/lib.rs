pub mod date;
pub mod fields;
pub mod normalize;
pub mod params;
pub mod query;
pub mod status;
pub mod suggest;
pub mod sync_gate;
pub mod tender;
pub mod time_serde;

pub use normalize::{NormalizeContext, normalize};
pub use params::{
	AccessPath, EmdFilter, ParamsError, QueryParams, QueryParamsBuilder, ReverseAuctionFilter,
	SortKey, SourceSelector, StatusFilter,
};
pub use query::{Column, CompareOp, CountMode, PageRange, Predicate, Scalar, SortSpec, TenderQuery};
pub use status::{CLOSING_SOON_WINDOW, TenderStatus};
pub use suggest::{MIN_SUGGEST_PREFIX_CHARS, SuggestField};
pub use sync_gate::{GatePhase, SyncGate};
pub use tender::{RecommendationPair, Tender, TenderDocument, TenderSource};
