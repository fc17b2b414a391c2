use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	#[serde(default)]
	pub sources: Sources,
	#[serde(default)]
	pub search: Search,
	#[serde(default)]
	pub shortlist: Shortlist,
	#[serde(default)]
	pub recommendations: Recommendations,
	#[serde(default)]
	pub suggest: Suggest,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Service {
	pub log_level: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
	/// Table or view holding the tender listings, e.g. "tenders" or "public.tender_listing".
	#[serde(default = "default_listing_relation")]
	pub listing_relation: String,
	/// UTC offset applied to naive timestamps found in listing rows, e.g. "+05:30".
	#[serde(default = "default_local_offset")]
	pub local_offset: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

/// Values of the listing `source` column for each upstream feed.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Sources {
	pub primary: String,
	pub secondary: String,
}
impl Default for Sources {
	fn default() -> Self {
		Self { primary: "gem".to_string(), secondary: "cpwd".to_string() }
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Search {
	pub default_page_size: u32,
	pub max_page_size: u32,
	/// One of "exact" or "estimated".
	pub count_mode: String,
}
impl Default for Search {
	fn default() -> Self {
		Self { default_page_size: 20, max_page_size: 100, count_mode: "exact".to_string() }
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Shortlist {
	/// Window opened when a toggle starts, during which shortlist reads are suppressed.
	pub cooldown_ms: u64,
	/// Extra window after a toggle finishes, absorbing replication lag.
	pub settle_ms: u64,
	pub storage_key: String,
	pub reconcile_page_size: u32,
}
impl Default for Shortlist {
	fn default() -> Self {
		Self {
			cooldown_ms: 700,
			settle_ms: 300,
			storage_key: "tender.shortlist.ids".to_string(),
			reconcile_page_size: 200,
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Recommendations {
	pub max_pairs: u32,
}
impl Default for Recommendations {
	fn default() -> Self {
		Self { max_pairs: 500 }
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Suggest {
	pub sample_size: u32,
	pub top_k: u32,
}
impl Default for Suggest {
	fn default() -> Self {
		Self { sample_size: 400, top_k: 8 }
	}
}

fn default_listing_relation() -> String {
	"tenders".to_string()
}

fn default_local_offset() -> String {
	"+05:30".to_string()
}
