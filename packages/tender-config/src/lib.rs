mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, Postgres, Recommendations, Search, Service, Shortlist, Sources, Storage, Suggest,
};

use std::{fs, path::Path};

use time::{UtcOffset, format_description::FormatItem, macros::format_description};

const OFFSET_FORMAT: &[FormatItem<'_>] =
	format_description!("[offset_hour sign:mandatory]:[offset_minute]");

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.storage.postgres.dsn.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.postgres.dsn must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}
	if !is_relation_name(&cfg.storage.listing_relation) {
		return Err(Error::Validation {
			message: "storage.listing_relation must be an unquoted identifier, optionally schema-qualified."
				.to_string(),
		});
	}

	parse_offset(&cfg.storage.local_offset)?;

	for (label, value) in
		[("sources.primary", &cfg.sources.primary), ("sources.secondary", &cfg.sources.secondary)]
	{
		if value.trim().is_empty() {
			return Err(Error::Validation { message: format!("{label} must be non-empty.") });
		}
	}

	if cfg.sources.primary == cfg.sources.secondary {
		return Err(Error::Validation {
			message: "sources.primary and sources.secondary must differ.".to_string(),
		});
	}
	if cfg.search.default_page_size == 0 {
		return Err(Error::Validation {
			message: "search.default_page_size must be greater than zero.".to_string(),
		});
	}
	if cfg.search.max_page_size < cfg.search.default_page_size {
		return Err(Error::Validation {
			message: "search.max_page_size must be at least search.default_page_size.".to_string(),
		});
	}
	if !matches!(cfg.search.count_mode.as_str(), "exact" | "estimated") {
		return Err(Error::Validation {
			message: "search.count_mode must be one of exact or estimated.".to_string(),
		});
	}
	if cfg.shortlist.cooldown_ms == 0 {
		return Err(Error::Validation {
			message: "shortlist.cooldown_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.shortlist.settle_ms > cfg.shortlist.cooldown_ms {
		return Err(Error::Validation {
			message: "shortlist.settle_ms must not exceed shortlist.cooldown_ms.".to_string(),
		});
	}
	if cfg.shortlist.storage_key.trim().is_empty() {
		return Err(Error::Validation {
			message: "shortlist.storage_key must be non-empty.".to_string(),
		});
	}
	if cfg.shortlist.reconcile_page_size == 0 {
		return Err(Error::Validation {
			message: "shortlist.reconcile_page_size must be greater than zero.".to_string(),
		});
	}
	if cfg.recommendations.max_pairs == 0 {
		return Err(Error::Validation {
			message: "recommendations.max_pairs must be greater than zero.".to_string(),
		});
	}
	if cfg.suggest.top_k == 0 {
		return Err(Error::Validation {
			message: "suggest.top_k must be greater than zero.".to_string(),
		});
	}
	if cfg.suggest.sample_size < cfg.suggest.top_k {
		return Err(Error::Validation {
			message: "suggest.sample_size must be at least suggest.top_k.".to_string(),
		});
	}

	Ok(())
}

/// Parses offsets written as `+HH:MM` or `-HH:MM`; `Z` and `UTC` are accepted as zero.
pub fn parse_offset(raw: &str) -> Result<UtcOffset> {
	let trimmed = raw.trim();

	if trimmed.eq_ignore_ascii_case("z") || trimmed.eq_ignore_ascii_case("utc") {
		return Ok(UtcOffset::UTC);
	}

	UtcOffset::parse(trimmed, OFFSET_FORMAT).map_err(|_| Error::Validation {
		message: format!("storage.local_offset '{trimmed}' must look like +05:30 or -04:00."),
	})
}

fn normalize(cfg: &mut Config) {
	cfg.storage.listing_relation = cfg.storage.listing_relation.trim().to_string();
	cfg.search.count_mode = cfg.search.count_mode.trim().to_ascii_lowercase();
	cfg.service.log_level = cfg.service.log_level.trim().to_string();

	if cfg.service.log_level.is_empty() {
		cfg.service.log_level = "info".to_string();
	}
}

fn is_relation_name(raw: &str) -> bool {
	let parts: Vec<&str> = raw.split('.').collect();

	if parts.is_empty() || parts.len() > 2 {
		return false;
	}

	parts.iter().all(|part| {
		let mut chars = part.chars();

		match chars.next() {
			Some(first) if first.is_ascii_lowercase() || first == '_' => {},
			_ => return false,
		}

		chars.all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_')
	})
}
