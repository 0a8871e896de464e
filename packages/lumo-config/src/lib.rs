mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, Fallback, Lexicon, Postgres, Providers, Search, Security, Service, Storage,
	SynonymEntry, Uploads, VisionProviderConfig,
};

use std::{fs, path::Path};

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
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}
	if cfg.storage.uploads.root_dir.as_os_str().is_empty() {
		return Err(Error::Validation {
			message: "storage.uploads.root_dir must be non-empty.".to_string(),
		});
	}

	let search = &cfg.search;

	if search.max_limit == 0 {
		return Err(Error::Validation {
			message: "search.max_limit must be greater than zero.".to_string(),
		});
	}
	if search.default_limit == 0 || search.default_limit > search.max_limit {
		return Err(Error::Validation {
			message: "search.default_limit must be in the range 1-search.max_limit.".to_string(),
		});
	}
	if search.max_keywords == 0 {
		return Err(Error::Validation {
			message: "search.max_keywords must be greater than zero.".to_string(),
		});
	}

	for (label, value) in [
		("search.min_score", search.min_score),
		("search.low_confidence_score", search.low_confidence_score),
		("search.tag_exact_score", search.tag_exact_score),
	] {
		if !value.is_finite() {
			return Err(Error::Validation { message: format!("{label} must be a finite number.") });
		}
		if value < 0.0 {
			return Err(Error::Validation { message: format!("{label} must be zero or greater.") });
		}
	}

	if search.tag_exact_score <= search.min_score {
		return Err(Error::Validation {
			message: "search.tag_exact_score must be greater than search.min_score.".to_string(),
		});
	}

	let fallback = &cfg.fallback;

	if !fallback.score_threshold.is_finite() {
		return Err(Error::Validation {
			message: "fallback.score_threshold must be a finite number.".to_string(),
		});
	}
	if !(0.0..=1.0).contains(&fallback.score_threshold) {
		return Err(Error::Validation {
			message: "fallback.score_threshold must be in the range 0.0-1.0.".to_string(),
		});
	}
	if fallback.enabled {
		if fallback.pool_size == 0 {
			return Err(Error::Validation {
				message: "fallback.pool_size must be greater than zero.".to_string(),
			});
		}
		if fallback.concurrency == 0 {
			return Err(Error::Validation {
				message: "fallback.concurrency must be greater than zero.".to_string(),
			});
		}
		if fallback.call_timeout_ms == 0 {
			return Err(Error::Validation {
				message: "fallback.call_timeout_ms must be greater than zero.".to_string(),
			});
		}
		if cfg.providers.vision.api_key.trim().is_empty() {
			return Err(Error::Validation {
				message: "Provider vision api_key must be non-empty.".to_string(),
			});
		}
	}

	if let Some(synonyms) = cfg.lexicon.synonyms.as_ref() {
		for entry in synonyms {
			if entry.term.trim().is_empty() {
				return Err(Error::Validation {
					message: "lexicon.synonyms.term must be non-empty.".to_string(),
				});
			}
			if entry.aliases.iter().any(|alias| alias.trim().is_empty()) {
				return Err(Error::Validation {
					message: format!(
						"lexicon.synonyms aliases for {:?} must be non-empty.",
						entry.term
					),
				});
			}
		}
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.security.api_auth_token.as_deref().map(|token| token.trim().is_empty()).unwrap_or(false)
	{
		cfg.security.api_auth_token = None;
	}
	if cfg
		.lexicon
		.user_dict
		.as_deref()
		.map(|path| path.as_os_str().is_empty())
		.unwrap_or(false)
	{
		cfg.lexicon.user_dict = None;
	}

	cfg.lexicon.user_words.retain(|word| !word.trim().is_empty());
	cfg.lexicon.extra_stopwords.retain(|word| !word.trim().is_empty());

	let prefix = cfg.storage.uploads.public_prefix.trim_end_matches('/').to_string();

	cfg.storage.uploads.public_prefix = prefix;
}
