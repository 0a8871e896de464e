use std::path::PathBuf;

use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub search: Search,
	#[serde(default)]
	pub fallback: Fallback,
	#[serde(default)]
	pub lexicon: Lexicon,
	pub security: Security,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
	pub uploads: Uploads,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Deserialize)]
pub struct Uploads {
	/// Directory that stored image paths are resolved against.
	pub root_dir: PathBuf,
	/// URL prefix used to build thumbnail and cover links, e.g. "/files".
	#[serde(default = "default_public_prefix")]
	pub public_prefix: String,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub vision: VisionProviderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VisionProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Search {
	pub default_limit: u32,
	pub max_limit: u32,
	pub max_keywords: u32,
	/// Expansion runs while the merged result count is below this value.
	pub expansion_threshold: u32,
	/// The vision fallback runs while the merged result count is below this value.
	pub fallback_threshold: u32,
	/// Text matches scoring below this value are discarded.
	pub min_score: f32,
	/// Final cut-off for text matches that hit neither title nor tags.
	pub low_confidence_score: f32,
	pub tag_exact_score: f32,
}
impl Default for Search {
	fn default() -> Self {
		Self {
			default_limit: 12,
			max_limit: 30,
			max_keywords: 10,
			expansion_threshold: 5,
			fallback_threshold: 5,
			min_score: 2.5,
			low_confidence_score: 3.0,
			tag_exact_score: 10.0,
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Fallback {
	pub enabled: bool,
	pub pool_size: u32,
	pub score_threshold: f32,
	pub concurrency: u32,
	pub call_timeout_ms: u64,
}
impl Default for Fallback {
	fn default() -> Self {
		Self {
			enabled: true,
			pool_size: 80,
			score_threshold: 0.6,
			concurrency: 4,
			call_timeout_ms: 30_000,
		}
	}
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Lexicon {
	/// Optional jieba-format dictionary loaded on start-up.
	pub user_dict: Option<PathBuf>,
	pub user_words: Vec<String>,
	pub extra_stopwords: Vec<String>,
	/// Replaces the built-in alias table when present.
	pub synonyms: Option<Vec<SynonymEntry>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SynonymEntry {
	pub term: String,
	pub aliases: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct Security {
	pub bind_localhost_only: bool,
	pub api_auth_token: Option<String>,
}

fn default_public_prefix() -> String {
	"/files".to_string()
}
