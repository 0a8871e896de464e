mod fallback;
mod filter;
mod merge;
mod metadata;
mod policy;
mod reply;

pub use merge::{MatchReason, MatchResult, ResultSet, UNTITLED};

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use lumo_domain::{MatchField, Query, synonyms};

use crate::{
	Error, LumoService, Result,
	search::{
		fallback::FallbackArgs,
		policy::SearchPolicy,
		reply::{NO_KEYWORDS_REPLY, ReplyContext},
	},
};

const MAX_SHOWN_TAGS: usize = 5;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchRequest {
	pub message: String,
	/// Clamped to `[1, search.max_limit]`. Missing or zero means `search.default_limit`.
	#[serde(default)]
	pub limit: Option<i64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
	pub reply: String,
	pub results: Vec<SearchItem>,
	pub used_fallback: bool,
	pub used_expansion: bool,
	pub expanded_keywords: Vec<String>,
}
impl SearchResponse {
	fn no_keywords() -> Self {
		Self {
			reply: NO_KEYWORDS_REPLY.to_string(),
			results: Vec::new(),
			used_fallback: false,
			used_expansion: false,
			expanded_keywords: Vec::new(),
		}
	}
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchItem {
	pub id: i64,
	pub title: String,
	pub description: String,
	pub thumb_url: String,
	pub cover_url: String,
	pub tags: Vec<String>,
	pub suggested_tags: Vec<String>,
	pub short_caption: String,
	pub matched_fields: Vec<MatchField>,
	pub match_reason: MatchReason,
	pub detail_url: String,
	pub score: f32,
}
impl SearchItem {
	fn from_result(result: &MatchResult, public_prefix: &str) -> Self {
		let file_url = result
			.item
			.storage_path()
			.map(|path| format!("{public_prefix}/{}", path.trim_start_matches('/')))
			.unwrap_or_default();

		Self {
			id: result.image_id(),
			title: result.display_title().to_string(),
			description: result.item.description.clone().unwrap_or_default(),
			thumb_url: file_url.clone(),
			cover_url: file_url,
			tags: result.tags.iter().take(MAX_SHOWN_TAGS).cloned().collect(),
			suggested_tags: result.suggested_tags.clone(),
			short_caption: result.short_caption.clone(),
			matched_fields: result.matched_fields.iter().copied().collect(),
			match_reason: result.reason,
			detail_url: format!("/images/{}", result.image_id()),
			score: result.score,
		}
	}
}

impl LumoService {
	/// Runs the staged search for one owner's library.
	///
	/// Stages widen only while results are short: exact tag (single keyword), text metadata,
	/// synonym expansion, then the vision fallback. Storage failures abort the request; vision
	/// failures never do.
	pub async fn search(&self, owner_id: i64, req: SearchRequest) -> Result<SearchResponse> {
		let message = req.message.trim();

		if message.is_empty() {
			return Err(Error::InvalidRequest { message: "message must be non-empty.".to_string() });
		}

		let trace_id = Uuid::new_v4();
		let policy = SearchPolicy::resolve(&self.cfg, req.limit);
		let query = Query::parse(&self.lexicon, message);

		if !query.has_keywords() {
			tracing::info!(
				trace_id = %trace_id,
				owner_id,
				normalized = %query.normalized,
				"Search query has no usable keywords."
			);

			return Ok(SearchResponse::no_keywords());
		}

		let store = self.backends.store.as_ref();
		let mut results = ResultSet::new();

		if let [keyword] = query.keywords.as_slice() {
			results.merge(metadata::tag_exact(store, owner_id, keyword, &policy).await?);

			tracing::debug!(trace_id = %trace_id, count = results.len(), "Tag-exact stage done.");
		}
		if results.len() < policy.limit {
			results.merge(
				metadata::text_match(store, owner_id, &query.keywords, &query.normalized, &policy)
					.await?,
			);

			tracing::debug!(trace_id = %trace_id, count = results.len(), "Metadata stage done.");
		}

		let mut expanded_keywords = Vec::new();
		let mut used_expansion = false;

		if results.len() < policy.expansion_threshold {
			expanded_keywords =
				synonyms::expand_keywords(&self.lexicon, &query.keywords, &query.normalized);

			if !expanded_keywords.is_empty() {
				let widened = union_keywords(&query.keywords, &expanded_keywords);
				let more =
					metadata::text_match(store, owner_id, &widened, &query.normalized, &policy)
						.await?;

				used_expansion = !more.is_empty();

				results.merge(more);
			}

			tracing::debug!(
				trace_id = %trace_id,
				expansions = expanded_keywords.len(),
				count = results.len(),
				"Expansion stage done."
			);
		}

		let fallback_ran = policy.fallback.enabled && results.len() < policy.fallback_threshold;

		if fallback_ran {
			results.merge(
				fallback::run(FallbackArgs {
					store,
					judge: self.backends.judge.clone(),
					vision: Arc::new(self.cfg.providers.vision.clone()),
					uploads_root: &self.cfg.storage.uploads.root_dir,
					owner_id,
					message,
					limit: policy.limit,
					policy: &policy.fallback,
				})
				.await?,
			);
		}

		let finalized = filter::finalize(results, &policy);
		let reply = reply::compose(&ReplyContext {
			count: finalized.len(),
			fallback_ran,
			used_expansion,
			expanded_keywords: &expanded_keywords,
			display_keyword: &query.display_keyword(&self.lexicon),
		});
		let public_prefix = self.cfg.storage.uploads.public_prefix.as_str();

		tracing::info!(
			trace_id = %trace_id,
			owner_id,
			keywords = query.keywords.len(),
			results = finalized.len(),
			used_expansion,
			used_fallback = fallback_ran,
			"Search finished."
		);

		Ok(SearchResponse {
			reply,
			results: finalized
				.iter()
				.map(|result| SearchItem::from_result(result, public_prefix))
				.collect(),
			used_fallback: fallback_ran,
			used_expansion,
			expanded_keywords,
		})
	}
}

fn union_keywords(keywords: &[String], extra: &[String]) -> Vec<String> {
	let mut out: Vec<String> = Vec::with_capacity(keywords.len() + extra.len());

	for keyword in keywords.iter().chain(extra) {
		if !out.contains(keyword) {
			out.push(keyword.clone());
		}
	}

	out
}
