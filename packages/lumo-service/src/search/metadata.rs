use std::collections::{BTreeSet, HashSet};

use lumo_domain::{MatchField, ScoredText, score};
use lumo_storage::models::CandidateItem;

use crate::{
	CandidateStore, Result,
	search::{
		filter,
		merge::{MatchReason, MatchResult, ResultSet},
		policy::SearchPolicy,
	},
};

/// Images tagged exactly with `keyword`, pinned at or above the tag-exact score.
pub(crate) async fn tag_exact(
	store: &dyn CandidateStore,
	owner_id: i64,
	keyword: &str,
	policy: &SearchPolicy,
) -> Result<ResultSet> {
	let rows = store.find_by_tag_exact(owner_id, keyword, policy.limit as i64).await?;
	let rows = dedupe(rows);
	let ids: Vec<i64> = rows.iter().map(|item| item.image_id).collect();
	let mut tags = store.load_tags_for_items(&ids).await?;
	let keywords = [keyword.to_string()];
	let mut results: Vec<MatchResult> = rows
		.into_iter()
		.map(|item| {
			let item_tags = tags.remove(&item.image_id).unwrap_or_default();
			let scored = score::score_fields(scored_text(&item, &item_tags), &keywords, "");

			MatchResult::new(
				item,
				item_tags,
				scored.score.max(policy.tag_exact_score),
				BTreeSet::from([MatchField::Tags]),
				MatchReason::TagExact,
			)
		})
		.collect();

	filter::sort_by_score_then_recency(&mut results);
	results.truncate(policy.limit);

	Ok(results.into_iter().collect())
}

/// Substring match over title, description and tags, scored and filtered per keyword regime.
pub(crate) async fn text_match(
	store: &dyn CandidateStore,
	owner_id: i64,
	keywords: &[String],
	phrase: &str,
	policy: &SearchPolicy,
) -> Result<ResultSet> {
	if keywords.is_empty() {
		return Ok(ResultSet::new());
	}

	let rows = store.search_by_keywords(owner_id, keywords, policy.fetch_limit()).await?;
	let rows = dedupe(rows);
	let ids: Vec<i64> = rows.iter().map(|item| item.image_id).collect();
	let mut tags = store.load_tags_for_items(&ids).await?;
	let fetched = rows.len();
	let mut results = Vec::new();

	for item in rows {
		let item_tags = tags.remove(&item.image_id).unwrap_or_default();
		let scored = score::score_fields(scored_text(&item, &item_tags), keywords, phrase);

		if !filter::accept_text_match(&scored, keywords.len(), policy.min_score) {
			continue;
		}

		results.push(MatchResult::new(
			item,
			item_tags,
			scored.score,
			scored.fields,
			MatchReason::TextMatch,
		));
	}

	tracing::debug!(
		keywords = keywords.len(),
		fetched,
		accepted = results.len(),
		"Text match scored."
	);

	filter::sort_by_score_then_recency(&mut results);
	results.truncate(policy.limit);

	Ok(results.into_iter().collect())
}

fn scored_text<'a>(item: &'a CandidateItem, tags: &'a [String]) -> ScoredText<'a> {
	ScoredText {
		title: item.title.as_deref().unwrap_or_default(),
		description: item.description.as_deref().unwrap_or_default(),
		tags,
	}
}

fn dedupe(rows: Vec<CandidateItem>) -> Vec<CandidateItem> {
	let mut seen = HashSet::new();

	rows.into_iter().filter(|item| seen.insert(item.image_id)).collect()
}
