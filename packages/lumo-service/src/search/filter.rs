use std::cmp::Ordering;

use lumo_domain::{FieldScore, MatchField};

use crate::search::{
	merge::{MatchReason, MatchResult, ResultSet},
	policy::SearchPolicy,
};

/// Whether a scored text match is trustworthy for the number of keywords that produced it.
///
/// One keyword must hit the title or tags. Several keywords need two hits, or one hit that
/// lands on the title or tags. The score must also reach `min_score`.
pub(crate) fn accept_text_match(scored: &FieldScore, keyword_count: usize, min_score: f32) -> bool {
	if scored.fields.is_empty() {
		return false;
	}

	let strong = !scored.strong_tokens.is_empty();
	let hits = scored.hit_tokens.len();
	let regime_ok = match keyword_count {
		0 => false,
		1 => strong,
		_ => hits >= 2 || (hits == 1 && strong),
	};

	regime_ok && scored.score >= min_score
}

/// Stage ordering: score descending, then most recent first.
pub(crate) fn sort_by_score_then_recency(results: &mut [MatchResult]) {
	results.sort_by(|a, b| {
		b.score.total_cmp(&a.score).then_with(|| b.item.sort_time.cmp(&a.item.sort_time))
	});
}

/// Last pass over the merged set: drops low-confidence results, orders by score then title and
/// truncates to the request limit.
pub(crate) fn finalize(results: ResultSet, policy: &SearchPolicy) -> Vec<MatchResult> {
	let mut kept: Vec<MatchResult> = results
		.into_vec()
		.into_iter()
		.filter(|result| keep_final(result, policy.low_confidence_score))
		.collect();

	kept.sort_by(final_order);
	kept.truncate(policy.limit);

	kept
}

fn keep_final(result: &MatchResult, low_confidence_score: f32) -> bool {
	if result.matched_fields.is_empty() {
		return false;
	}

	let strong_field = result.matched_fields.iter().any(|field| field.is_strong());

	!(result.reason == MatchReason::TextMatch && !strong_field && result.score < low_confidence_score)
}

fn final_order(a: &MatchResult, b: &MatchResult) -> Ordering {
	b.score.total_cmp(&a.score).then_with(|| a.display_title().cmp(b.display_title()))
}
