use std::collections::HashSet;

use crate::{lexicon::Lexicon, normalize};

/// Phrases wrapped in straight or curly quotes, in order of appearance and without duplicates.
pub fn extract_quoted_phrases(lexicon: &Lexicon, text: &str) -> Vec<String> {
	let mut phrases: Vec<String> = Vec::new();

	for captures in lexicon.quoted_phrase.captures_iter(text) {
		let Some(inner) = captures.get(1) else { continue };
		let phrase = inner.as_str().trim();

		if !phrase.is_empty() && !phrases.iter().any(|existing| existing == phrase) {
			phrases.push(phrase.to_string());
		}
	}

	phrases
}

/// Candidate tokens for a raw message: quoted phrases first, then segmented words.
///
/// The output is not deduplicated; see [`filter_tokens`].
pub fn tokenize(lexicon: &Lexicon, raw: &str) -> Vec<String> {
	let raw = raw.trim();
	let normalized = normalize::normalize_query(lexicon, raw);

	tokenize_normalized(lexicon, raw, &normalized)
}

pub(crate) fn tokenize_normalized(lexicon: &Lexicon, raw: &str, normalized: &str) -> Vec<String> {
	if normalized.is_empty() {
		return Vec::new();
	}

	let mut tokens = extract_quoted_phrases(lexicon, raw);

	tokens.extend(lexicon.segment(normalized));

	tokens
}

/// Drops stopwords, lone non-alphanumeric characters and repeats, keeping first-seen order.
pub fn filter_tokens(lexicon: &Lexicon, tokens: &[String]) -> Vec<String> {
	let mut out = Vec::new();
	let mut seen = HashSet::new();

	for token in tokens {
		let token = token.trim();

		if token.is_empty() || lexicon.is_stopword(token) {
			continue;
		}

		let mut chars = token.chars();

		if let (Some(ch), None) = (chars.next(), chars.next())
			&& !ch.is_ascii_alphanumeric()
		{
			continue;
		}
		if seen.insert(token) {
			out.push(token.to_string());
		}
	}

	out.truncate(lexicon.max_keywords());

	out
}
