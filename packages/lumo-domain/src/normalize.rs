use unicode_normalization::UnicodeNormalization;

use crate::lexicon::Lexicon;

const POLITE_PREFIXES: [&str; 18] = [
	"请帮我找一下",
	"请帮我找一份",
	"请帮我找一张",
	"请帮我找",
	"帮我找一下",
	"帮我找一份",
	"帮我找一张",
	"帮我找",
	"帮我",
	"我想找",
	"我想要",
	"我想搜",
	"想找",
	"想搜",
	"找一下",
	"帮忙找",
	"给我找",
	"麻烦帮忙找",
];
const LEADING_FILLERS: [&str; 5] = ["一份", "一张", "一个", "一些", "一条"];

/// Removes conversational framing so only the subject of the request remains.
///
/// "请帮我找一份实习鉴定表" becomes "实习鉴定表": the longest matching polite prefix goes first,
/// then one quantifier filler, leading "的", and trailing particles or punctuation.
pub fn strip_polite_prefixes(lexicon: &Lexicon, text: &str) -> String {
	let mut rest = text.trim();

	if rest.is_empty() {
		return String::new();
	}
	if let Some(prefix) =
		POLITE_PREFIXES.iter().filter(|prefix| rest.starts_with(**prefix)).max_by_key(|p| p.len())
	{
		rest = rest[prefix.len()..].trim_start();
	}
	if let Some(filler) = LEADING_FILLERS.iter().find(|filler| rest.starts_with(**filler)) {
		rest = rest[filler.len()..].trim_start();
	}

	let rest = rest.trim_start_matches('的').trim();

	lexicon.trailing_particles.replace(rest, "").trim().to_string()
}

/// Canonical query text: digits, ASCII letters and CJK ideographs separated by single spaces.
///
/// Total over any input and idempotent.
pub fn normalize_query(lexicon: &Lexicon, text: &str) -> String {
	let mut current = normalize_once(lexicon, text);

	// Stripping can expose another prefix, e.g. "请帮我找帮我找猫".
	loop {
		let next = normalize_once(lexicon, &current);

		if next == current {
			return current;
		}

		current = next;
	}
}

fn normalize_once(lexicon: &Lexicon, text: &str) -> String {
	let base = strip_polite_prefixes(lexicon, text);
	let folded: String = base.nfkc().collect();
	let spaced = lexicon.bracket_chars.replace_all(&folded, " ");
	let kept = lexicon.non_word_chars.replace_all(&spaced, " ");

	kept.split_whitespace().collect::<Vec<_>>().join(" ")
}
