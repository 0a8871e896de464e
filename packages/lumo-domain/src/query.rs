use crate::{cjk, lexicon::Lexicon, normalize, tokenize};

/// A parsed search request. Built once per request and read-only afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Query {
	pub raw: String,
	pub normalized: String,
	/// Filtered keywords shared by every matching stage. Never contains empty strings.
	pub keywords: Vec<String>,
	pub phrases: Vec<String>,
}
impl Query {
	pub fn parse(lexicon: &Lexicon, raw: &str) -> Self {
		let raw = raw.trim();
		let normalized = normalize::normalize_query(lexicon, raw);
		let tokens = tokenize::tokenize_normalized(lexicon, raw, &normalized);
		let mut keywords = tokenize::filter_tokens(lexicon, &tokens);

		// A request that boils down to one ideograph ("帮我找一下猫") keeps it as the keyword.
		if keywords.is_empty()
			&& cjk::single_ideograph(&normalized).is_some()
			&& !lexicon.is_stopword(&normalized)
		{
			keywords.push(normalized.clone());
		}

		let phrases =
			if normalized.is_empty() { Vec::new() } else { tokenize::extract_quoted_phrases(lexicon, raw) };

		Self { raw: raw.to_string(), normalized, keywords, phrases }
	}

	pub fn has_keywords(&self) -> bool {
		!self.keywords.is_empty()
	}

	/// Short label for replies that avoids echoing a whole sentence back.
	pub fn display_keyword(&self, lexicon: &Lexicon) -> String {
		if !self.keywords.is_empty() {
			return self.keywords.iter().take(3).map(String::as_str).collect::<Vec<_>>().join("、");
		}

		let collapsed = self.normalized.split_whitespace().collect::<Vec<_>>().join(" ");
		let trimmed = lexicon.display_suffix.replace(&collapsed, "");
		let cleaned = trimmed.trim_matches(|ch| ch == ' ' || ch == '的');

		if !cleaned.is_empty() {
			return cleaned.to_string();
		}

		self.raw.clone()
	}
}
