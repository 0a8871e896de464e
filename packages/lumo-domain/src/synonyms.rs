use crate::lexicon::Lexicon;

/// Alias terms for the keywords and the cleaned query that are not already among them.
///
/// A keyword matches a table entry when either string contains the other.
pub fn expand_keywords(lexicon: &Lexicon, keywords: &[String], cleaned: &str) -> Vec<String> {
	let mut base: Vec<&str> =
		keywords.iter().map(String::as_str).filter(|keyword| !keyword.is_empty()).collect();
	let cleaned = cleaned.trim();

	if !cleaned.is_empty() {
		base.push(cleaned);
	}

	let mut expansions: Vec<String> = Vec::new();

	for keyword in &base {
		for (term, aliases) in lexicon.synonyms() {
			if !(keyword.contains(term.as_str()) || term.contains(keyword)) {
				continue;
			}

			for alias in aliases {
				if !base.contains(&alias.as_str()) && !expansions.contains(alias) {
					expansions.push(alias.clone());
				}
			}
		}
	}

	expansions
}
