use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

pub const TITLE_WEIGHT: f32 = 3.0;
pub const TAGS_WEIGHT: f32 = 2.0;
pub const DESCRIPTION_WEIGHT: f32 = 1.0;
pub const PHRASE_TITLE_WEIGHT: f32 = 5.0;
pub const PHRASE_TAGS_WEIGHT: f32 = 4.0;
pub const CROSS_FIELD_BONUS: f32 = 2.0;

/// Field a result matched on. Variants sort in wire order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchField {
	Description,
	Tags,
	Title,
	Visual,
}
impl MatchField {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Description => "description",
			Self::Tags => "tags",
			Self::Title => "title",
			Self::Visual => "visual",
		}
	}

	pub fn is_strong(self) -> bool {
		matches!(self, Self::Title | Self::Tags)
	}
}

/// Searchable text of one candidate.
#[derive(Clone, Copy, Debug)]
pub struct ScoredText<'a> {
	pub title: &'a str,
	pub description: &'a str,
	pub tags: &'a [String],
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FieldScore {
	pub score: f32,
	pub fields: BTreeSet<MatchField>,
	/// Lowercased keywords that matched any field.
	pub hit_tokens: BTreeSet<String>,
	/// Lowercased keywords that matched the title or the tags.
	pub strong_tokens: BTreeSet<String>,
}
impl FieldScore {
	pub fn matched_fields(&self) -> Vec<MatchField> {
		self.fields.iter().copied().collect()
	}
}

/// Scores one candidate with case-insensitive substring containment.
///
/// Each keyword adds the weight of every field containing it. The whole `phrase`, when non-empty,
/// adds its own weight for the title and the tag text. Title and tags matching together earn
/// [`CROSS_FIELD_BONUS`].
pub fn score_fields(text: ScoredText<'_>, keywords: &[String], phrase: &str) -> FieldScore {
	let title = text.title.to_lowercase();
	let description = text.description.to_lowercase();
	let tag_text = text.tags.join(" ").to_lowercase();
	let mut out = FieldScore::default();

	for keyword in keywords {
		let keyword = keyword.trim().to_lowercase();

		if keyword.is_empty() {
			continue;
		}

		let mut hit = false;
		let mut strong = false;

		if title.contains(&keyword) {
			out.fields.insert(MatchField::Title);
			out.score += TITLE_WEIGHT;
			hit = true;
			strong = true;
		}
		if !tag_text.is_empty() && tag_text.contains(&keyword) {
			out.fields.insert(MatchField::Tags);
			out.score += TAGS_WEIGHT;
			hit = true;
			strong = true;
		}
		if description.contains(&keyword) {
			out.fields.insert(MatchField::Description);
			out.score += DESCRIPTION_WEIGHT;
			hit = true;
		}

		if strong {
			out.strong_tokens.insert(keyword.clone());
		}
		if hit {
			out.hit_tokens.insert(keyword);
		}
	}

	let phrase = phrase.trim().to_lowercase();

	if !phrase.is_empty() {
		if title.contains(&phrase) {
			out.fields.insert(MatchField::Title);
			out.score += PHRASE_TITLE_WEIGHT;
		}
		if !tag_text.is_empty() && tag_text.contains(&phrase) {
			out.fields.insert(MatchField::Tags);
			out.score += PHRASE_TAGS_WEIGHT;
		}
	}

	if out.fields.contains(&MatchField::Title) && out.fields.contains(&MatchField::Tags) {
		out.score += CROSS_FIELD_BONUS;
	}

	out
}
