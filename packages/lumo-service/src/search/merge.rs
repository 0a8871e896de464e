use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use lumo_domain::MatchField;
use lumo_storage::models::CandidateItem;

pub const UNTITLED: &str = "未命名";

/// Stage that produced a result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchReason {
	TagExact,
	TextMatch,
	SemanticFallback,
}
impl MatchReason {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::TagExact => "tag_exact",
			Self::TextMatch => "text_match",
			Self::SemanticFallback => "semantic_fallback",
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct MatchResult {
	pub item: CandidateItem,
	pub tags: Vec<String>,
	pub score: f32,
	pub matched_fields: BTreeSet<MatchField>,
	pub reason: MatchReason,
	pub suggested_tags: Vec<String>,
	pub short_caption: String,
}
impl MatchResult {
	pub fn new(
		item: CandidateItem,
		tags: Vec<String>,
		score: f32,
		matched_fields: BTreeSet<MatchField>,
		reason: MatchReason,
	) -> Self {
		Self {
			item,
			tags,
			score: score.max(0.0),
			matched_fields,
			reason,
			suggested_tags: Vec::new(),
			short_caption: String::new(),
		}
	}

	pub fn image_id(&self) -> i64 {
		self.item.image_id
	}

	pub fn display_title(&self) -> &str {
		self.item.title.as_deref().map(str::trim).filter(|title| !title.is_empty()).unwrap_or(UNTITLED)
	}

	/// Folds `other`, a result for the same image, into `self`.
	///
	/// Keeps the higher score and the union of fields. The reason stays first-come, while tags,
	/// suggested tags and caption are only filled when still empty.
	fn absorb(&mut self, other: MatchResult) {
		self.score = self.score.max(other.score);
		self.matched_fields.extend(other.matched_fields);

		if self.tags.is_empty() {
			self.tags = other.tags;
		}
		if self.suggested_tags.is_empty() {
			self.suggested_tags = other.suggested_tags;
		}
		if self.short_caption.is_empty() {
			self.short_caption = other.short_caption;
		}
	}
}

/// Results keyed by image id, kept in first-insertion order.
#[derive(Clone, Debug, Default)]
pub struct ResultSet {
	entries: Vec<MatchResult>,
	index: HashMap<i64, usize>,
}
impl ResultSet {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn get(&self, image_id: i64) -> Option<&MatchResult> {
		self.index.get(&image_id).map(|&idx| &self.entries[idx])
	}

	pub fn iter(&self) -> impl Iterator<Item = &MatchResult> {
		self.entries.iter()
	}

	pub fn insert(&mut self, result: MatchResult) {
		match self.index.get(&result.image_id()) {
			Some(&idx) => self.entries[idx].absorb(result),
			None => {
				self.index.insert(result.image_id(), self.entries.len());
				self.entries.push(result);
			},
		}
	}

	pub fn merge(&mut self, other: ResultSet) {
		for result in other.entries {
			self.insert(result);
		}
	}

	pub fn into_vec(self) -> Vec<MatchResult> {
		self.entries
	}
}
impl FromIterator<MatchResult> for ResultSet {
	fn from_iter<I: IntoIterator<Item = MatchResult>>(iter: I) -> Self {
		let mut set = Self::new();

		for result in iter {
			set.insert(result);
		}

		set
	}
}
