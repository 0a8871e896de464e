use std::{
	collections::HashSet,
	fs::File,
	io::BufReader,
	path::Path,
};

use jieba_rs::Jieba;
use regex::Regex;

use crate::{Error, Result};

pub const DEFAULT_MAX_KEYWORDS: usize = 10;

const DEFAULT_STOPWORDS: [&str; 33] = [
	"请", "帮我", "帮忙", "一下", "一个", "一份", "一些", "找", "寻找", "想要", "想找", "给我",
	"有没有", "图片", "照片", "图", "的", "与", "关于", "有关", "相关的", "下", "呢", "吗", "了",
	"和", "是", "你", "这个", "那个", "相关", "搜索", "推荐",
];
const DEFAULT_SYNONYMS: [(&str, &[&str]); 2] = [
	("实习鉴定表", &["实习评价表", "实践鉴定表", "实习证明", "鉴定表", "实习考核表"]),
	("鉴定表", &["评价表", "考核表", "证明"]),
];

const TRAILING_PARTICLES: &str = r"[吗嘛呢吧呀啊哦哇啦喽呗～~。！？!,，、\s]+$";
const QUOTED_PHRASE: &str = r#"["“”‘’']([^"“”‘’']+)["“”‘’']"#;
const BRACKET_CHARS: &str = r#"["“”‘’'\[\]{}()（）]+"#;
const NON_WORD_CHARS: &str = r"[^0-9A-Za-z\x{4E00}-\x{9FA5}]+";
const DISPLAY_SUFFIX: &str = r"(有关|相关|关于|图片|照片|图)+$";

/// Process-wide text resources shared by every query.
///
/// Built once at start-up and passed by reference into normalization, tokenization, filtering and
/// synonym expansion so the pipeline can be exercised with alternate dictionaries.
pub struct Lexicon {
	segmenter: Jieba,
	stopwords: HashSet<String>,
	synonyms: Vec<(String, Vec<String>)>,
	max_keywords: usize,
	pub(crate) trailing_particles: Regex,
	pub(crate) quoted_phrase: Regex,
	pub(crate) bracket_chars: Regex,
	pub(crate) non_word_chars: Regex,
	pub(crate) display_suffix: Regex,
}
impl Lexicon {
	/// Built-in stopwords and aliases with the stock segmentation dictionary.
	pub fn builtin() -> Result<Self> {
		Self::with_parts(Jieba::new(), default_synonyms(), DEFAULT_MAX_KEYWORDS)
	}

	pub fn from_config(cfg: &lumo_config::Lexicon, max_keywords: usize) -> Result<Self> {
		let mut segmenter = Jieba::new();

		if let Some(path) = cfg.user_dict.as_deref() {
			load_user_dict(&mut segmenter, path)?;
		}

		for word in &cfg.user_words {
			segmenter.add_word(word.trim(), None, None);
		}

		let synonyms = match cfg.synonyms.as_ref() {
			Some(entries) => entries
				.iter()
				.map(|entry| {
					(
						entry.term.trim().to_string(),
						entry.aliases.iter().map(|alias| alias.trim().to_string()).collect(),
					)
				})
				.collect(),
			None => default_synonyms(),
		};
		let mut lexicon = Self::with_parts(segmenter, synonyms, max_keywords)?;

		for word in &cfg.extra_stopwords {
			lexicon.stopwords.insert(word.trim().to_string());
		}

		Ok(lexicon)
	}

	fn with_parts(
		segmenter: Jieba,
		synonyms: Vec<(String, Vec<String>)>,
		max_keywords: usize,
	) -> Result<Self> {
		Ok(Self {
			segmenter,
			stopwords: DEFAULT_STOPWORDS.iter().map(|word| word.to_string()).collect(),
			synonyms,
			max_keywords: max_keywords.max(1),
			trailing_particles: Regex::new(TRAILING_PARTICLES)?,
			quoted_phrase: Regex::new(QUOTED_PHRASE)?,
			bracket_chars: Regex::new(BRACKET_CHARS)?,
			non_word_chars: Regex::new(NON_WORD_CHARS)?,
			display_suffix: Regex::new(DISPLAY_SUFFIX)?,
		})
	}

	pub fn is_stopword(&self, token: &str) -> bool {
		self.stopwords.contains(token)
	}

	pub fn synonyms(&self) -> &[(String, Vec<String>)] {
		&self.synonyms
	}

	pub fn max_keywords(&self) -> usize {
		self.max_keywords
	}

	/// Dictionary-aware segmentation with empty segments removed.
	pub fn segment(&self, text: &str) -> Vec<String> {
		self.segmenter
			.cut(text, true)
			.into_iter()
			.map(str::trim)
			.filter(|segment| !segment.is_empty())
			.map(str::to_string)
			.collect()
	}
}

fn default_synonyms() -> Vec<(String, Vec<String>)> {
	DEFAULT_SYNONYMS
		.iter()
		.map(|(term, aliases)| {
			(term.to_string(), aliases.iter().map(|alias| alias.to_string()).collect())
		})
		.collect()
}

fn load_user_dict(segmenter: &mut Jieba, path: &Path) -> Result<()> {
	let file = File::open(path)
		.map_err(|err| Error::ReadDictionary { path: path.to_path_buf(), source: err })?;
	let mut reader = BufReader::new(file);

	segmenter
		.load_dict(&mut reader)
		.map_err(|err| Error::LoadDictionary { path: path.to_path_buf(), message: err.to_string() })
}
