use std::sync::LazyLock;

use lumo_domain::{
	Lexicon, MatchField, Query, ScoredText, normalize, score, synonyms, tokenize,
};

static LEXICON: LazyLock<Lexicon> =
	LazyLock::new(|| Lexicon::builtin().expect("Failed to build lexicon."));

const SAMPLE_QUERIES: [&str; 12] = [
	"请帮我找一份实习鉴定表",
	"帮我找一下猫",
	"请帮我找帮我找猫",
	"我想要一张的雪山照吗？",
	"“毕业”（2023）照片!!",
	"有没有海边日落的图片呢",
	"ＡＢＣ相册 and photos",
	"   ",
	"！？。",
	"给我找一些 'campus' 和 \"golden hour\" 的照片吧~",
	"麻烦帮忙找的的猫咪",
	"sunset beach 5 A",
];

fn strings(values: &[&str]) -> Vec<String> {
	values.iter().map(|value| value.to_string()).collect()
}

#[test]
fn normalize_strips_prefix_filler_and_particles() {
	assert_eq!(normalize::normalize_query(&LEXICON, "请帮我找一份实习鉴定表"), "实习鉴定表");
}

#[test]
fn normalize_is_idempotent() {
	for raw in SAMPLE_QUERIES {
		let once = normalize::normalize_query(&LEXICON, raw);
		let twice = normalize::normalize_query(&LEXICON, &once);

		assert_eq!(once, twice, "Normalization is not idempotent for {raw:?}.");
	}
}

#[test]
fn filter_is_idempotent_bounded_and_unique() {
	for raw in SAMPLE_QUERIES {
		let tokens = tokenize::tokenize(&LEXICON, raw);
		let once = tokenize::filter_tokens(&LEXICON, &tokens);
		let twice = tokenize::filter_tokens(&LEXICON, &once);

		assert_eq!(once, twice, "Filtering is not idempotent for {raw:?}.");
		assert!(once.len() <= 10);

		for (idx, token) in once.iter().enumerate() {
			assert!(!token.is_empty());
			assert!(!once[..idx].contains(token), "Duplicate token {token:?} for {raw:?}.");
		}
	}
}

#[test]
fn filter_keeps_single_ascii_alnum_and_drops_single_ideographs() {
	let filtered = tokenize::filter_tokens(&LEXICON, &strings(&["A", "猫", "5", "海", "z"]));

	assert_eq!(filtered, strings(&["A", "5", "z"]));
}

#[test]
fn description_only_single_keyword_scores_below_minimum() {
	let query = Query::parse(&LEXICON, "风景");
	let scored = score::score_fields(
		ScoredText { title: "海边度假", description: "风景优美", tags: &[] },
		&query.keywords,
		&query.normalized,
	);

	assert_eq!(query.keywords, strings(&["风景"]));
	assert!(scored.score < 2.5);
	assert!(scored.strong_tokens.is_empty());
}

#[test]
fn single_keyword_in_title_and_tags_scores_seven() {
	let tags = strings(&["猫咪"]);
	let scored = score::score_fields(
		ScoredText { title: "猫咪午睡", description: "阳光很好", tags: &tags },
		&strings(&["猫咪"]),
		"",
	);

	assert_eq!(scored.score, 7.0);
	assert_eq!(scored.matched_fields(), vec![MatchField::Tags, MatchField::Title]);
}

#[test]
fn parsed_keywords_feed_synonym_expansion() {
	let query = Query::parse(&LEXICON, "请帮我找一份实习鉴定表");
	let expanded = synonyms::expand_keywords(&LEXICON, &query.keywords, &query.normalized);

	assert!(query.has_keywords());
	assert!(expanded.contains(&"实习证明".to_string()));
	assert!(!expanded.contains(&"实习鉴定表".to_string()));
}

#[test]
fn custom_lexicon_changes_stopwords_and_aliases() {
	let cfg = lumo_config::Lexicon {
		extra_stopwords: strings(&["photos"]),
		synonyms: Some(vec![lumo_config::SynonymEntry {
			term: "beach".to_string(),
			aliases: strings(&["seaside", "coast"]),
		}]),
		..Default::default()
	};
	let lexicon = Lexicon::from_config(&cfg, 3).expect("Failed to build lexicon.");
	let query = Query::parse(&lexicon, "beach photos with sunset and dogs");

	assert!(!query.keywords.contains(&"photos".to_string()));
	assert!(query.keywords.len() <= 3);
	assert_eq!(
		synonyms::expand_keywords(&lexicon, &query.keywords, ""),
		strings(&["seaside", "coast"])
	);
}
