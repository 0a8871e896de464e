use std::{
	collections::HashMap,
	path::{Path, PathBuf},
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration,
};

use serde_json::Map;
use tempfile::TempDir;
use time::OffsetDateTime;

use lumo_config::{
	Config, Fallback, Postgres, Providers, Search, Security, Service, Storage, SynonymEntry,
	Uploads, VisionProviderConfig,
};
use lumo_domain::{Lexicon, MatchField};
use lumo_providers::vision::VisionJudgment;
use lumo_service::{
	Backends, BoxFuture, CandidateStore, Error, LumoService, MatchReason, SearchRequest,
	VisionJudge,
};
use lumo_storage::models::CandidateItem;

const OWNER: i64 = 1;

struct StoredImage {
	owner_id: i64,
	item: CandidateItem,
	tags: Vec<String>,
}

#[derive(Default)]
struct MemoryStore {
	images: Vec<StoredImage>,
	calls: AtomicUsize,
	fail: bool,
}
impl MemoryStore {
	fn add(&mut self, owner_id: i64, title: &str, description: &str, tags: &[&str]) -> i64 {
		let image_id = self.images.len() as i64 + 1;

		self.images.push(StoredImage {
			owner_id,
			item: CandidateItem {
				image_id,
				title: Some(title.to_string()),
				description: Some(description.to_string()),
				stored_path: Some(format!("img{image_id}.jpg")),
				path: None,
				sort_time: OffsetDateTime::UNIX_EPOCH + time::Duration::hours(image_id),
			},
			tags: tags.iter().map(|tag| tag.to_string()).collect(),
		});

		image_id
	}

	fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}

	fn rows<F>(&self, owner_id: i64, limit: i64, keep: F) -> lumo_storage::Result<Vec<CandidateItem>>
	where
		F: Fn(&StoredImage) -> bool,
	{
		self.calls.fetch_add(1, Ordering::SeqCst);

		if self.fail {
			return Err(lumo_storage::Error::Sqlx(sqlx::Error::PoolTimedOut));
		}

		let mut rows: Vec<CandidateItem> = self
			.images
			.iter()
			.filter(|image| image.owner_id == owner_id && keep(image))
			.map(|image| image.item.clone())
			.collect();

		rows.sort_by(|a, b| b.sort_time.cmp(&a.sort_time));
		rows.truncate(limit.max(0) as usize);

		Ok(rows)
	}
}

impl CandidateStore for MemoryStore {
	fn find_by_tag_exact<'a>(
		&'a self,
		owner_id: i64,
		tag: &'a str,
		limit: i64,
	) -> BoxFuture<'a, lumo_storage::Result<Vec<CandidateItem>>> {
		let rows = self.rows(owner_id, limit, |image| image.tags.iter().any(|name| name == tag));

		Box::pin(async move { rows })
	}

	fn search_by_keywords<'a>(
		&'a self,
		owner_id: i64,
		keywords: &'a [String],
		limit: i64,
	) -> BoxFuture<'a, lumo_storage::Result<Vec<CandidateItem>>> {
		let needles: Vec<String> = keywords.iter().map(|keyword| keyword.to_lowercase()).collect();
		let rows = self.rows(owner_id, limit, |image| {
			let mut haystacks = vec![
				image.item.title.clone().unwrap_or_default(),
				image.item.description.clone().unwrap_or_default(),
				image.item.stored_path.clone().unwrap_or_default(),
			];

			haystacks.extend(image.tags.iter().cloned());

			haystacks.iter().any(|text| {
				let text = text.to_lowercase();

				needles.iter().any(|needle| text.contains(needle.as_str()))
			})
		});

		Box::pin(async move { rows })
	}

	fn load_tags_for_items<'a>(
		&'a self,
		ids: &'a [i64],
	) -> BoxFuture<'a, lumo_storage::Result<HashMap<i64, Vec<String>>>> {
		let tags = self
			.images
			.iter()
			.filter(|image| ids.contains(&image.item.image_id) && !image.tags.is_empty())
			.map(|image| (image.item.image_id, image.tags.clone()))
			.collect();

		Box::pin(async move { Ok(tags) })
	}

	fn list_recent_candidates<'a>(
		&'a self,
		owner_id: i64,
		pool_limit: i64,
	) -> BoxFuture<'a, lumo_storage::Result<Vec<CandidateItem>>> {
		let rows = self.rows(owner_id, pool_limit, |_| true);

		Box::pin(async move { rows })
	}
}

#[derive(Clone, Copy)]
enum Script {
	Score(f32),
	Fail,
	Hang,
}

#[derive(Default)]
struct ScriptedJudge {
	scripts: HashMap<String, Script>,
	calls: AtomicUsize,
	in_flight: AtomicUsize,
	max_in_flight: AtomicUsize,
}
impl ScriptedJudge {
	fn with(scripts: Vec<(String, Script)>) -> Self {
		Self {
			scripts: scripts.into_iter().collect(),
			..Default::default()
		}
	}

	fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}

impl VisionJudge for ScriptedJudge {
	fn judge<'a>(
		&'a self,
		_cfg: &'a VisionProviderConfig,
		image_path: &'a Path,
		_user_message: &'a str,
	) -> BoxFuture<'a, lumo_providers::Result<VisionJudgment>> {
		Box::pin(async move {
			self.calls.fetch_add(1, Ordering::SeqCst);

			let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;

			self.max_in_flight.fetch_max(now, Ordering::SeqCst);

			tokio::time::sleep(Duration::from_millis(5)).await;

			let name = image_path.file_name().and_then(|name| name.to_str()).unwrap_or_default();
			let script = self.scripts.get(name).copied().unwrap_or(Script::Score(0.0));
			let outcome = match script {
				Script::Score(score) => Ok(VisionJudgment {
					match_score: score,
					suggested_tags: vec!["建议".to_string()],
					short_caption: format!("caption for {name}"),
				}),
				Script::Fail => Err(lumo_providers::Error::InvalidResponse {
					message: "Upstream returned garbage.".to_string(),
				}),
				Script::Hang => {
					std::future::pending::<()>().await;

					Ok(VisionJudgment::default())
				},
			};

			self.in_flight.fetch_sub(1, Ordering::SeqCst);

			outcome
		})
	}
}

struct Harness {
	service: LumoService,
	store: Arc<MemoryStore>,
	judge: Arc<ScriptedJudge>,
	_uploads: TempDir,
}

fn config(root_dir: PathBuf) -> Config {
	Config {
		service: Service { http_bind: "127.0.0.1:8080".to_string(), log_level: "info".to_string() },
		storage: Storage {
			postgres: Postgres { dsn: "postgres://localhost/lumo".to_string(), pool_max_conns: 1 },
			uploads: Uploads { root_dir, public_prefix: "/files".to_string() },
		},
		providers: Providers {
			vision: VisionProviderConfig {
				provider_id: "p".to_string(),
				api_base: "http://localhost".to_string(),
				api_key: "key".to_string(),
				path: "/".to_string(),
				model: "m".to_string(),
				temperature: 0.1,
				timeout_ms: 1_000,
				default_headers: Map::new(),
			},
		},
		search: Search::default(),
		fallback: Fallback { call_timeout_ms: 100, ..Default::default() },
		lexicon: lumo_config::Lexicon::default(),
		security: Security { bind_localhost_only: true, api_auth_token: None },
	}
}

fn harness_with(store: MemoryStore, judge: ScriptedJudge, lexicon: Lexicon) -> Harness {
	let uploads = tempfile::tempdir().expect("Failed to create uploads dir.");

	for image in &store.images {
		if let Some(path) = image.item.stored_path.as_deref() {
			std::fs::write(uploads.path().join(path), b"jpeg").expect("Failed to write image.");
		}
	}

	let store = Arc::new(store);
	let judge = Arc::new(judge);
	let service = LumoService::with_backends(
		config(uploads.path().to_path_buf()),
		Arc::new(lexicon),
		Backends::new(store.clone(), judge.clone()),
	);

	Harness { service, store, judge, _uploads: uploads }
}

fn harness(store: MemoryStore, judge: ScriptedJudge) -> Harness {
	harness_with(store, judge, Lexicon::builtin().expect("Failed to build lexicon."))
}

fn request(message: &str) -> SearchRequest {
	SearchRequest { message: message.to_string(), limit: None }
}

#[tokio::test]
async fn single_character_request_hits_exact_tag() {
	let mut store = MemoryStore::default();
	let cat = store.add(OWNER, "午后", "阳光很好", &["猫"]);

	for idx in 0..9 {
		store.add(OWNER, &format!("风景 {idx}"), "山和湖", &["风景"]);
	}

	let h = harness(store, ScriptedJudge::default());
	let response = h.service.search(OWNER, request("帮我找一下猫")).await.expect("Search failed.");

	assert_eq!(response.results.len(), 1);

	let hit = &response.results[0];

	assert_eq!(hit.id, cat);
	assert_eq!(hit.match_reason, MatchReason::TagExact);
	assert_eq!(hit.score, 10.0);
	assert_eq!(hit.matched_fields, vec![MatchField::Tags]);
	assert_eq!(hit.tags, vec!["猫".to_string()]);
}

#[tokio::test]
async fn exact_tag_score_survives_weaker_text_duplicate() {
	let mut store = MemoryStore::default();
	let cat = store.add(OWNER, "猫", "", &["猫"]);

	for idx in 0..5 {
		store.add(OWNER, &format!("猫咪 {idx}"), "", &[]);
	}

	let h = harness(store, ScriptedJudge::default());
	let response = h.service.search(OWNER, request("猫")).await.expect("Search failed.");
	let hit = response.results.iter().find(|item| item.id == cat).expect("Missing tagged image.");

	assert_eq!(hit.match_reason, MatchReason::TagExact);
	assert!(hit.score >= 10.0);
	assert_eq!(response.results[0].id, cat);
}

#[tokio::test]
async fn sparse_results_escalate_through_expansion_and_fallback() {
	let mut store = MemoryStore::default();

	store.add(OWNER, "beach day", "", &[]);
	store.add(OWNER, "beach walk", "", &[]);

	let seaside = store.add(OWNER, "seaside cabin", "", &[]);
	let lookalike = store.add(OWNER, "untitled", "", &[]);

	store.add(OWNER, "kitchen", "", &[]);

	let cfg = lumo_config::Lexicon {
		synonyms: Some(vec![SynonymEntry {
			term: "beach".to_string(),
			aliases: vec!["seaside".to_string(), "coast".to_string()],
		}]),
		..Default::default()
	};
	let lexicon = Lexicon::from_config(&cfg, 10).expect("Failed to build lexicon.");
	let judge = ScriptedJudge::with(vec![(format!("img{lookalike}.jpg"), Script::Score(0.9))]);
	let h = harness_with(store, judge, lexicon);
	let response = h.service.search(OWNER, request("beach")).await.expect("Search failed.");

	assert!(response.used_expansion);
	assert!(response.used_fallback);
	assert_eq!(response.expanded_keywords, vec!["seaside".to_string(), "coast".to_string()]);
	assert!(response.results.iter().any(|item| item.id == seaside));

	let visual = response.results.iter().find(|item| item.id == lookalike).expect("Missing visual hit.");

	assert_eq!(visual.match_reason, MatchReason::SemanticFallback);
	assert_eq!(visual.matched_fields, vec![MatchField::Visual]);
	assert_eq!(visual.short_caption, format!("caption for img{lookalike}.jpg"));
	assert_eq!(response.results.len(), 4);
	assert!(response.reply.starts_with("元数据命中较少"));
	assert!(response.reply.contains("4 张"));
}

#[tokio::test]
async fn fallback_still_runs_when_expansion_finds_nothing() {
	let mut store = MemoryStore::default();

	store.add(OWNER, "sunset one", "", &[]);
	store.add(OWNER, "sunset two", "", &[]);
	store.add(OWNER, "harbor", "", &[]);

	let h = harness(store, ScriptedJudge::default());
	let response = h.service.search(OWNER, request("sunset")).await.expect("Search failed.");

	assert!(!response.used_expansion);
	assert!(response.expanded_keywords.is_empty());
	assert!(response.used_fallback);
	assert_eq!(h.judge.calls(), 3);
	assert_eq!(response.results.len(), 2);
}

#[tokio::test]
async fn vision_failures_do_not_abort_the_batch() {
	let mut store = MemoryStore::default();
	let failing = store.add(OWNER, "a", "", &[]);
	let hanging = store.add(OWNER, "b", "", &[]);
	let good = store.add(OWNER, "c", "", &["旅行"]);
	let judge = ScriptedJudge::with(vec![
		(format!("img{failing}.jpg"), Script::Fail),
		(format!("img{hanging}.jpg"), Script::Hang),
		(format!("img{good}.jpg"), Script::Score(0.8)),
	]);
	let h = harness(store, judge);
	let response = h.service.search(OWNER, request("outer space")).await.expect("Search failed.");

	assert_eq!(response.results.iter().map(|item| item.id).collect::<Vec<_>>(), vec![good]);
	assert_eq!(response.results[0].tags, vec!["旅行".to_string()]);
	assert_eq!(response.results[0].suggested_tags, vec!["建议".to_string()]);
	assert_eq!(h.judge.calls(), 3);
}

#[tokio::test]
async fn fallback_skips_missing_files_and_respects_concurrency() {
	let mut store = MemoryStore::default();

	for idx in 0..8 {
		store.add(OWNER, &format!("photo {idx}"), "", &[]);
	}

	let missing = store.add(OWNER, "gone", "", &[]);
	let h = harness(store, ScriptedJudge::default());

	std::fs::remove_file(
		h.service.cfg.storage.uploads.root_dir.join(format!("img{missing}.jpg")),
	)
	.expect("Failed to remove image.");

	let response = h.service.search(OWNER, request("galaxy")).await.expect("Search failed.");

	assert!(response.used_fallback);
	assert!(response.results.is_empty());
	assert_eq!(h.judge.calls(), 8);
	assert!(h.judge.max_in_flight.load(Ordering::SeqCst) <= 4);
}

#[tokio::test]
async fn enough_metadata_results_skip_the_fallback() {
	let mut store = MemoryStore::default();

	for idx in 0..6 {
		store.add(OWNER, &format!("sunset {idx}"), "", &[]);
	}

	let h = harness(store, ScriptedJudge::default());
	let response = h.service.search(OWNER, request("sunset")).await.expect("Search failed.");

	assert_eq!(response.results.len(), 6);
	assert!(!response.used_fallback);
	assert!(!response.used_expansion);
	assert_eq!(h.judge.calls(), 0);
	assert_eq!(response.reply, "我帮你找到了 6 张与「sunset」相关的图片。");
}

#[tokio::test]
async fn description_only_single_keyword_is_filtered_out() {
	let mut store = MemoryStore::default();

	store.add(OWNER, "海边度假", "风景优美", &[]);

	let h = harness(store, ScriptedJudge::default());
	let response = h.service.search(OWNER, request("风景")).await.expect("Search failed.");

	assert!(response.results.is_empty());
	assert!(response.used_fallback);
}

#[tokio::test]
async fn unusable_query_short_circuits_without_storage() {
	let mut store = MemoryStore::default();

	store.add(OWNER, "图片", "", &[]);

	let h = harness(store, ScriptedJudge::default());
	let response = h.service.search(OWNER, request("请帮我找图片")).await.expect("Search failed.");

	assert_eq!(response.reply, "关键词过少或过于宽泛，请提供更具体的描述再试试～");
	assert!(response.results.is_empty());
	assert!(!response.used_fallback);
	assert_eq!(h.store.calls(), 0);
	assert_eq!(h.judge.calls(), 0);
}

#[tokio::test]
async fn limit_is_clamped() {
	let mut store = MemoryStore::default();

	for idx in 0..40 {
		store.add(OWNER, &format!("sunset {idx}"), "", &[]);
	}

	let h = harness(store, ScriptedJudge::default());
	let one = h
		.service
		.search(OWNER, SearchRequest { message: "sunset".to_string(), limit: Some(-5) })
		.await
		.expect("Search failed.");
	let capped = h
		.service
		.search(OWNER, SearchRequest { message: "sunset".to_string(), limit: Some(500) })
		.await
		.expect("Search failed.");
	let default = h.service.search(OWNER, request("sunset")).await.expect("Search failed.");

	assert_eq!(one.results.len(), 1);
	assert_eq!(capped.results.len(), 30);
	assert_eq!(default.results.len(), 12);
}

#[tokio::test]
async fn results_are_owner_scoped() {
	let mut store = MemoryStore::default();

	for idx in 0..6 {
		store.add(2, &format!("sunset {idx}"), "", &[]);
	}

	let mine = store.add(OWNER, "sunset mine", "", &[]);
	let h = harness(store, ScriptedJudge::default());
	let response = h.service.search(OWNER, request("sunset")).await.expect("Search failed.");

	assert_eq!(response.results.iter().map(|item| item.id).collect::<Vec<_>>(), vec![mine]);
}

#[tokio::test]
async fn empty_message_is_rejected() {
	let h = harness(MemoryStore::default(), ScriptedJudge::default());
	let err = h.service.search(OWNER, request("   ")).await.expect_err("Expected rejection.");

	assert!(matches!(err, Error::InvalidRequest { .. }), "Unexpected error: {err}");
}

#[tokio::test]
async fn storage_failures_propagate() {
	let store = MemoryStore { fail: true, ..Default::default() };
	let h = harness(store, ScriptedJudge::default());
	let err = h.service.search(OWNER, request("sunset")).await.expect_err("Expected failure.");

	assert!(matches!(err, Error::Storage { .. }), "Unexpected error: {err}");
}
