pub mod search;

mod error;

pub use error::{Error, Result};
pub use search::{
	MatchReason, MatchResult, ResultSet, SearchItem, SearchRequest, SearchResponse,
};

use std::{collections::HashMap, future::Future, path::Path, pin::Pin, sync::Arc};

use lumo_config::{Config, VisionProviderConfig};
use lumo_domain::Lexicon;
use lumo_providers::vision::{self, VisionJudgment};
use lumo_storage::{db::Db, models::CandidateItem, queries};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Read-only, owner-scoped access to the image library.
pub trait CandidateStore
where
	Self: Send + Sync,
{
	fn find_by_tag_exact<'a>(
		&'a self,
		owner_id: i64,
		tag: &'a str,
		limit: i64,
	) -> BoxFuture<'a, lumo_storage::Result<Vec<CandidateItem>>>;

	fn search_by_keywords<'a>(
		&'a self,
		owner_id: i64,
		keywords: &'a [String],
		limit: i64,
	) -> BoxFuture<'a, lumo_storage::Result<Vec<CandidateItem>>>;

	fn load_tags_for_items<'a>(
		&'a self,
		ids: &'a [i64],
	) -> BoxFuture<'a, lumo_storage::Result<HashMap<i64, Vec<String>>>>;

	fn list_recent_candidates<'a>(
		&'a self,
		owner_id: i64,
		pool_limit: i64,
	) -> BoxFuture<'a, lumo_storage::Result<Vec<CandidateItem>>>;
}

pub trait VisionJudge
where
	Self: Send + Sync,
{
	fn judge<'a>(
		&'a self,
		cfg: &'a VisionProviderConfig,
		image_path: &'a Path,
		user_message: &'a str,
	) -> BoxFuture<'a, lumo_providers::Result<VisionJudgment>>;
}

#[derive(Clone)]
pub struct Backends {
	pub store: Arc<dyn CandidateStore>,
	pub judge: Arc<dyn VisionJudge>,
}
impl Backends {
	pub fn new(store: Arc<dyn CandidateStore>, judge: Arc<dyn VisionJudge>) -> Self {
		Self { store, judge }
	}

	/// Postgres-backed store with the configured vision provider.
	pub fn with_db(db: Db) -> Self {
		Self { store: Arc::new(db), judge: Arc::new(DefaultVisionJudge) }
	}
}

pub struct LumoService {
	pub cfg: Config,
	pub lexicon: Arc<Lexicon>,
	pub backends: Backends,
}
impl LumoService {
	pub fn new(cfg: Config, lexicon: Arc<Lexicon>, db: Db) -> Self {
		Self { cfg, lexicon, backends: Backends::with_db(db) }
	}

	pub fn with_backends(cfg: Config, lexicon: Arc<Lexicon>, backends: Backends) -> Self {
		Self { cfg, lexicon, backends }
	}
}

struct DefaultVisionJudge;

impl VisionJudge for DefaultVisionJudge {
	fn judge<'a>(
		&'a self,
		cfg: &'a VisionProviderConfig,
		image_path: &'a Path,
		user_message: &'a str,
	) -> BoxFuture<'a, lumo_providers::Result<VisionJudgment>> {
		Box::pin(vision::judge(cfg, image_path, user_message))
	}
}

impl CandidateStore for Db {
	fn find_by_tag_exact<'a>(
		&'a self,
		owner_id: i64,
		tag: &'a str,
		limit: i64,
	) -> BoxFuture<'a, lumo_storage::Result<Vec<CandidateItem>>> {
		Box::pin(queries::find_by_tag_exact(self, owner_id, tag, limit))
	}

	fn search_by_keywords<'a>(
		&'a self,
		owner_id: i64,
		keywords: &'a [String],
		limit: i64,
	) -> BoxFuture<'a, lumo_storage::Result<Vec<CandidateItem>>> {
		Box::pin(queries::search_by_keywords(self, owner_id, keywords, limit))
	}

	fn load_tags_for_items<'a>(
		&'a self,
		ids: &'a [i64],
	) -> BoxFuture<'a, lumo_storage::Result<HashMap<i64, Vec<String>>>> {
		Box::pin(queries::load_tags_for_items(self, ids))
	}

	fn list_recent_candidates<'a>(
		&'a self,
		owner_id: i64,
		pool_limit: i64,
	) -> BoxFuture<'a, lumo_storage::Result<Vec<CandidateItem>>> {
		Box::pin(queries::list_recent_candidates(self, owner_id, pool_limit))
	}
}
