use std::{
	collections::BTreeSet,
	path::{Component, Path, PathBuf},
	sync::Arc,
};

use tokio::{sync::Semaphore, task::JoinSet, time};

use lumo_config::VisionProviderConfig;
use lumo_domain::MatchField;
use lumo_providers::vision::VisionJudgment;
use lumo_storage::models::CandidateItem;

use crate::{
	CandidateStore, Error, Result, VisionJudge,
	search::{
		merge::{MatchReason, MatchResult, ResultSet},
		policy::FallbackPolicy,
	},
};

pub(crate) struct FallbackArgs<'a> {
	pub(crate) store: &'a dyn CandidateStore,
	pub(crate) judge: Arc<dyn VisionJudge>,
	pub(crate) vision: Arc<VisionProviderConfig>,
	pub(crate) uploads_root: &'a Path,
	pub(crate) owner_id: i64,
	pub(crate) message: &'a str,
	pub(crate) limit: usize,
	pub(crate) policy: &'a FallbackPolicy,
}

struct Judged {
	position: usize,
	item: CandidateItem,
	judgment: VisionJudgment,
}

/// Asks the vision judge about the owner's most recent images and keeps the confident matches.
///
/// Judgments run concurrently up to the configured bound. A failed or timed-out call counts as a
/// zero score for that image only. Accepted results are ordered by judgment score, ties keeping
/// pool order.
pub(crate) async fn run(args: FallbackArgs<'_>) -> Result<ResultSet> {
	let FallbackArgs { store, judge, vision, uploads_root, owner_id, message, limit, policy } = args;
	let pool = store.list_recent_candidates(owner_id, policy.pool_size as i64).await?;
	let pool_size = pool.len();
	let semaphore = Arc::new(Semaphore::new(policy.concurrency));
	let message: Arc<str> = Arc::from(message);
	let mut tasks = JoinSet::new();

	for (position, item) in pool.into_iter().enumerate() {
		let Some(image_path) = item.storage_path().and_then(|rel| resolve_upload_path(uploads_root, rel))
		else {
			continue;
		};

		if !tokio::fs::try_exists(&image_path).await.unwrap_or(false) {
			tracing::debug!(image_id = item.image_id, "Skipping candidate without a stored file.");

			continue;
		}

		let semaphore = semaphore.clone();
		let judge = judge.clone();
		let vision = vision.clone();
		let message = message.clone();
		let call_timeout = policy.call_timeout;

		tasks.spawn(async move {
			let _permit = semaphore.acquire_owned().await.ok();
			let outcome = match time::timeout(
				call_timeout,
				judge.judge(&vision, &image_path, &message),
			)
			.await
			{
				Ok(result) => result.map_err(Error::from),
				Err(_) => Err(Error::Provider {
					message: format!("Vision call timed out after {} ms.", call_timeout.as_millis()),
				}),
			};
			let judgment = match outcome {
				Ok(judgment) => judgment,
				Err(err) => {
					tracing::warn!(
						error = %err,
						image_id = item.image_id,
						"Vision judgment failed. Scoring the image as zero."
					);

					VisionJudgment::default()
				},
			};

			Judged { position, item, judgment }
		});
	}

	let mut judged = 0_usize;
	let mut accepted = Vec::new();

	while let Some(joined) = tasks.join_next().await {
		let outcome = match joined {
			Ok(outcome) => outcome,
			Err(err) => {
				tracing::warn!(error = %err, "Vision judgment task aborted.");

				continue;
			},
		};

		judged += 1;

		if outcome.judgment.match_score >= policy.score_threshold {
			accepted.push(outcome);
		}
	}

	accepted.sort_by(|a, b| {
		b.judgment
			.match_score
			.total_cmp(&a.judgment.match_score)
			.then_with(|| a.position.cmp(&b.position))
	});
	accepted.truncate(limit);

	tracing::info!(pool_size, judged, accepted = accepted.len(), "Vision fallback finished.");

	let ids: Vec<i64> = accepted.iter().map(|entry| entry.item.image_id).collect();
	let mut tags = store.load_tags_for_items(&ids).await?;

	Ok(accepted
		.into_iter()
		.map(|Judged { item, judgment, .. }| {
			let item_tags = tags.remove(&item.image_id).unwrap_or_default();
			let mut result = MatchResult::new(
				item,
				item_tags,
				judgment.match_score,
				BTreeSet::from([MatchField::Visual]),
				MatchReason::SemanticFallback,
			);

			result.suggested_tags = judgment.suggested_tags;
			result.short_caption = judgment.short_caption;

			result
		})
		.collect())
}

/// Joins a stored relative path onto the uploads root, refusing paths that climb out of it.
fn resolve_upload_path(root: &Path, rel: &str) -> Option<PathBuf> {
	let rel = Path::new(rel.trim_start_matches(['/', '\\']));

	if rel.as_os_str().is_empty()
		|| rel.components().any(|component| !matches!(component, Component::Normal(_)))
	{
		return None;
	}

	Some(root.join(rel))
}
