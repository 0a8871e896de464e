use std::time::Duration;

use lumo_config::Config;

/// Thresholds for one request, resolved from configuration and the requested limit.
#[derive(Clone, Debug)]
pub(crate) struct SearchPolicy {
	pub(crate) limit: usize,
	pub(crate) expansion_threshold: usize,
	pub(crate) fallback_threshold: usize,
	pub(crate) min_score: f32,
	pub(crate) low_confidence_score: f32,
	pub(crate) tag_exact_score: f32,
	pub(crate) fallback: FallbackPolicy,
}
impl SearchPolicy {
	pub(crate) fn resolve(cfg: &Config, requested_limit: Option<i64>) -> Self {
		let search = &cfg.search;
		let fallback = &cfg.fallback;

		Self {
			limit: resolve_limit(requested_limit, search.default_limit, search.max_limit),
			expansion_threshold: search.expansion_threshold as usize,
			fallback_threshold: search.fallback_threshold as usize,
			min_score: search.min_score,
			low_confidence_score: search.low_confidence_score,
			tag_exact_score: search.tag_exact_score,
			fallback: FallbackPolicy {
				enabled: fallback.enabled,
				pool_size: fallback.pool_size as usize,
				score_threshold: fallback.score_threshold,
				concurrency: fallback.concurrency.max(1) as usize,
				call_timeout: Duration::from_millis(fallback.call_timeout_ms),
			},
		}
	}

	/// Rows requested from storage before scoring trims the list back to `limit`.
	pub(crate) fn fetch_limit(&self) -> i64 {
		(self.limit as i64).saturating_mul(2)
	}
}

#[derive(Clone, Debug)]
pub(crate) struct FallbackPolicy {
	pub(crate) enabled: bool,
	pub(crate) pool_size: usize,
	pub(crate) score_threshold: f32,
	pub(crate) concurrency: usize,
	pub(crate) call_timeout: Duration,
}

// A missing or zero limit means the default.
fn resolve_limit(requested: Option<i64>, default_limit: u32, max_limit: u32) -> usize {
	let max_limit = i64::from(max_limit.max(1));
	let limit = match requested {
		Some(0) | None => i64::from(default_limit),
		Some(value) => value,
	};

	limit.clamp(1, max_limit) as usize
}
