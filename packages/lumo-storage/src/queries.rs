use std::collections::HashMap;

use crate::{Error, Result, db::Db, models::CandidateItem};

const CANDIDATE_COLUMNS: &str = "\
i.id AS image_id,
	i.title,
	i.description,
	i.stored_path,
	i.path,
	COALESCE(i.taken_at, i.created_at) AS sort_time";

/// Images of `owner_id` carrying a tag named exactly `tag`, most recent first.
pub async fn find_by_tag_exact(
	db: &Db,
	owner_id: i64,
	tag: &str,
	limit: i64,
) -> Result<Vec<CandidateItem>> {
	let tag = tag.trim();

	if tag.is_empty() {
		return Ok(Vec::new());
	}

	ensure_positive_limit(limit)?;

	let sql = format!(
		"\
SELECT DISTINCT
	{CANDIDATE_COLUMNS}
FROM images i
JOIN image_tags it ON it.image_id = i.id
JOIN tags t ON t.id = it.tag_id
WHERE i.owner_id = $1 AND t.name = $2
ORDER BY sort_time DESC
LIMIT $3"
	);
	let rows = sqlx::query_as::<_, CandidateItem>(&sql)
		.bind(owner_id)
		.bind(tag)
		.bind(limit)
		.fetch_all(&db.pool)
		.await?;

	Ok(rows)
}

/// Images of `owner_id` where any keyword occurs in the title, description, a tag name or a path.
///
/// Matching is case-insensitive substring containment with `%`, `_` and `\` taken literally.
pub async fn search_by_keywords(
	db: &Db,
	owner_id: i64,
	keywords: &[String],
	limit: i64,
) -> Result<Vec<CandidateItem>> {
	let patterns: Vec<String> = keywords
		.iter()
		.map(|keyword| keyword.trim())
		.filter(|keyword| !keyword.is_empty())
		.map(|keyword| format!("%{}%", escape_like(keyword)))
		.collect();

	if patterns.is_empty() {
		return Ok(Vec::new());
	}

	ensure_positive_limit(limit)?;

	let sql = keyword_search_sql(patterns.len());
	let mut query = sqlx::query_as::<_, CandidateItem>(&sql).bind(owner_id);

	for pattern in &patterns {
		query = query.bind(pattern);
	}

	let rows = query.bind(limit).fetch_all(&db.pool).await?;

	Ok(rows)
}

/// Tag names per image id. Images without tags are absent from the map.
pub async fn load_tags_for_items(db: &Db, ids: &[i64]) -> Result<HashMap<i64, Vec<String>>> {
	if ids.is_empty() {
		return Ok(HashMap::new());
	}

	let rows: Vec<(i64, String)> = sqlx::query_as(
		"\
SELECT it.image_id, t.name
FROM image_tags it
JOIN tags t ON t.id = it.tag_id
WHERE it.image_id = ANY($1)
ORDER BY it.image_id, it.created_at, t.id",
	)
	.bind(ids)
	.fetch_all(&db.pool)
	.await?;
	let mut out: HashMap<i64, Vec<String>> = HashMap::new();

	for (image_id, name) in rows {
		let tags = out.entry(image_id).or_default();

		if !tags.contains(&name) {
			tags.push(name);
		}
	}

	Ok(out)
}

/// The `pool_limit` most recent images of `owner_id`.
pub async fn list_recent_candidates(
	db: &Db,
	owner_id: i64,
	pool_limit: i64,
) -> Result<Vec<CandidateItem>> {
	ensure_positive_limit(pool_limit)?;

	let sql = format!(
		"\
SELECT
	{CANDIDATE_COLUMNS}
FROM images i
WHERE i.owner_id = $1
ORDER BY sort_time DESC, i.id DESC
LIMIT $2"
	);
	let rows = sqlx::query_as::<_, CandidateItem>(&sql)
		.bind(owner_id)
		.bind(pool_limit)
		.fetch_all(&db.pool)
		.await?;

	Ok(rows)
}

fn ensure_positive_limit(limit: i64) -> Result<()> {
	if limit <= 0 {
		return Err(Error::InvalidArgument(format!("limit must be positive, got {limit}.")));
	}

	Ok(())
}

fn escape_like(raw: &str) -> String {
	let mut out = String::with_capacity(raw.len());

	for ch in raw.chars() {
		if matches!(ch, '\\' | '%' | '_') {
			out.push('\\');
		}

		out.push(ch);
	}

	out
}

// $1 is the owner, $2..=$n+1 the patterns, $n+2 the limit.
fn keyword_search_sql(pattern_count: usize) -> String {
	let clauses: Vec<String> = (0..pattern_count)
		.map(|idx| {
			let param = idx + 2;

			format!(
				"(i.title ILIKE ${param} OR i.description ILIKE ${param} OR t.name ILIKE ${param} \
				 OR i.stored_path ILIKE ${param} OR i.path ILIKE ${param})"
			)
		})
		.collect();

	format!(
		"\
SELECT DISTINCT
	{CANDIDATE_COLUMNS}
FROM images i
LEFT JOIN image_tags it ON it.image_id = i.id
LEFT JOIN tags t ON t.id = it.tag_id
WHERE i.owner_id = $1 AND ({})
ORDER BY sort_time DESC
LIMIT ${}",
		clauses.join(" OR "),
		pattern_count + 2,
	)
}
