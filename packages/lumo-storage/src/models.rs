use time::OffsetDateTime;

/// Read-only view of one stored image as seen by search.
#[derive(Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct CandidateItem {
	pub image_id: i64,
	pub title: Option<String>,
	pub description: Option<String>,
	pub stored_path: Option<String>,
	pub path: Option<String>,
	/// `COALESCE(taken_at, created_at)`.
	pub sort_time: OffsetDateTime,
}
impl CandidateItem {
	/// Location relative to the uploads root, preferring `stored_path`.
	pub fn storage_path(&self) -> Option<&str> {
		[self.stored_path.as_deref(), self.path.as_deref()]
			.into_iter()
			.flatten()
			.map(str::trim)
			.find(|path| !path.is_empty())
	}
}
