pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Failed to read user dictionary at {path:?}.")]
	ReadDictionary { path: std::path::PathBuf, source: std::io::Error },
	#[error("Failed to load user dictionary at {path:?}: {message}")]
	LoadDictionary { path: std::path::PathBuf, message: String },
	#[error(transparent)]
	Pattern(#[from] regex::Error),
}
