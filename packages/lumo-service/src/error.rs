pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
}
impl From<lumo_storage::Error> for Error {
	fn from(err: lumo_storage::Error) -> Self {
		match err {
			lumo_storage::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
			lumo_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
		}
	}
}

impl From<lumo_providers::Error> for Error {
	fn from(err: lumo_providers::Error) -> Self {
		Self::Provider { message: err.to_string() }
	}
}
