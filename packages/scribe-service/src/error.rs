use scribe_storage::index::IndexError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
	#[error("Index error: {message}")]
	Index { message: String },
}
impl From<sqlx::Error> for Error {
	fn from(err: sqlx::Error) -> Self {
		Self::Storage { message: err.to_string() }
	}
}

impl From<scribe_storage::Error> for Error {
	fn from(err: scribe_storage::Error) -> Self {
		match err {
			scribe_storage::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
			scribe_storage::Error::Io { .. } => Self::Storage { message: err.to_string() },
			scribe_storage::Error::InvalidArgument(message) => Self::Storage { message },
			scribe_storage::Error::NotFound(message) => Self::NotFound { message },
			scribe_storage::Error::Index(inner) => inner.into(),
		}
	}
}

impl From<IndexError> for Error {
	fn from(err: IndexError) -> Self {
		Self::Index { message: err.to_string() }
	}
}

impl From<scribe_chunking::Error> for Error {
	fn from(err: scribe_chunking::Error) -> Self {
		match err {
			scribe_chunking::Error::InvalidConfig { message } => Self::InvalidRequest { message },
		}
	}
}

impl From<color_eyre::Report> for Error {
	fn from(err: color_eyre::Report) -> Self {
		Self::Provider { message: format!("{err:#}") }
	}
}
