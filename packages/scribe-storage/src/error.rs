use std::{io, path::PathBuf};

use crate::index::IndexError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Sqlx(#[from] sqlx::Error),
	#[error("Failed to prepare storage directory {path:?}.")]
	Io { path: PathBuf, source: io::Error },
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),
	#[error("Not found: {0}")]
	NotFound(String),
	#[error(transparent)]
	Index(#[from] IndexError),
}
