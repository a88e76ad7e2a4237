mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Chunking, Config, EmbeddingProviderConfig, Providers, Search, Service, Sqlite, Storage,
	VectorIndex,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.log_level.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.log_level must be non-empty.".to_string(),
		});
	}

	for (label, path) in [
		("storage.sqlite.path", &cfg.storage.sqlite.path),
		("storage.index.path", &cfg.storage.index.path),
	] {
		if path.as_os_str().is_empty() {
			return Err(Error::Validation { message: format!("{label} must be non-empty.") });
		}
	}

	if cfg.storage.sqlite.path == cfg.storage.index.path {
		return Err(Error::Validation {
			message: "storage.sqlite.path and storage.index.path must differ.".to_string(),
		});
	}
	// A writer holds a connection while it waits for the index lock held by a searching reader.
	if cfg.storage.sqlite.pool_max_conns < 2 {
		return Err(Error::Validation {
			message: "storage.sqlite.pool_max_conns must be at least 2.".to_string(),
		});
	}
	if cfg.storage.index.vector_dim == 0 {
		return Err(Error::Validation {
			message: "storage.index.vector_dim must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions != cfg.storage.index.vector_dim {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must match storage.index.vector_dim."
				.to_string(),
		});
	}

	for (label, value) in [
		("providers.embedding.api_base", &cfg.providers.embedding.api_base),
		("providers.embedding.api_key", &cfg.providers.embedding.api_key),
		("providers.embedding.model", &cfg.providers.embedding.model),
	] {
		if value.trim().is_empty() {
			return Err(Error::Validation { message: format!("{label} must be non-empty.") });
		}
	}

	if cfg.chunking.size == 0 {
		return Err(Error::Validation {
			message: "chunking.size must be greater than zero.".to_string(),
		});
	}
	if cfg.chunking.overlap >= cfg.chunking.size {
		return Err(Error::Validation {
			message: "chunking.overlap must be less than chunking.size.".to_string(),
		});
	}
	if cfg.search.top_k == 0 {
		return Err(Error::Validation {
			message: "search.top_k must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	let embedding = &mut cfg.providers.embedding;

	embedding.api_key = embedding.api_key.trim().to_string();
	embedding.api_base = embedding.api_base.trim().trim_end_matches('/').to_string();
}
