use std::path::PathBuf;

use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub chunking: Chunking,
	#[serde(default)]
	pub search: Search,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	#[serde(default = "default_log_level")]
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub sqlite: Sqlite,
	pub index: VectorIndex,
}

#[derive(Debug, Deserialize)]
pub struct Sqlite {
	/// Database file. Created on first connect, together with its parent directory.
	pub path: PathBuf,
	pub pool_max_conns: u32,
}

#[derive(Debug, Deserialize)]
pub struct VectorIndex {
	/// Snapshot file for the vector index.
	pub path: PathBuf,
	pub vector_dim: u32,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

/// Word-window chunking. Both values count whitespace-separated words.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Chunking {
	pub size: u32,
	pub overlap: u32,
}
impl Default for Chunking {
	fn default() -> Self {
		Self { size: 500, overlap: 50 }
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Search {
	pub top_k: u32,
}
impl Default for Search {
	fn default() -> Self {
		Self { top_k: 3 }
	}
}

fn default_log_level() -> String {
	"info".to_string()
}
