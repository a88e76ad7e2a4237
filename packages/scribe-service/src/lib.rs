pub mod add_document;
pub mod admin;
pub mod context;
pub mod delete;
pub mod list;
pub mod notes;
pub mod search;
pub mod time_serde;
pub mod update;

mod error;

use std::{future::Future, pin::Pin, sync::Arc};

use tokio::sync::{Mutex, RwLock};

pub use add_document::{AddDocumentRequest, AddDocumentResponse};
pub use admin::RebuildReport;
pub use context::{build_prompt, format_context};
pub use delete::{DeleteRequest, DeleteResponse};
pub use error::{Error, Result};
pub use list::{ListItem, ListRequest, ListResponse};
pub use notes::{NoteFetchRequest, NoteFetchResponse};
pub use scribe_chunking::Segment;
pub use search::{SearchItem, SearchRequest, SearchResponse};
pub use update::{UpdateSummaryRequest, UpdateSummaryResponse};

use scribe_chunking::ChunkingConfig;
use scribe_config::{Config, EmbeddingProviderConfig};
use scribe_providers::embedding;
use scribe_storage::{
	db::Db,
	index::{Snapshot, VectorIndex},
	queries,
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>>;
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
}
impl Providers {
	pub fn new(embedding: Arc<dyn EmbeddingProvider>) -> Self {
		Self { embedding }
	}
}
impl Default for Providers {
	fn default() -> Self {
		Self { embedding: Arc::new(DefaultProviders) }
	}
}

/// Owns the catalog and the vector index for the lifetime of the process.
///
/// Writers (`add_document`, `rebuild_index`, `flush`) serialize on `ingest`, so snapshot writes
/// never race. Searches hold the index read lock from the nearest-neighbor scan through slot
/// resolution, and slot renumbering commits under the write lock, so a hit's slot always resolves
/// against the catalog numbering of the index that produced it.
pub struct ScribeService {
	pub cfg: Config,
	pub db: Db,
	pub providers: Providers,
	index: RwLock<VectorIndex>,
	ingest: Mutex<()>,
}
impl ScribeService {
	/// Connects the catalog, applies the schema, and loads the index snapshot.
	pub async fn open(cfg: Config) -> Result<Self> {
		Self::open_with_providers(cfg, Providers::default()).await
	}

	pub async fn open_with_providers(cfg: Config, providers: Providers) -> Result<Self> {
		let db = Db::connect(&cfg.storage.sqlite).await?;

		db.ensure_schema().await?;

		let index =
			VectorIndex::load_or_new(&cfg.storage.index.path, cfg.storage.index.vector_dim)?;
		let service = Self::with_providers(cfg, db, index, providers);

		service.check_slot_coverage().await?;

		Ok(service)
	}

	pub fn new(cfg: Config, db: Db, index: VectorIndex) -> Self {
		Self::with_providers(cfg, db, index, Providers::default())
	}

	pub fn with_providers(cfg: Config, db: Db, index: VectorIndex, providers: Providers) -> Self {
		Self { cfg, db, providers, index: RwLock::new(index), ingest: Mutex::new(()) }
	}

	pub async fn index_len(&self) -> usize {
		self.index.read().await.len()
	}

	/// Writes the current index snapshot to disk.
	pub async fn flush(&self) -> Result<()> {
		let _ingest = self.ingest.lock().await;
		let snapshot = self.index.read().await.snapshot();
		let vectors = snapshot.vectors();

		self.write_snapshot(snapshot).await?;

		tracing::info!(vectors, "Vector index flushed.");

		Ok(())
	}

	pub async fn shutdown(self) -> Result<()> {
		self.flush().await?;
		self.db.close().await;

		Ok(())
	}

	pub(crate) fn chunking_config(&self) -> ChunkingConfig {
		ChunkingConfig { size: self.cfg.chunking.size, overlap: self.cfg.chunking.overlap }
	}

	/// Embeds `texts` in one provider call and checks the shape of the result.
	pub(crate) async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
		let vectors = self.providers.embedding.embed(&self.cfg.providers.embedding, texts).await?;

		if vectors.len() != texts.len() {
			return Err(Error::Provider {
				message: format!(
					"Embedding provider returned {} vectors for {} inputs.",
					vectors.len(),
					texts.len()
				),
			});
		}

		let dim = self.cfg.storage.index.vector_dim as usize;

		if let Some(vector) = vectors.iter().find(|vector| vector.len() != dim) {
			return Err(Error::Provider {
				message: format!(
					"Embedding vector dimension mismatch: expected {dim}, got {}.",
					vector.len()
				),
			});
		}
		if let Some(position) =
			vectors.iter().position(|vector| vector.iter().any(|value| !value.is_finite()))
		{
			return Err(Error::Provider {
				message: format!("Embedding vector {position} has non-finite components."),
			});
		}

		Ok(vectors)
	}

	/// Writes an encoded snapshot to the configured path on the blocking pool.
	pub(crate) async fn write_snapshot(&self, snapshot: Snapshot) -> Result<()> {
		let path = self.cfg.storage.index.path.clone();

		tokio::task::spawn_blocking(move || snapshot.write(&path)).await.map_err(|err| {
			Error::Index { message: format!("Snapshot writer task failed: {err}.") }
		})??;

		Ok(())
	}

	async fn check_slot_coverage(&self) -> Result<()> {
		let Some(max_slot) = queries::max_index_slot(&self.db.pool).await? else {
			return Ok(());
		};
		let len = self.index_len().await;

		if max_slot as usize >= len {
			tracing::warn!(
				max_slot,
				index_len = len,
				"Catalog references slots beyond the vector index. Run rebuild-index to restore them."
			);
		}

		Ok(())
	}
}

struct DefaultProviders;

impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>> {
		Box::pin(async move { Ok(embedding::embed(cfg, texts).await?) })
	}
}

pub(crate) fn normalize_optional(value: Option<String>) -> Option<String> {
	value.map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}
