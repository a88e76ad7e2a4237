use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, ScribeService};
use scribe_storage::{
	index::{IndexError, IndexHit, Slot, VectorIndex},
	queries,
};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchRequest {
	pub query: String,
	/// Defaults to `search.top_k` from the config.
	#[serde(default)]
	pub top_k: Option<u32>,
	/// Keeps only hits from this note. Applied after the global top-k, so a narrow note may
	/// yield fewer than `top_k` items even when more of its chunks exist.
	#[serde(default)]
	pub note_id: Option<Uuid>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchItem {
	pub chunk_id: Uuid,
	pub note_id: Uuid,
	pub chunk_index: i64,
	pub index_slot: Slot,
	pub title: Option<String>,
	pub content: String,
	pub audio_ref: Option<String>,
	pub start_time: Option<f64>,
	pub end_time: Option<f64>,
	pub distance: f32,
	pub score: f32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchResponse {
	pub items: Vec<SearchItem>,
}

impl ScribeService {
	/// Nearest chunks to `query`, best first. An empty index yields no items.
	pub async fn search(&self, req: SearchRequest) -> Result<SearchResponse> {
		let query = req.query.trim();

		if query.is_empty() {
			return Err(Error::InvalidRequest { message: "query must be non-empty.".to_string() });
		}

		let top_k = req.top_k.unwrap_or(self.cfg.search.top_k);

		if top_k == 0 {
			return Err(Error::InvalidRequest {
				message: "top_k must be greater than zero.".to_string(),
			});
		}
		if let Some(note_id) = req.note_id
			&& queries::get_note(&self.db.pool, note_id).await?.is_none()
		{
			return Err(Error::NotFound { message: format!("Note {note_id} does not exist.") });
		}

		let vector = self.query_vector(query).await?;
		// Held through resolution so slots are read against the numbering that produced them.
		let index = self.index.read().await;
		let hits = nearest(&index, &vector, top_k)?;
		let slots: Vec<Slot> = hits.iter().map(|hit| hit.slot).collect();
		let mut resolved = queries::lookup_chunks_by_slots(&self.db, &slots).await?;

		drop(index);

		let mut items = Vec::with_capacity(hits.len());

		for hit in &hits {
			let Some(chunk) = resolved.remove(&hit.slot) else {
				continue;
			};

			if req.note_id.is_some_and(|note_id| note_id != chunk.note_id) {
				continue;
			}

			items.push(SearchItem {
				chunk_id: chunk.chunk_id,
				note_id: chunk.note_id,
				chunk_index: chunk.chunk_index,
				index_slot: hit.slot,
				title: chunk.title,
				content: chunk.content,
				audio_ref: chunk.audio_ref,
				start_time: chunk.start_time,
				end_time: chunk.end_time,
				distance: hit.distance,
				score: hit.score(),
			});
		}

		items.sort_by(|a, b| {
			b.score.total_cmp(&a.score).then_with(|| a.index_slot.cmp(&b.index_slot))
		});

		tracing::debug!(
			top_k,
			hits = hits.len(),
			items = items.len(),
			note_filter = req.note_id.is_some(),
			"Search completed."
		);

		Ok(SearchResponse { items })
	}

	/// Raw index hits for `query` without catalog resolution. Slots of deleted notes still show
	/// up here.
	pub async fn nearest_slots(&self, query: &str, k: u32) -> Result<Vec<IndexHit>> {
		if query.trim().is_empty() {
			return Err(Error::InvalidRequest { message: "query must be non-empty.".to_string() });
		}

		let vector = self.query_vector(query.trim()).await?;

		nearest(&*self.index.read().await, &vector, k)
	}

	async fn query_vector(&self, query: &str) -> Result<Vec<f32>> {
		let vectors = self.embed(&[query.to_string()]).await?;

		vectors.into_iter().next().ok_or_else(|| Error::Provider {
			message: "Embedding provider returned no vectors.".to_string(),
		})
	}
}

fn nearest(index: &VectorIndex, vector: &[f32], k: u32) -> Result<Vec<IndexHit>> {
	match index.search(vector, k as usize) {
		Ok(hits) => Ok(hits),
		Err(IndexError::EmptyIndex) => Ok(Vec::new()),
		Err(err) => Err(err.into()),
	}
}
