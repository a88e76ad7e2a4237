use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Result, ScribeService};
use scribe_storage::{
	index::{Slot, VectorIndex},
	queries,
};

const REEMBED_BATCH: usize = 64;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RebuildReport {
	/// Live chunks written to the new index.
	pub rebuilt_count: u64,
	/// Chunks whose vector was missing from the old index and had to be embedded again.
	pub reembedded_count: u64,
	/// Dead vectors left behind.
	pub dropped_slots: u64,
}

impl ScribeService {
	/// Compacts the index down to the chunks the catalog still references.
	///
	/// Vectors are copied from the current index when their slot is present and re-embedded
	/// otherwise. Chunk slots are rewritten to `0..n` in their previous order.
	pub async fn rebuild_index(&self) -> Result<RebuildReport> {
		let _ingest = self.ingest.lock().await;
		let chunks = queries::list_chunks_in_slot_order(&self.db.pool).await?;
		let (previous_len, mut vectors, missing) = {
			let index = self.index.read().await;
			let mut vectors = Vec::with_capacity(chunks.len());
			let mut missing = Vec::new();

			for (position, chunk) in chunks.iter().enumerate() {
				let vector =
					Slot::try_from(chunk.index_slot).ok().and_then(|slot| index.vector(slot));

				match vector {
					Some(vector) => vectors.push(vector.to_vec()),
					None => {
						vectors.push(Vec::new());
						missing.push(position);
					},
				}
			}

			(index.len(), vectors, missing)
		};

		for batch in missing.chunks(REEMBED_BATCH) {
			let texts: Vec<String> =
				batch.iter().map(|position| chunks[*position].content.clone()).collect();
			let embedded = self.embed(&texts).await?;

			for (position, vector) in batch.iter().zip(embedded) {
				vectors[*position] = vector;
			}
		}

		let mut fresh = VectorIndex::new(self.cfg.storage.index.vector_dim);
		let slots = fresh.add(&vectors)?;
		let assignments: Vec<(Uuid, Slot)> =
			chunks.iter().map(|chunk| chunk.chunk_id).zip(slots).collect();
		let mut tx = self.db.pool.begin().await?;

		queries::reassign_slots_tx(&mut tx, &assignments).await?;

		self.write_snapshot(fresh.snapshot()).await?;

		let report = RebuildReport {
			rebuilt_count: fresh.len() as u64,
			reembedded_count: missing.len() as u64,
			dropped_slots: previous_len.saturating_sub(fresh.len()) as u64,
		};
		// Readers resolve slots under the read lock, so the new numbering becomes visible
		// together with the index it belongs to.
		let mut index = self.index.write().await;

		if let Err(err) = tx.commit().await {
			if let Err(restore_err) = self.write_snapshot(index.snapshot()).await {
				tracing::error!(
					error = %restore_err,
					"Failed to restore the previous vector index snapshot."
				);
			}

			return Err(err.into());
		}

		*index = fresh;

		drop(index);

		tracing::info!(
			rebuilt_count = report.rebuilt_count,
			reembedded_count = report.reembedded_count,
			dropped_slots = report.dropped_slots,
			"Vector index rebuilt."
		);

		Ok(report)
	}
}
