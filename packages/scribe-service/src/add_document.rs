use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Error, Result, ScribeService};
use scribe_chunking::Segment;
use scribe_storage::{
	index::Slot,
	models::{NewChunk, Note},
	queries,
};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AddDocumentRequest {
	pub content: String,
	#[serde(default)]
	pub title: Option<String>,
	#[serde(default)]
	pub audio_ref: Option<String>,
	/// Transcript segments in document order, used to attach time ranges to chunks.
	#[serde(default)]
	pub segments: Option<Vec<Segment>>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AddDocumentResponse {
	pub note_id: Uuid,
	pub chunk_count: u32,
	/// Index slots of the note's chunks, in chunk order.
	pub slots: Vec<Slot>,
}

impl ScribeService {
	/// Chunks, embeds, and stores a document as one note.
	///
	/// The catalog is either fully updated or untouched. The vector index is appended and
	/// snapshotted before the catalog commits, so a late failure can leave dead slots in the index
	/// but never a chunk row pointing at a slot the index lacks.
	pub async fn add_document(&self, req: AddDocumentRequest) -> Result<AddDocumentResponse> {
		if req.content.trim().is_empty() {
			return Err(Error::InvalidRequest {
				message: "content must be non-empty.".to_string(),
			});
		}

		let chunks = scribe_chunking::chunk_document(
			&req.content,
			&self.chunking_config(),
			req.segments.as_deref(),
		)?;
		let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
		let vectors = self.embed(&texts).await?;
		let now = OffsetDateTime::now_utc();
		let note = Note {
			note_id: Uuid::new_v4(),
			title: crate::normalize_optional(req.title),
			content: req.content,
			summary: None,
			audio_ref: crate::normalize_optional(req.audio_ref),
			created_at: now,
			updated_at: now,
		};
		let _ingest = self.ingest.lock().await;
		let first_slot = self.index.read().await.next_slot();
		let mut rows = Vec::with_capacity(chunks.len());

		for (position, chunk) in chunks.into_iter().enumerate() {
			let Some(index_slot) =
				Slot::try_from(position).ok().and_then(|offset| first_slot.checked_add(offset))
			else {
				return Err(Error::Index {
					message: "Vector index slot space is exhausted.".to_string(),
				});
			};

			rows.push(NewChunk {
				chunk_index: chunk.chunk_index,
				content: chunk.text,
				index_slot,
				start_time: chunk.start_time,
				end_time: chunk.end_time,
			});
		}

		let mut tx = self.db.pool.begin().await?;

		queries::insert_note_tx(&mut tx, &note).await?;
		queries::insert_chunks_tx(&mut tx, note.note_id, &rows, now).await?;

		let (slots, snapshot) = {
			let mut index = self.index.write().await;
			let slots = index.add(&vectors)?;

			if slots.first().is_some_and(|slot| *slot != first_slot) {
				return Err(Error::Index {
					message: "Vector index slots moved during ingest.".to_string(),
				});
			}

			(slots, index.snapshot())
		};

		self.write_snapshot(snapshot).await?;

		tx.commit().await?;

		tracing::info!(
			note_id = %note.note_id,
			chunk_count = slots.len(),
			first_slot,
			"Document ingested."
		);

		Ok(AddDocumentResponse { note_id: note.note_id, chunk_count: slots.len() as u32, slots })
	}
}
