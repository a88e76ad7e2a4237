use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Error, Result, ScribeService};
use scribe_storage::queries;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NoteFetchRequest {
	pub note_id: Uuid,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NoteFetchResponse {
	pub note_id: Uuid,
	pub title: Option<String>,
	pub content: String,
	pub summary: Option<String>,
	pub audio_ref: Option<String>,
	pub chunk_count: u64,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub updated_at: OffsetDateTime,
}

impl ScribeService {
	pub async fn get_note(&self, req: NoteFetchRequest) -> Result<NoteFetchResponse> {
		let Some(note) = queries::get_note(&self.db.pool, req.note_id).await? else {
			return Err(Error::NotFound { message: format!("Note {} does not exist.", req.note_id) });
		};
		let chunk_count = queries::count_chunks_for_note(&self.db.pool, note.note_id).await?;

		Ok(NoteFetchResponse {
			note_id: note.note_id,
			title: note.title,
			content: note.content,
			summary: note.summary,
			audio_ref: note.audio_ref,
			chunk_count,
			created_at: note.created_at,
			updated_at: note.updated_at,
		})
	}
}
