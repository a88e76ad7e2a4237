use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Result, ScribeService};
use scribe_storage::queries;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeleteRequest {
	pub note_id: Uuid,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
	pub note_id: Uuid,
	/// Chunk rows removed with the note. Their vectors stay in the index as dead slots until the
	/// next rebuild.
	pub chunks_removed: u64,
}

impl ScribeService {
	pub async fn delete(&self, req: DeleteRequest) -> Result<DeleteResponse> {
		let chunks_removed = queries::delete_note(&self.db, req.note_id).await?;

		tracing::info!(note_id = %req.note_id, chunks_removed, "Note deleted.");

		Ok(DeleteResponse { note_id: req.note_id, chunks_removed })
	}
}
