use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Error, Result, ScribeService};
use scribe_storage::queries;

const DEFAULT_LIST_LIMIT: u32 = 50;
const MAX_LIST_LIMIT: u32 = 1_000;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ListRequest {
	#[serde(default)]
	pub limit: Option<u32>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ListItem {
	pub note_id: Uuid,
	pub title: Option<String>,
	pub summary: Option<String>,
	pub audio_ref: Option<String>,
	pub chunk_count: i64,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub updated_at: OffsetDateTime,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ListResponse {
	pub items: Vec<ListItem>,
}

impl ScribeService {
	/// Newest notes first.
	pub async fn list(&self, req: ListRequest) -> Result<ListResponse> {
		let limit = req.limit.unwrap_or(DEFAULT_LIST_LIMIT);

		if limit == 0 || limit > MAX_LIST_LIMIT {
			return Err(Error::InvalidRequest {
				message: format!("limit must be between 1 and {MAX_LIST_LIMIT}."),
			});
		}

		let items = queries::list_notes(&self.db.pool, limit)
			.await?
			.into_iter()
			.map(|note| ListItem {
				note_id: note.note_id,
				title: note.title,
				summary: note.summary,
				audio_ref: note.audio_ref,
				chunk_count: note.chunk_count,
				created_at: note.created_at,
				updated_at: note.updated_at,
			})
			.collect();

		Ok(ListResponse { items })
	}
}
