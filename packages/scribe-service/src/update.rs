use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Result, ScribeService};
use scribe_storage::queries;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UpdateSummaryRequest {
	pub note_id: Uuid,
	/// A blank summary clears the field.
	pub summary: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UpdateSummaryResponse {
	pub note_id: Uuid,
	pub summary: Option<String>,
	#[serde(with = "crate::time_serde")]
	pub updated_at: OffsetDateTime,
}

impl ScribeService {
	pub async fn update_summary(&self, req: UpdateSummaryRequest) -> Result<UpdateSummaryResponse> {
		let summary = crate::normalize_optional(req.summary);
		let note = queries::update_summary(
			&self.db,
			req.note_id,
			summary.as_deref(),
			OffsetDateTime::now_utc(),
		)
		.await?;

		tracing::info!(
			note_id = %note.note_id,
			cleared = note.summary.is_none(),
			"Summary updated."
		);

		Ok(UpdateSummaryResponse {
			note_id: note.note_id,
			summary: note.summary,
			updated_at: note.updated_at,
		})
	}
}
