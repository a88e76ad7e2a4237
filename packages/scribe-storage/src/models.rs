use time::OffsetDateTime;
use uuid::Uuid;

use crate::index::Slot;

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct Note {
	pub note_id: Uuid,
	pub title: Option<String>,
	pub content: String,
	pub summary: Option<String>,
	pub audio_ref: Option<String>,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct Chunk {
	pub chunk_id: Uuid,
	pub note_id: Uuid,
	pub chunk_index: i64,
	pub content: String,
	pub index_slot: i64,
	pub start_time: Option<f64>,
	pub end_time: Option<f64>,
	pub created_at: OffsetDateTime,
}

/// A chunk row about to be written, already paired with its index slot.
#[derive(Clone, Debug)]
pub struct NewChunk {
	pub chunk_index: u32,
	pub content: String,
	pub index_slot: Slot,
	pub start_time: Option<f64>,
	pub end_time: Option<f64>,
}

/// A chunk resolved from an index slot, joined with the fields of its note.
#[derive(Clone, Debug, sqlx::FromRow)]
pub struct ChunkHit {
	pub chunk_id: Uuid,
	pub note_id: Uuid,
	pub chunk_index: i64,
	pub content: String,
	pub index_slot: i64,
	pub start_time: Option<f64>,
	pub end_time: Option<f64>,
	pub title: Option<String>,
	pub audio_ref: Option<String>,
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct NoteListing {
	pub note_id: Uuid,
	pub title: Option<String>,
	pub summary: Option<String>,
	pub audio_ref: Option<String>,
	pub chunk_count: i64,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}
