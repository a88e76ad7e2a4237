use std::collections::HashMap;

use sqlx::{Executor, QueryBuilder, Sqlite, SqliteConnection, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
	Error, Result,
	db::Db,
	index::Slot,
	models::{Chunk, ChunkHit, NewChunk, Note, NoteListing},
};

const SLOT_LOOKUP_BATCH: usize = 500;

pub async fn insert_note(db: &Db, note: &Note) -> Result<()> {
	insert_note_exec(&db.pool, note).await
}

pub async fn insert_note_tx(tx: &mut Transaction<'_, Sqlite>, note: &Note) -> Result<()> {
	insert_note_exec(&mut **tx, note).await
}

/// Inserts chunk rows for an existing note and returns their ids in input order.
pub async fn insert_chunks_tx(
	tx: &mut Transaction<'_, Sqlite>,
	note_id: Uuid,
	chunks: &[NewChunk],
	now: OffsetDateTime,
) -> Result<Vec<Uuid>> {
	let conn: &mut SqliteConnection = &mut *tx;
	let mut chunk_ids = Vec::with_capacity(chunks.len());

	for chunk in chunks {
		let chunk_id = Uuid::new_v4();

		sqlx::query(
			"\
INSERT INTO chunks (
	chunk_id,
	note_id,
	chunk_index,
	content,
	index_slot,
	start_time,
	end_time,
	created_at
)
VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
		)
		.bind(chunk_id)
		.bind(note_id)
		.bind(i64::from(chunk.chunk_index))
		.bind(chunk.content.as_str())
		.bind(i64::from(chunk.index_slot))
		.bind(chunk.start_time)
		.bind(chunk.end_time)
		.bind(now)
		.execute(&mut *conn)
		.await?;

		chunk_ids.push(chunk_id);
	}

	Ok(chunk_ids)
}

pub async fn get_note<'e, E>(executor: E, note_id: Uuid) -> Result<Option<Note>>
where
	E: Executor<'e, Database = Sqlite>,
{
	let note = sqlx::query_as::<_, Note>(
		"\
SELECT note_id, title, content, summary, audio_ref, created_at, updated_at
FROM notes
WHERE note_id = ?",
	)
	.bind(note_id)
	.fetch_optional(executor)
	.await?;

	Ok(note)
}

/// Replaces the summary and bumps `updated_at`, never moving it backwards.
pub async fn update_summary(
	db: &Db,
	note_id: Uuid,
	summary: Option<&str>,
	now: OffsetDateTime,
) -> Result<Note> {
	let mut tx = db.pool.begin().await?;
	let Some(mut note) = get_note(&mut *tx, note_id).await? else {
		return Err(Error::NotFound(format!("Note {note_id} does not exist.")));
	};

	note.summary = summary.map(str::to_string);
	note.updated_at = note.updated_at.max(now);

	sqlx::query("UPDATE notes SET summary = ?, updated_at = ? WHERE note_id = ?")
		.bind(note.summary.as_deref())
		.bind(note.updated_at)
		.bind(note_id)
		.execute(&mut *tx)
		.await?;

	tx.commit().await?;

	Ok(note)
}

/// Deletes a note and, through the foreign key, its chunks. Returns the number of chunks removed.
pub async fn delete_note(db: &Db, note_id: Uuid) -> Result<u64> {
	let mut tx = db.pool.begin().await?;
	let chunk_count = count_chunks_for_note(&mut *tx, note_id).await?;
	let result = sqlx::query("DELETE FROM notes WHERE note_id = ?")
		.bind(note_id)
		.execute(&mut *tx)
		.await?;

	if result.rows_affected() == 0 {
		return Err(Error::NotFound(format!("Note {note_id} does not exist.")));
	}

	tx.commit().await?;

	Ok(chunk_count)
}

pub async fn count_chunks_for_note<'e, E>(executor: E, note_id: Uuid) -> Result<u64>
where
	E: Executor<'e, Database = Sqlite>,
{
	let count: i64 = sqlx::query_scalar("SELECT count(*) FROM chunks WHERE note_id = ?")
		.bind(note_id)
		.fetch_one(executor)
		.await?;

	Ok(count.max(0) as u64)
}

/// Resolves index slots to chunk rows. Slots without a row are left out of the map.
pub async fn lookup_chunks_by_slots(
	db: &Db,
	slots: &[Slot],
) -> Result<HashMap<Slot, ChunkHit>> {
	let mut resolved = HashMap::with_capacity(slots.len());

	for batch in slots.chunks(SLOT_LOOKUP_BATCH) {
		let mut builder = QueryBuilder::<Sqlite>::new(
			"\
SELECT
	c.chunk_id,
	c.note_id,
	c.chunk_index,
	c.content,
	c.index_slot,
	c.start_time,
	c.end_time,
	n.title,
	n.audio_ref
FROM chunks c
JOIN notes n ON n.note_id = c.note_id
WHERE c.index_slot IN (",
		);
		let mut separated = builder.separated(", ");

		for slot in batch {
			separated.push_bind(i64::from(*slot));
		}

		separated.push_unseparated(")");

		let rows = builder.build_query_as::<ChunkHit>().fetch_all(&db.pool).await?;

		for row in rows {
			resolved.insert(slot_from_row(row.index_slot)?, row);
		}
	}

	Ok(resolved)
}

/// Most recently inserted notes first.
pub async fn list_notes<'e, E>(executor: E, limit: u32) -> Result<Vec<NoteListing>>
where
	E: Executor<'e, Database = Sqlite>,
{
	let notes = sqlx::query_as::<_, NoteListing>(
		"\
SELECT
	n.note_id,
	n.title,
	n.summary,
	n.audio_ref,
	(SELECT count(*) FROM chunks c WHERE c.note_id = n.note_id) AS chunk_count,
	n.created_at,
	n.updated_at
FROM notes n
ORDER BY n.rowid DESC
LIMIT ?",
	)
	.bind(i64::from(limit))
	.fetch_all(executor)
	.await?;

	Ok(notes)
}

pub async fn max_index_slot<'e, E>(executor: E) -> Result<Option<Slot>>
where
	E: Executor<'e, Database = Sqlite>,
{
	let max: Option<i64> =
		sqlx::query_scalar("SELECT max(index_slot) FROM chunks").fetch_one(executor).await?;

	max.map(slot_from_row).transpose()
}

pub async fn list_chunks_in_slot_order<'e, E>(executor: E) -> Result<Vec<Chunk>>
where
	E: Executor<'e, Database = Sqlite>,
{
	let chunks = sqlx::query_as::<_, Chunk>(
		"\
SELECT
	chunk_id,
	note_id,
	chunk_index,
	content,
	index_slot,
	start_time,
	end_time,
	created_at
FROM chunks
ORDER BY index_slot ASC",
	)
	.fetch_all(executor)
	.await?;

	Ok(chunks)
}

/// Moves chunks to new slots. Every chunk row must appear in `assignments`.
///
/// Old slots are first parked at negative values so the `UNIQUE` constraint never sees two rows
/// sharing a slot mid-update.
pub async fn reassign_slots_tx(
	tx: &mut Transaction<'_, Sqlite>,
	assignments: &[(Uuid, Slot)],
) -> Result<()> {
	let conn: &mut SqliteConnection = &mut *tx;

	sqlx::query("UPDATE chunks SET index_slot = -1 - index_slot WHERE index_slot >= 0")
		.execute(&mut *conn)
		.await?;

	for (chunk_id, slot) in assignments {
		let result = sqlx::query("UPDATE chunks SET index_slot = ? WHERE chunk_id = ?")
			.bind(i64::from(*slot))
			.bind(*chunk_id)
			.execute(&mut *conn)
			.await?;

		if result.rows_affected() == 0 {
			return Err(Error::NotFound(format!("Chunk {chunk_id} does not exist.")));
		}
	}

	let stale: i64 = sqlx::query_scalar("SELECT count(*) FROM chunks WHERE index_slot < 0")
		.fetch_one(&mut *conn)
		.await?;

	if stale > 0 {
		return Err(Error::InvalidArgument(format!(
			"{stale} chunk rows were not assigned a new index slot."
		)));
	}

	Ok(())
}

async fn insert_note_exec<'e, E>(executor: E, note: &Note) -> Result<()>
where
	E: Executor<'e, Database = Sqlite>,
{
	sqlx::query(
		"\
INSERT INTO notes (
	note_id,
	title,
	content,
	summary,
	audio_ref,
	created_at,
	updated_at
)
VALUES (?, ?, ?, ?, ?, ?, ?)",
	)
	.bind(note.note_id)
	.bind(note.title.as_deref())
	.bind(note.content.as_str())
	.bind(note.summary.as_deref())
	.bind(note.audio_ref.as_deref())
	.bind(note.created_at)
	.bind(note.updated_at)
	.execute(executor)
	.await?;

	Ok(())
}

fn slot_from_row(value: i64) -> Result<Slot> {
	Slot::try_from(value)
		.map_err(|_| Error::InvalidArgument(format!("Index slot {value} is out of range.")))
}
