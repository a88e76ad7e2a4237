use std::fs;

use time::OffsetDateTime;
use uuid::Uuid;

use scribe_service::{AddDocumentRequest, Error, SearchRequest};
use scribe_storage::{
	models::{NewChunk, Note},
	queries,
};
use scribe_testkit::TestWorkspace;

use super::{
	ANIMAL_VOCABULARY, FailingEmbedding, KeywordEmbedding, NonFiniteEmbedding, TruncatedEmbedding,
	build_service, count_rows, providers, test_config,
};

fn document(content: &str) -> AddDocumentRequest {
	AddDocumentRequest { content: content.to_string(), title: None, audio_ref: None, segments: None }
}

#[tokio::test]
async fn catalog_conflict_leaves_no_partial_note() {
	let workspace = TestWorkspace::new().expect("Failed to create test workspace.");
	let cfg = test_config(&workspace, ANIMAL_VOCABULARY.len() as u32, 8, 2);
	let service = build_service(cfg, providers(KeywordEmbedding::new(&ANIMAL_VOCABULARY))).await;
	let now = OffsetDateTime::now_utc();
	let blocker = Note {
		note_id: Uuid::new_v4(),
		title: None,
		content: "blocker".to_string(),
		summary: None,
		audio_ref: None,
		created_at: now,
		updated_at: now,
	};
	let mut tx = service.db.pool.begin().await.expect("Failed to begin transaction.");

	// Occupies slot 0, which the empty index hands to the next ingest.
	queries::insert_note_tx(&mut tx, &blocker).await.expect("Failed to insert blocker note.");
	queries::insert_chunks_tx(
		&mut tx,
		blocker.note_id,
		&[NewChunk {
			chunk_index: 0,
			content: "blocker".to_string(),
			index_slot: 0,
			start_time: None,
			end_time: None,
		}],
		now,
	)
	.await
	.expect("Failed to insert blocker chunk.");
	tx.commit().await.expect("Failed to commit transaction.");

	let result = service.add_document(document("The cat sat on the mat.")).await;

	assert!(matches!(result, Err(Error::Storage { .. })), "Unexpected result: {result:?}");
	assert_eq!(count_rows(&service, "notes").await, 1);
	assert_eq!(count_rows(&service, "chunks").await, 1);
	assert_eq!(service.index_len().await, 0);
}

#[tokio::test]
async fn provider_failure_stores_nothing() {
	let workspace = TestWorkspace::new().expect("Failed to create test workspace.");
	let cfg = test_config(&workspace, ANIMAL_VOCABULARY.len() as u32, 8, 2);
	let service = build_service(cfg, providers(FailingEmbedding)).await;
	let result = service.add_document(document("The dog ran in the park.")).await;

	match result {
		Err(Error::Provider { message }) => {
			assert!(message.contains("unavailable"), "Unexpected message: {message}")
		},
		other => panic!("Expected provider error, got {other:?}."),
	}

	assert_eq!(count_rows(&service, "notes").await, 0);
	assert_eq!(count_rows(&service, "chunks").await, 0);
	assert_eq!(service.index_len().await, 0);
}

#[tokio::test]
async fn wrong_vector_dimension_is_a_provider_error() {
	let workspace = TestWorkspace::new().expect("Failed to create test workspace.");
	let vector_dim = ANIMAL_VOCABULARY.len() as u32;
	let cfg = test_config(&workspace, vector_dim, 8, 2);
	let service = build_service(cfg, providers(TruncatedEmbedding { vector_dim })).await;

	assert!(matches!(
		service.add_document(document("The dog ran in the park.")).await,
		Err(Error::Provider { .. })
	));
	assert_eq!(count_rows(&service, "notes").await, 0);
	assert_eq!(service.index_len().await, 0);
}

#[tokio::test]
async fn non_finite_vectors_are_rejected_before_storage() {
	let workspace = TestWorkspace::new().expect("Failed to create test workspace.");
	let vector_dim = ANIMAL_VOCABULARY.len() as u32;
	let cfg = test_config(&workspace, vector_dim, 8, 2);
	let service = build_service(cfg, providers(NonFiniteEmbedding { vector_dim })).await;

	assert!(matches!(
		service.add_document(document("bad vector here")).await,
		Err(Error::Provider { .. })
	));
	assert_eq!(count_rows(&service, "notes").await, 0);
	assert_eq!(count_rows(&service, "chunks").await, 0);
	assert_eq!(service.index_len().await, 0);
	assert!(!workspace.index_path().exists());
}

#[tokio::test]
async fn snapshot_failure_leaves_index_ahead_of_catalog() {
	let workspace = TestWorkspace::new().expect("Failed to create test workspace.");
	let cfg = test_config(&workspace, ANIMAL_VOCABULARY.len() as u32, 8, 2);
	let service = build_service(cfg, providers(KeywordEmbedding::new(&ANIMAL_VOCABULARY))).await;

	// A directory at the snapshot path makes the final rename fail after the append.
	fs::create_dir_all(workspace.index_path()).expect("Failed to block snapshot path.");

	let result =
		service.add_document(document("The cat sat on the mat. The dog ran in the park.")).await;

	assert!(matches!(result, Err(Error::Index { .. })), "Unexpected result: {result:?}");
	assert_eq!(count_rows(&service, "notes").await, 0);
	assert_eq!(count_rows(&service, "chunks").await, 0);
	assert_eq!(service.index_len().await, 2);

	fs::remove_dir(workspace.index_path()).expect("Failed to unblock snapshot path.");

	let added =
		service.add_document(document("dog ran park")).await.expect("Failed to add document.");

	assert_eq!(added.slots, vec![2]);

	let response = service
		.search(SearchRequest { query: "dog ran park".to_string(), top_k: Some(5), note_id: None })
		.await
		.expect("Failed to search.");

	assert_eq!(response.items.len(), 1, "Dead slots must not resolve.");
	assert_eq!(response.items[0].note_id, added.note_id);
	assert_eq!(response.items[0].index_slot, 2);
	assert_eq!(response.items[0].content, "dog ran park");
	assert!(response.items[0].distance.abs() < 1e-6);
}
