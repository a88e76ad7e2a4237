use std::{fs, sync::atomic::Ordering};

use scribe_service::{AddDocumentRequest, DeleteRequest, Error, NoteFetchRequest, SearchRequest};
use scribe_testkit::TestWorkspace;

use super::{
	ANIMAL_VOCABULARY, KeywordEmbedding, build_service, count_rows, providers, test_config,
};

fn document(content: &str) -> AddDocumentRequest {
	AddDocumentRequest { content: content.to_string(), title: None, audio_ref: None, segments: None }
}

#[tokio::test]
async fn deleted_note_disappears_from_reads_and_search() {
	let workspace = TestWorkspace::new().expect("Failed to create test workspace.");
	let cfg = test_config(&workspace, ANIMAL_VOCABULARY.len() as u32, 3, 0);
	let service = build_service(cfg, providers(KeywordEmbedding::new(&ANIMAL_VOCABULARY))).await;
	let dogs =
		service.add_document(document("dog ran park")).await.expect("Failed to add document.");
	let cats =
		service.add_document(document("cat sat mat")).await.expect("Failed to add document.");
	let deleted = service
		.delete(DeleteRequest { note_id: dogs.note_id })
		.await
		.expect("Failed to delete note.");

	assert_eq!(deleted.chunks_removed, 1);
	assert!(matches!(
		service.get_note(NoteFetchRequest { note_id: dogs.note_id }).await,
		Err(Error::NotFound { .. })
	));
	assert!(matches!(
		service.delete(DeleteRequest { note_id: dogs.note_id }).await,
		Err(Error::NotFound { .. })
	));

	// The slot stays in the index until a rebuild, but no longer resolves.
	let raw = service.nearest_slots("dog ran park", 1).await.expect("Failed to query index.");

	assert_eq!(raw[0].slot, dogs.slots[0]);

	let response = service
		.search(SearchRequest { query: "dog ran park".to_string(), top_k: Some(5), note_id: None })
		.await
		.expect("Failed to search.");

	assert!(response.items.iter().all(|item| item.note_id == cats.note_id));
	assert_eq!(response.items.len(), 1);
	assert_eq!(count_rows(&service, "chunks").await, 1);
}

#[tokio::test]
async fn rebuild_compacts_index_to_live_chunks() {
	let workspace = TestWorkspace::new().expect("Failed to create test workspace.");
	let cfg = test_config(&workspace, ANIMAL_VOCABULARY.len() as u32, 3, 0);
	let embedding = KeywordEmbedding::new(&ANIMAL_VOCABULARY);
	let calls = embedding.calls.clone();
	let service = build_service(cfg, providers(embedding)).await;
	let first = service
		.add_document(document("dog ran park cat sat mat"))
		.await
		.expect("Failed to add document.");
	let second =
		service.add_document(document("cat sat mat")).await.expect("Failed to add document.");

	service.delete(DeleteRequest { note_id: first.note_id }).await.expect("Failed to delete note.");

	assert_eq!(service.index_len().await, 3);

	let calls_before = calls.load(Ordering::SeqCst);
	let report = service.rebuild_index().await.expect("Failed to rebuild index.");

	assert_eq!(report.rebuilt_count, 1);
	assert_eq!(report.dropped_slots, 2);
	assert_eq!(report.reembedded_count, 0);
	assert_eq!(calls.load(Ordering::SeqCst), calls_before);
	assert_eq!(service.index_len().await, 1);

	let response = service
		.search(SearchRequest { query: "cat sat mat".to_string(), top_k: Some(5), note_id: None })
		.await
		.expect("Failed to search.");

	assert_eq!(response.items.len(), 1);
	assert_eq!(response.items[0].note_id, second.note_id);
	assert_eq!(response.items[0].index_slot, 0);
	assert!(response.items[0].distance.abs() < 1e-6);
}

#[tokio::test]
async fn rebuild_reembeds_chunks_missing_from_stale_snapshot() {
	let workspace = TestWorkspace::new().expect("Failed to create test workspace.");
	let vector_dim = ANIMAL_VOCABULARY.len() as u32;
	let service = build_service(
		test_config(&workspace, vector_dim, 3, 0),
		providers(KeywordEmbedding::new(&ANIMAL_VOCABULARY)),
	)
	.await;
	let dogs =
		service.add_document(document("dog ran park")).await.expect("Failed to add document.");
	let stale = fs::read(workspace.index_path()).expect("Failed to read snapshot.");
	let cats =
		service.add_document(document("cat sat mat")).await.expect("Failed to add document.");

	service.shutdown().await.expect("Failed to shut down service.");

	// The catalog now references slot 1, which the restored snapshot lacks.
	fs::write(workspace.index_path(), &stale).expect("Failed to restore stale snapshot.");

	let embedding = KeywordEmbedding::new(&ANIMAL_VOCABULARY);
	let calls = embedding.calls.clone();
	let service =
		build_service(test_config(&workspace, vector_dim, 3, 0), providers(embedding)).await;

	assert_eq!(service.index_len().await, 1);

	let report = service.rebuild_index().await.expect("Failed to rebuild index.");

	assert_eq!(report.rebuilt_count, 2);
	assert_eq!(report.reembedded_count, 1);
	assert_eq!(report.dropped_slots, 0);
	assert_eq!(calls.load(Ordering::SeqCst), 1);
	assert_eq!(service.index_len().await, 2);

	for (query, note_id) in [("dog ran park", dogs.note_id), ("cat sat mat", cats.note_id)] {
		let response = service
			.search(SearchRequest { query: query.to_string(), top_k: Some(1), note_id: None })
			.await
			.expect("Failed to search.");

		assert_eq!(response.items.len(), 1);
		assert_eq!(response.items[0].note_id, note_id);
		assert_eq!(response.items[0].content, query);
		assert!(response.items[0].distance.abs() < 1e-6);
	}
}

#[tokio::test]
async fn rebuild_restores_a_lost_snapshot() {
	let workspace = TestWorkspace::new().expect("Failed to create test workspace.");
	let vector_dim = ANIMAL_VOCABULARY.len() as u32;
	let service = build_service(
		test_config(&workspace, vector_dim, 3, 0),
		providers(KeywordEmbedding::new(&ANIMAL_VOCABULARY)),
	)
	.await;

	service
		.add_document(document("dog ran park cat sat mat"))
		.await
		.expect("Failed to add document.");
	service.shutdown().await.expect("Failed to shut down service.");

	fs::remove_file(workspace.index_path()).expect("Failed to remove snapshot.");

	let service = build_service(
		test_config(&workspace, vector_dim, 3, 0),
		providers(KeywordEmbedding::new(&ANIMAL_VOCABULARY)),
	)
	.await;

	assert_eq!(service.index_len().await, 0);
	assert!(
		service
			.search(SearchRequest { query: "cat".to_string(), top_k: Some(3), note_id: None })
			.await
			.expect("Failed to search.")
			.items
			.is_empty()
	);

	let report = service.rebuild_index().await.expect("Failed to rebuild index.");

	assert_eq!((report.rebuilt_count, report.reembedded_count), (2, 2));

	let response = service
		.search(SearchRequest { query: "cat sat mat".to_string(), top_k: Some(1), note_id: None })
		.await
		.expect("Failed to search.");

	assert_eq!(response.items[0].content, "cat sat mat");
	assert_eq!(response.items[0].chunk_index, 1);
}
