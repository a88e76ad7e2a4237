use uuid::Uuid;

use scribe_service::{
	AddDocumentRequest, Error, ListRequest, NoteFetchRequest, SearchRequest, UpdateSummaryRequest,
};
use scribe_testkit::TestWorkspace;

use super::{ANIMAL_VOCABULARY, KeywordEmbedding, build_service, providers, test_config};

fn document(content: &str, title: &str) -> AddDocumentRequest {
	AddDocumentRequest {
		content: content.to_string(),
		title: Some(title.to_string()),
		audio_ref: None,
		segments: None,
	}
}

fn query(text: &str) -> SearchRequest {
	SearchRequest { query: text.to_string(), top_k: Some(3), note_id: None }
}

#[tokio::test]
async fn reopen_restores_index_and_results() {
	let workspace = TestWorkspace::new().expect("Failed to create test workspace.");
	let cfg = test_config(&workspace, ANIMAL_VOCABULARY.len() as u32, 8, 2);
	let service = build_service(cfg, providers(KeywordEmbedding::new(&ANIMAL_VOCABULARY))).await;

	service
		.add_document(document("The cat sat on the mat. The dog ran in the park.", "Pets"))
		.await
		.expect("Failed to add document.");

	let before = service.search(query("dog ran park")).await.expect("Failed to search.");
	let len_before = service.index_len().await;

	service.shutdown().await.expect("Failed to shut down service.");

	assert!(workspace.index_path().exists(), "Index snapshot must be on disk.");

	let cfg = test_config(&workspace, ANIMAL_VOCABULARY.len() as u32, 8, 2);
	let reopened = build_service(cfg, providers(KeywordEmbedding::new(&ANIMAL_VOCABULARY))).await;
	let after = reopened.search(query("dog ran park")).await.expect("Failed to search.");

	assert_eq!(reopened.index_len().await, len_before);
	assert_eq!(
		before.items.iter().map(|item| (item.chunk_id, item.index_slot)).collect::<Vec<_>>(),
		after.items.iter().map(|item| (item.chunk_id, item.index_slot)).collect::<Vec<_>>()
	);
}

#[tokio::test]
async fn missing_snapshot_starts_an_empty_index() {
	let workspace = TestWorkspace::new().expect("Failed to create test workspace.");
	let cfg = test_config(&workspace, ANIMAL_VOCABULARY.len() as u32, 8, 2);
	let service = build_service(cfg, providers(KeywordEmbedding::new(&ANIMAL_VOCABULARY))).await;

	assert_eq!(service.index_len().await, 0);

	service.flush().await.expect("Failed to flush empty index.");

	assert!(workspace.index_path().exists());
}

#[tokio::test]
async fn summary_can_be_set_and_cleared() {
	let workspace = TestWorkspace::new().expect("Failed to create test workspace.");
	let cfg = test_config(&workspace, ANIMAL_VOCABULARY.len() as u32, 8, 2);
	let service = build_service(cfg, providers(KeywordEmbedding::new(&ANIMAL_VOCABULARY))).await;
	let added = service
		.add_document(document("The dog ran in the park.", "Walk"))
		.await
		.expect("Failed to add document.");
	let created = service
		.get_note(NoteFetchRequest { note_id: added.note_id })
		.await
		.expect("Failed to fetch note.");

	assert_eq!(created.summary, None);
	assert_eq!(created.chunk_count, 1);

	let updated = service
		.update_summary(UpdateSummaryRequest {
			note_id: added.note_id,
			summary: Some("  A dog went to the park.  ".to_string()),
		})
		.await
		.expect("Failed to update summary.");

	assert_eq!(updated.summary.as_deref(), Some("A dog went to the park."));
	assert!(updated.updated_at >= created.updated_at);

	let cleared = service
		.update_summary(UpdateSummaryRequest { note_id: added.note_id, summary: None })
		.await
		.expect("Failed to clear summary.");
	let stored = service
		.get_note(NoteFetchRequest { note_id: added.note_id })
		.await
		.expect("Failed to fetch note.");

	assert_eq!(cleared.summary, None);
	assert_eq!(stored.summary, None);
	assert_eq!(stored.content, "The dog ran in the park.");
	assert!(stored.updated_at >= updated.updated_at);
	assert!(matches!(
		service
			.update_summary(UpdateSummaryRequest { note_id: Uuid::new_v4(), summary: None })
			.await,
		Err(Error::NotFound { .. })
	));
}

#[tokio::test]
async fn list_returns_newest_notes_first() {
	let workspace = TestWorkspace::new().expect("Failed to create test workspace.");
	let cfg = test_config(&workspace, ANIMAL_VOCABULARY.len() as u32, 8, 2);
	let service = build_service(cfg, providers(KeywordEmbedding::new(&ANIMAL_VOCABULARY))).await;
	let mut added = Vec::new();

	for title in ["first", "second", "third"] {
		let response = service
			.add_document(document("The cat sat on the mat.", title))
			.await
			.expect("Failed to add document.");

		added.push(response.note_id);
	}

	let listing = service.list(ListRequest { limit: Some(2) }).await.expect("Failed to list.");

	assert_eq!(
		listing.items.iter().map(|item| item.note_id).collect::<Vec<_>>(),
		vec![added[2], added[1]]
	);
	assert_eq!(listing.items[0].title.as_deref(), Some("third"));
	assert!(listing.items.iter().all(|item| item.chunk_count == 1));
	assert!(matches!(
		service.list(ListRequest { limit: Some(0) }).await,
		Err(Error::InvalidRequest { .. })
	));
}
