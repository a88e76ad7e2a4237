use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

use crate::{Error, Result};

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
	data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
	index: Option<usize>,
	embedding: Vec<f32>,
}

/// Embeds `texts` with an OpenAI-compatible `/embeddings` endpoint.
///
/// The result holds exactly one vector per input, in input order.
pub async fn embed(
	cfg: &scribe_config::EmbeddingProviderConfig,
	texts: &[String],
) -> Result<Vec<Vec<f32>>> {
	if texts.is_empty() {
		return Ok(Vec::new());
	}

	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"input": texts,
		"dimensions": cfg.dimensions,
	});
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let raw = res.error_for_status()?.text().await?;
	let vectors = parse_embedding_response(&raw, texts.len())?;

	tracing::debug!(
		provider_id = %cfg.provider_id,
		model = %cfg.model,
		inputs = texts.len(),
		"Embedding request completed."
	);

	Ok(vectors)
}

fn parse_embedding_response(raw: &str, expected: usize) -> Result<Vec<Vec<f32>>> {
	let response: EmbeddingResponse = serde_json::from_str(raw)?;

	if response.data.len() != expected {
		return Err(Error::InvalidResponse {
			message: format!(
				"Embedding response has {} items, expected {expected}.",
				response.data.len()
			),
		});
	}

	let mut slots: Vec<Option<Vec<f32>>> = vec![None; expected];

	for (fallback_index, item) in response.data.into_iter().enumerate() {
		let index = item.index.unwrap_or(fallback_index);
		let Some(slot) = slots.get_mut(index) else {
			return Err(Error::InvalidResponse {
				message: format!("Embedding response index {index} is out of range."),
			});
		};

		if slot.replace(item.embedding).is_some() {
			return Err(Error::InvalidResponse {
				message: format!("Embedding response repeats index {index}."),
			});
		}
	}

	Ok(slots.into_iter().flatten().collect())
}
