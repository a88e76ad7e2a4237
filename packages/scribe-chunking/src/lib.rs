//! Word-window chunking with best-effort alignment to transcript segments.

use serde::{Deserialize, Serialize};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("{message}")]
	InvalidConfig { message: String },
}

#[derive(Clone, Copy, Debug)]
pub struct ChunkingConfig {
	/// Words per window.
	pub size: u32,
	/// Words shared by consecutive windows. Must be less than `size`.
	pub overlap: u32,
}
impl ChunkingConfig {
	pub fn validate(&self) -> Result<()> {
		if self.size == 0 {
			return Err(Error::InvalidConfig {
				message: "Chunk size must be greater than zero.".to_string(),
			});
		}
		if self.overlap >= self.size {
			return Err(Error::InvalidConfig {
				message: "Chunk overlap must be less than chunk size.".to_string(),
			});
		}

		Ok(())
	}

	fn step(&self) -> usize {
		(self.size - self.overlap) as usize
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct Chunk {
	pub chunk_index: u32,
	/// First word of the window, inclusive.
	pub start_word: usize,
	/// Last word of the window, exclusive.
	pub end_word: usize,
	pub text: String,
	pub start_time: Option<f64>,
	pub end_time: Option<f64>,
}

/// A transcript segment in seconds, as produced by the transcriber.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Segment {
	pub text: String,
	pub start: f64,
	pub end: f64,
}

/// Splits `text` on whitespace into windows of `cfg.size` words advancing by
/// `cfg.size - cfg.overlap`. The last window may be shorter.
pub fn split_words(text: &str, cfg: &ChunkingConfig) -> Result<Vec<Chunk>> {
	cfg.validate()?;

	let words: Vec<&str> = text.split_whitespace().collect();
	let size = cfg.size as usize;
	let mut chunks = Vec::new();
	let mut start = 0_usize;

	while start < words.len() {
		let end = (start + size).min(words.len());

		chunks.push(Chunk {
			chunk_index: chunks.len() as u32,
			start_word: start,
			end_word: end,
			text: words[start..end].join(" "),
			start_time: None,
			end_time: None,
		});

		start += cfg.step();
	}

	Ok(chunks)
}

/// Assigns each chunk the time range of the first segment whose text occurs inside the chunk.
///
/// This is approximate. Containment is tested on whitespace-normalized segment text, so a
/// segment that straddles two windows matches neither, and a segment repeated in the document
/// always resolves to its first occurrence in segment order.
pub fn align_segments(chunks: &mut [Chunk], segments: &[Segment]) {
	let normalized: Vec<(String, &Segment)> = segments
		.iter()
		.map(|segment| (normalize_whitespace(&segment.text), segment))
		.filter(|(text, _)| !text.is_empty())
		.collect();
	let mut aligned = 0_usize;

	for chunk in chunks.iter_mut() {
		let Some((_, segment)) =
			normalized.iter().find(|(text, _)| chunk.text.contains(text.as_str()))
		else {
			continue;
		};

		chunk.start_time = Some(segment.start);
		chunk.end_time = Some(segment.end);
		aligned += 1;
	}

	tracing::debug!(chunks = chunks.len(), aligned, "Aligned chunks to transcript segments.");
}

pub fn chunk_document(
	text: &str,
	cfg: &ChunkingConfig,
	segments: Option<&[Segment]>,
) -> Result<Vec<Chunk>> {
	let mut chunks = split_words(text, cfg)?;

	if let Some(segments) = segments {
		align_segments(&mut chunks, segments);
	}

	Ok(chunks)
}

fn normalize_whitespace(text: &str) -> String {
	text.split_whitespace().collect::<Vec<_>>().join(" ")
}
