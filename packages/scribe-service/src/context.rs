//! Turns search results into the context block handed to an answer generator.

use crate::SearchItem;

pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// One block per item, in the given order. Blocks carry the note title when present and the
/// transcript time range when the chunk was aligned.
pub fn format_context(items: &[SearchItem]) -> String {
	items.iter().map(format_item).collect::<Vec<_>>().join(CONTEXT_SEPARATOR)
}

pub fn build_prompt(question: &str, context: &str) -> String {
	format!(
		"Please answer the question based on the provided context. If the context doesn't contain enough information to answer the question, please say so.\n\nContext:\n{context}\n\nQuestion: {question}\n\nAnswer:"
	)
}

fn format_item(item: &SearchItem) -> String {
	let mut block = String::new();

	if let Some(title) = item.title.as_deref() {
		block.push_str("Title: ");
		block.push_str(title);
		block.push('\n');
	}

	block.push_str("Content: ");
	block.push_str(&item.content);

	if let (Some(start), Some(end)) = (item.start_time, item.end_time) {
		block.push_str(&format!("\n(Time: {start:.2}s - {end:.2}s)"));
	}

	block
}
