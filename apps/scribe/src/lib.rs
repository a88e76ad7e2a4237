use std::{
	fs,
	path::{Path, PathBuf},
};

use clap::{Parser, Subcommand};
use color_eyre::eyre;
use serde::Serialize;
use uuid::Uuid;

use scribe_cli::print_json;
use scribe_service::{
	AddDocumentRequest, DeleteRequest, ListRequest, NoteFetchRequest, ScribeService, SearchRequest,
	Segment, UpdateSummaryRequest,
};

#[derive(Debug, Parser)]
#[command(
	version = scribe_cli::VERSION,
	rename_all = "kebab",
	styles = scribe_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	#[command(subcommand)]
	pub command: Command,
}

#[derive(Debug, Subcommand)]
#[command(rename_all = "kebab")]
pub enum Command {
	/// Chunk, embed, and store a text or transcript file as one note.
	Ingest {
		#[arg(long, short = 'f', value_name = "FILE")]
		file: PathBuf,
		#[arg(long)]
		title: Option<String>,
		#[arg(long, value_name = "REF")]
		audio_ref: Option<String>,
		/// JSON array of `{ "text", "start", "end" }` transcript segments.
		#[arg(long, value_name = "FILE")]
		segments: Option<PathBuf>,
	},
	/// Nearest chunks to a query.
	Search {
		query: String,
		#[arg(long, value_name = "N")]
		top_k: Option<u32>,
		#[arg(long, value_name = "UUID")]
		note_id: Option<Uuid>,
		/// Print the generator context block instead of JSON.
		#[arg(long)]
		context: bool,
	},
	Note {
		note_id: Uuid,
	},
	/// Replace a note's summary. Omit the text to clear it.
	Summary {
		note_id: Uuid,
		text: Option<String>,
	},
	Delete {
		note_id: Uuid,
	},
	List {
		#[arg(long, value_name = "N")]
		limit: Option<u32>,
	},
	/// Compact the vector index to the chunks the catalog still references.
	RebuildIndex,
}
impl Command {
	fn name(&self) -> &'static str {
		match self {
			Self::Ingest { .. } => "ingest",
			Self::Search { .. } => "search",
			Self::Note { .. } => "note",
			Self::Summary { .. } => "summary",
			Self::Delete { .. } => "delete",
			Self::List { .. } => "list",
			Self::RebuildIndex => "rebuild-index",
		}
	}
}

#[derive(Debug, Serialize)]
struct IngestOutput {
	note_id: Uuid,
	chunk_count: u32,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = scribe_config::load(&args.config)?;

	scribe_cli::init_tracing(&config.service.log_level);

	let command = args.command.name();
	let service = ScribeService::open(config).await?;
	let result = execute(&service, args.command).await;

	service.shutdown().await?;

	match &result {
		Ok(()) => tracing::info!(command, "Command completed."),
		Err(err) => tracing::error!(command, error = %err, "Command failed."),
	}

	result
}

async fn execute(service: &ScribeService, command: Command) -> color_eyre::Result<()> {
	match command {
		Command::Ingest { file, title, audio_ref, segments } => {
			let content = fs::read_to_string(&file)
				.map_err(|err| eyre::eyre!("Failed to read {}: {err}.", file.display()))?;
			let segments = segments.map(|path| read_segments(&path)).transpose()?;
			let response = service
				.add_document(AddDocumentRequest { content, title, audio_ref, segments })
				.await?;

			tracing::info!(
				note_id = %response.note_id,
				chunk_count = response.chunk_count,
				file = %file.display(),
				"File ingested."
			);

			print_json(&IngestOutput {
				note_id: response.note_id,
				chunk_count: response.chunk_count,
			})?;
		},
		Command::Search { query, top_k, note_id, context } => {
			let response = service.search(SearchRequest { query, top_k, note_id }).await?;

			if context {
				println!("{}", scribe_service::format_context(&response.items));

				return Ok(());
			}

			print_json(&response)?;
		},
		Command::Note { note_id } =>
			print_json(&service.get_note(NoteFetchRequest { note_id }).await?)?,
		Command::Summary { note_id, text } => print_json(
			&service.update_summary(UpdateSummaryRequest { note_id, summary: text }).await?,
		)?,
		Command::Delete { note_id } =>
			print_json(&service.delete(DeleteRequest { note_id }).await?)?,
		Command::List { limit } => print_json(&service.list(ListRequest { limit }).await?)?,
		Command::RebuildIndex => print_json(&service.rebuild_index().await?)?,
	}

	Ok(())
}

fn read_segments(path: &Path) -> color_eyre::Result<Vec<Segment>> {
	let raw = fs::read_to_string(path)
		.map_err(|err| eyre::eyre!("Failed to read {}: {err}.", path.display()))?;
	let segments = serde_json::from_str(&raw)?;

	Ok(segments)
}
