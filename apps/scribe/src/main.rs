use clap::Parser;

use scribe::Args;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = Args::parse();

	scribe::run(args).await
}
