//! Shared command-line plumbing for scribe binaries: version string, help styling, logging
//! setup, and JSON output.

use std::io::{self, Write};

use clap::builder::{
	Styles,
	styling::{AnsiColor, Effects},
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

/// Crate version, git revision, and target triple, e.g. `0.2.0-1a2b3c4-x86_64-unknown-linux-gnu`.
pub const VERSION: &str = concat!(
	env!("CARGO_PKG_VERSION"),
	"-",
	env!("VERGEN_GIT_SHA"),
	"-",
	env!("VERGEN_CARGO_TARGET_TRIPLE"),
);

/// Directive used when `service.log_level` does not parse.
pub const FALLBACK_LOG_LEVEL: &str = "info";

pub fn styles() -> Styles {
	Styles::styled()
		.header(AnsiColor::Yellow.on_default() | Effects::BOLD)
		.usage(AnsiColor::Yellow.on_default() | Effects::BOLD)
		.literal(AnsiColor::Cyan.on_default() | Effects::BOLD)
		.placeholder(AnsiColor::Green.on_default())
		.error(AnsiColor::Red.on_default() | Effects::BOLD)
}

pub fn log_filter(log_level: &str) -> EnvFilter {
	EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new(FALLBACK_LOG_LEVEL))
}

/// Installs the global subscriber. Logs go to stderr so stdout carries only command output.
pub fn init_tracing(log_level: &str) {
	tracing_subscriber::fmt()
		.with_env_filter(log_filter(log_level))
		.with_writer(io::stderr)
		.init();
}

/// Pretty-printed JSON followed by a newline.
pub fn write_json<W, T>(mut writer: W, value: &T) -> io::Result<()>
where
	W: Write,
	T: Serialize,
{
	serde_json::to_writer_pretty(&mut writer, value)?;

	writeln!(writer)
}

pub fn print_json<T>(value: &T) -> io::Result<()>
where
	T: Serialize,
{
	write_json(io::stdout().lock(), value)
}
