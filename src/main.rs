// library catalog

mod catalog;
mod config;
mod console;
mod library;
mod server;
mod store;
mod types;

use std::io;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::config::{Cli, Command};
use crate::console::Console;
use crate::library::Library;
use crate::store::FlatFile;

fn main() -> anyhow::Result<()> {
	// a missing .env is fine
	dotenvy::dotenv().ok();
	let cli = Cli::parse();
	let command = cli.command.unwrap_or(Command::Menu);

	tracing_subscriber::fmt()
		.with_env_filter(
			EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| EnvFilter::new(command.default_log_filter())),
		)
		.with_writer(io::stderr)
		.init();

	let store = FlatFile::new(&cli.settings.store);
	let mut library = Library::open(store, cli.settings.capacity)
		.with_context(|| format!("can't open library at {}", cli.settings.store.display()))?;

	match command {
		Command::Menu => {
			let stdin = io::stdin();
			Console::new(stdin.lock(), io::stdout().lock()).run(&mut library)?;
		}
		Command::Serve { addr } => {
			let runtime = tokio::runtime::Builder::new_multi_thread()
				.enable_all()
				.build()
				.context("failed to create tokio runtime")?;
			runtime.block_on(server::serve(library, addr))?;
		}
	}
	Ok(())
}
