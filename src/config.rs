use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::catalog::DEFAULT_CAPACITY;

/// Book catalog kept in a flat text file.
#[derive(Parser, Debug)]
#[command(name = "shelf", version)]
pub struct Cli {
	#[command(flatten)]
	pub settings: Settings,

	#[command(subcommand)]
	pub command: Option<Command>,
}

/// Settings shared by every front end. Each one can also come from the
/// environment or a `.env` file.
#[derive(Args, Debug, Clone)]
pub struct Settings {
	/// Store file, rewritten after every change.
	#[arg(long, env = "SHELF_STORE", default_value = "books.txt", global = true)]
	pub store: PathBuf,

	/// Most books the catalog will hold.
	#[arg(long, env = "SHELF_CAPACITY", default_value_t = DEFAULT_CAPACITY, global = true)]
	pub capacity: usize,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
	/// Interactive numbered menu (default).
	Menu,
	/// HTML front end over HTTP.
	Serve {
		#[arg(long, env = "SHELF_ADDR", default_value = "0.0.0.0:8080")]
		addr: SocketAddr,
	},
}

impl Command {
	/// Log filter used when `RUST_LOG` is unset. The menu shares the
	/// terminal with its prompts, so it stays quiet.
	pub fn default_log_filter(&self) -> &'static str {
		match self {
			Command::Menu => "warn",
			Command::Serve { .. } => "info",
		}
	}
}
