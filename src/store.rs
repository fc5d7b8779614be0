//! Flat-file persistence.
//!
//! One record per line, `id,title,author,year,quantity,status`, status as
//! its integer code. There is no header and no quoting: a title or author
//! holding a comma or a newline is written verbatim and will not read back.

use std::collections::HashSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::types::{Book, Status, MAX_FIELD_CHARS};

#[derive(Debug, Error)]
pub enum StoreError {
	#[error("can't read {}: {source}", path.display())]
	Read { path: PathBuf, source: io::Error },
	#[error("can't write {}: {source}", path.display())]
	Write { path: PathBuf, source: io::Error },
}

/// Why reading stopped early.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Malformed {
	/// 1-based line number in the store file.
	pub line: usize,
	pub reason: String,
}

#[derive(Debug, Default)]
pub struct Loaded {
	pub books: Vec<Book>,
	/// Set when a line failed to parse; nothing after it was loaded.
	pub stopped_at: Option<Malformed>,
}

#[derive(Debug, Clone)]
pub struct FlatFile {
	path: PathBuf,
}

impl FlatFile {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		FlatFile { path: path.into() }
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Reads at most `capacity` records. A missing file is a first run and
	/// yields an empty catalog.
	pub fn load(&self, capacity: usize) -> Result<Loaded, StoreError> {
		let bytes = match fs::read(&self.path) {
			Ok(bytes) => bytes,
			Err(e) if e.kind() == io::ErrorKind::NotFound => {
				info!(path = %self.path.display(), "no saved data found, starting new catalog");
				return Ok(Loaded::default());
			}
			Err(source) => {
				return Err(StoreError::Read {
					path: self.path.clone(),
					source,
				})
			}
		};

		let loaded = parse(&bytes, capacity);
		if let Some(bad) = &loaded.stopped_at {
			warn!(
				path = %self.path.display(),
				line = bad.line,
				reason = %bad.reason,
				"stopped reading store at malformed line",
			);
		}
		debug!(path = %self.path.display(), books = loaded.books.len(), "loaded store");
		Ok(loaded)
	}

	/// Rewrites the whole file. The new content goes to a sibling temp file
	/// first and is renamed over the store, so readers see either the old
	/// file or the new one.
	pub fn save(&self, books: &[Book]) -> Result<(), StoreError> {
		let tmp = self.tmp_path();
		let write_err = |source: io::Error| StoreError::Write {
			path: self.path.clone(),
			source,
		};

		let mut out = io::BufWriter::new(fs::File::create(&tmp).map_err(write_err)?);
		for book in books {
			writeln!(out, "{}", encode(book)).map_err(write_err)?;
		}
		let file = out.into_inner().map_err(|e| write_err(e.into_error()))?;
		file.sync_all().map_err(write_err)?;
		drop(file);

		if let Err(source) = fs::rename(&tmp, &self.path) {
			let _ = fs::remove_file(&tmp);
			return Err(write_err(source));
		}
		debug!(path = %self.path.display(), books = books.len(), "saved store");
		Ok(())
	}

	fn tmp_path(&self) -> PathBuf {
		let mut name = self
			.path
			.file_name()
			.map(|n| n.to_os_string())
			.unwrap_or_else(|| "books.txt".into());
		name.push(".tmp");
		self.path.with_file_name(name)
	}
}

pub fn encode(book: &Book) -> String {
	format!(
		"{},{},{},{},{},{}",
		book.id,
		book.title,
		book.author,
		book.year,
		book.quantity,
		book.status.code()
	)
}

pub fn decode(line: &str) -> Result<Book, String> {
	let fields: Vec<&str> = line.split(',').collect();
	let [id, title, author, year, quantity, status] = fields.as_slice() else {
		return Err(format!("expected 6 fields, found {}", fields.len()));
	};
	for (name, value) in [("title", title), ("author", author)] {
		if value.chars().count() > MAX_FIELD_CHARS {
			return Err(format!("{name} longer than {MAX_FIELD_CHARS} characters"));
		}
	}
	let status = status
		.parse::<u8>()
		.ok()
		.and_then(Status::from_code)
		.ok_or_else(|| format!("bad status {status:?}"))?;

	Ok(Book {
		id: id.parse().map_err(|_| format!("bad id {id:?}"))?,
		title: title.to_string(),
		author: author.to_string(),
		year: year.parse().map_err(|_| format!("bad year {year:?}"))?,
		quantity: quantity
			.parse()
			.map_err(|_| format!("bad quantity {quantity:?}"))?,
		status,
	})
}

// An undecodable line is a bad record like any other.
fn parse(bytes: &[u8], capacity: usize) -> Loaded {
	let mut loaded = Loaded::default();
	let mut seen = HashSet::new();

	for (index, raw) in bytes.split(|b| *b == b'\n').enumerate() {
		let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
		let malformed = |reason: String| Malformed {
			line: index + 1,
			reason,
		};
		let Ok(line) = std::str::from_utf8(raw) else {
			loaded.stopped_at = Some(malformed("invalid UTF-8".to_string()));
			break;
		};
		if line.trim().is_empty() {
			continue;
		}
		if loaded.books.len() >= capacity {
			loaded.stopped_at = Some(malformed(format!("capacity of {capacity} reached")));
			break;
		}
		match decode(line) {
			Ok(book) if !seen.insert(book.id) => {
				loaded.stopped_at = Some(malformed(format!("duplicate id {}", book.id)));
				break;
			}
			Ok(book) => loaded.books.push(book),
			Err(reason) => {
				loaded.stopped_at = Some(malformed(reason));
				break;
			}
		}
	}
	loaded
}
