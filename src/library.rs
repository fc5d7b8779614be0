use thiserror::Error;
use tracing::{error, info};

use crate::catalog::{Catalog, CatalogError};
use crate::store::{FlatFile, StoreError};
use crate::types::{Book, BookDetails, BookId};

#[derive(Debug, Error)]
pub enum LibraryError {
	#[error(transparent)]
	Catalog(#[from] CatalogError),
	/// The change was applied in memory but could not be written out.
	#[error("change kept in memory, but saving failed: {0}")]
	Store(#[from] StoreError),
}

/// A catalog tied to its store. Every successful mutation is written
/// through before the call returns.
#[derive(Debug)]
pub struct Library {
	catalog: Catalog,
	store: FlatFile,
}

impl Library {
	pub fn open(store: FlatFile, capacity: usize) -> Result<Self, StoreError> {
		let loaded = store.load(capacity)?;
		info!(
			path = %store.path().display(),
			books = loaded.books.len(),
			capacity,
			"opened library",
		);
		Ok(Library {
			catalog: Catalog::from_books(capacity, loaded.books),
			store,
		})
	}

	pub fn catalog(&self) -> &Catalog {
		&self.catalog
	}

	pub fn find(&self, id: BookId) -> Result<&Book, CatalogError> {
		self.catalog.find(id)
	}

	pub fn list(&self) -> &[Book] {
		self.catalog.list()
	}

	pub fn add(&mut self, id: BookId, details: BookDetails) -> Result<Book, LibraryError> {
		let book = self.catalog.add(id, details)?.clone();
		info!(id, title = %book.title, "added book");
		self.persist()?;
		Ok(book)
	}

	pub fn issue(&mut self, id: BookId) -> Result<Book, LibraryError> {
		let book = self.catalog.issue(id)?.clone();
		info!(id, quantity = book.quantity, status = %book.status, "issued book");
		self.persist()?;
		Ok(book)
	}

	pub fn return_book(&mut self, id: BookId) -> Result<Book, LibraryError> {
		let book = self.catalog.return_book(id)?.clone();
		info!(id, quantity = book.quantity, "returned book");
		self.persist()?;
		Ok(book)
	}

	pub fn update(&mut self, id: BookId, details: BookDetails) -> Result<Book, LibraryError> {
		let book = self.catalog.update(id, details)?.clone();
		info!(id, quantity = book.quantity, status = %book.status, "updated book");
		self.persist()?;
		Ok(book)
	}

	pub fn delete(&mut self, id: BookId) -> Result<Book, LibraryError> {
		let book = self.catalog.delete(id)?;
		info!(id, "deleted book");
		self.persist()?;
		Ok(book)
	}

	/// Final save before the process goes away.
	pub fn shutdown(&self) -> Result<(), StoreError> {
		self.store.save(self.catalog.list())?;
		info!(books = self.catalog.len(), "library saved on exit");
		Ok(())
	}

	fn persist(&self) -> Result<(), StoreError> {
		self.store.save(self.catalog.list()).inspect_err(|e| {
			error!(error = %e, "failed to save library");
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::types::Status;
	use pretty_assertions::assert_eq;
	use tempfile::TempDir;

	fn open_in(dir: &TempDir) -> Library {
		Library::open(FlatFile::new(dir.path().join("books.txt")), 100).unwrap()
	}

	#[test]
	fn every_mutation_is_written_through() {
		let dir = TempDir::new().unwrap();
		let mut library = open_in(&dir);
		library.add(1, BookDetails::new("Dune", "Herbert", 1965, 2)).unwrap();
		library.add(2, BookDetails::new("Emma", "Austen", 1815, 1)).unwrap();
		library.issue(2).unwrap();

		let reopened = open_in(&dir);
		assert_eq!(reopened.list(), library.list());
		assert_eq!(reopened.find(2).unwrap().status, Status::Issued);

		library.delete(1).unwrap();
		let reopened = open_in(&dir);
		assert_eq!(reopened.list().len(), 1);
	}

	#[test]
	fn catalog_errors_do_not_touch_the_store() {
		let dir = TempDir::new().unwrap();
		let mut library = open_in(&dir);

		let err = library.issue(9).unwrap_err();

		assert!(matches!(err, LibraryError::Catalog(CatalogError::NotFound(9))));
		assert!(!dir.path().join("books.txt").exists());
	}

	#[test]
	fn failed_save_keeps_change_in_memory() {
		let dir = TempDir::new().unwrap();
		let store = FlatFile::new(dir.path().join("gone").join("books.txt"));
		let mut library = Library::open(store, 100).unwrap();

		let err = library.add(1, BookDetails::new("Dune", "Herbert", 1965, 1)).unwrap_err();

		assert!(matches!(err, LibraryError::Store(StoreError::Write { .. })));
		assert_eq!(library.find(1).unwrap().title, "Dune");
		assert!(library.shutdown().is_err());
	}

	#[test]
	fn shutdown_saves_current_state() {
		let dir = TempDir::new().unwrap();
		let mut library = open_in(&dir);
		library.add(5, BookDetails::new("Ubik", "Dick", 1969, 1)).unwrap();
		std::fs::remove_file(dir.path().join("books.txt")).unwrap();

		library.shutdown().unwrap();

		assert_eq!(open_in(&dir).list(), library.list());
	}
}
