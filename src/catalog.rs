use thiserror::Error;

use crate::types::{clamp_field, Book, BookDetails, BookId, Status};

pub const DEFAULT_CAPACITY: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
	#[error("book id {0} already exists")]
	DuplicateId(BookId),
	#[error("library is full ({0} books)")]
	Full(usize),
	#[error("book {0} not found")]
	NotFound(BookId),
	#[error("book {0} is not available")]
	OutOfStock(BookId),
	#[error("book {0} can't hold any more copies")]
	QuantityOverflow(BookId),
}

/// Insertion-ordered, capacity-bounded set of books keyed by id.
///
/// Lookups are linear scans; the capacity is small enough that an index
/// would only add a second place for ids to disagree.
#[derive(Debug, Clone)]
pub struct Catalog {
	books: Vec<Book>,
	capacity: usize,
}

impl Catalog {
	pub fn new(capacity: usize) -> Self {
		Catalog {
			books: Vec::new(),
			capacity,
		}
	}

	/// Builds a catalog from already validated records.
	pub fn from_books(capacity: usize, books: Vec<Book>) -> Self {
		Catalog { books, capacity }
	}

	pub fn add(&mut self, id: BookId, details: BookDetails) -> Result<&Book, CatalogError> {
		if self.books.len() >= self.capacity {
			return Err(CatalogError::Full(self.capacity));
		}
		if self.position(id).is_some() {
			return Err(CatalogError::DuplicateId(id));
		}
		self.books.push(Book::new(id, details));
		Ok(&self.books[self.books.len() - 1])
	}

	pub fn find(&self, id: BookId) -> Result<&Book, CatalogError> {
		self.books
			.iter()
			.find(|book| book.id == id)
			.ok_or(CatalogError::NotFound(id))
	}

	pub fn list(&self) -> &[Book] {
		&self.books
	}

	/// Hands out one copy. Status flips to Issued when the last copy leaves.
	pub fn issue(&mut self, id: BookId) -> Result<&Book, CatalogError> {
		let book = self.find_mut(id)?;
		if book.quantity == 0 {
			return Err(CatalogError::OutOfStock(id));
		}
		book.quantity -= 1;
		if book.quantity == 0 {
			book.status = Status::Issued;
		}
		Ok(book)
	}

	/// Takes one copy back. There is no outstanding-issue ledger: any known
	/// id accepts a return and always ends up Available.
	pub fn return_book(&mut self, id: BookId) -> Result<&Book, CatalogError> {
		let book = self.find_mut(id)?;
		book.quantity = book
			.quantity
			.checked_add(1)
			.ok_or(CatalogError::QuantityOverflow(id))?;
		book.status = Status::Available;
		Ok(book)
	}

	/// Overwrites everything but the id and recomputes status from the new
	/// quantity.
	pub fn update(&mut self, id: BookId, details: BookDetails) -> Result<&Book, CatalogError> {
		let book = self.find_mut(id)?;
		let BookDetails { title, author, year, quantity } = details;
		book.title = clamp_field(&title);
		book.author = clamp_field(&author);
		book.year = year;
		book.quantity = quantity;
		book.status = Status::from_quantity(quantity);
		Ok(book)
	}

	/// Removes the record, keeping the order of the rest.
	pub fn delete(&mut self, id: BookId) -> Result<Book, CatalogError> {
		let index = self.position(id).ok_or(CatalogError::NotFound(id))?;
		Ok(self.books.remove(index))
	}

	pub fn len(&self) -> usize {
		self.books.len()
	}

	pub fn is_empty(&self) -> bool {
		self.books.is_empty()
	}

	pub fn capacity(&self) -> usize {
		self.capacity
	}

	fn position(&self, id: BookId) -> Option<usize> {
		self.books.iter().position(|book| book.id == id)
	}

	fn find_mut(&mut self, id: BookId) -> Result<&mut Book, CatalogError> {
		self.books
			.iter_mut()
			.find(|book| book.id == id)
			.ok_or(CatalogError::NotFound(id))
	}
}

impl Default for Catalog {
	fn default() -> Self {
		Catalog::new(DEFAULT_CAPACITY)
	}
}
