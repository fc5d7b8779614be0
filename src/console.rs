//! Numbered menu over any line reader and writer.

use std::io::{self, BufRead, Write};
use std::str::FromStr;

use tracing::debug;

use crate::library::{Library, LibraryError};
use crate::types::{Book, BookDetails, BookId, Quantity, Year};

const MENU: &str = "
========== LIBRARY MENU ==========
1. Add Book
2. Display Books
3. Search Book
4. Issue Book
5. Return Book
6. Update Book
7. Delete Book
8. Exit";

/// Raised when input runs out in the middle of a prompt.
struct Eof;

enum Flow {
	Continue,
	Exit,
}

pub struct Console<R, W> {
	input: R,
	out: W,
}

impl<R: BufRead, W: Write> Console<R, W> {
	pub fn new(input: R, out: W) -> Self {
		Console { input, out }
	}

	/// Runs the menu until Exit is chosen or input ends, then does the
	/// final save.
	pub fn run(&mut self, library: &mut Library) -> io::Result<()> {
		loop {
			writeln!(self.out, "{MENU}")?;
			let flow = match self.prompt::<u32>("Enter choice: ")? {
				Ok(choice) => self.dispatch(choice, library)?,
				Err(Eof) => Flow::Exit,
			};
			if let Flow::Exit = flow {
				break;
			}
		}

		match library.shutdown() {
			Ok(()) => writeln!(self.out, "Exiting... Data saved successfully.")?,
			Err(e) => writeln!(self.out, "Error saving file! {e}")?,
		}
		self.out.flush()
	}

	fn dispatch(&mut self, choice: u32, library: &mut Library) -> io::Result<Flow> {
		debug!(choice, "menu selection");
		let step = match choice {
			1 => self.add(library)?,
			2 => self.display(library).map(Ok)?,
			3 => self.search(library)?,
			4 => self.issue(library)?,
			5 => self.return_book(library)?,
			6 => self.update(library)?,
			7 => self.delete(library)?,
			8 => return Ok(Flow::Exit),
			_ => {
				writeln!(self.out, "Invalid choice! Please try again.")?;
				Ok(())
			}
		};
		Ok(match step {
			Ok(()) => Flow::Continue,
			Err(Eof) => Flow::Exit,
		})
	}

	fn add(&mut self, library: &mut Library) -> io::Result<Result<(), Eof>> {
		if library.list().len() >= library.catalog().capacity() {
			writeln!(self.out, "Library is full!")?;
			return Ok(Ok(()));
		}
		let Ok(id) = self.prompt::<BookId>("Enter Book ID: ")? else {
			return Ok(Err(Eof));
		};
		if library.find(id).is_ok() {
			writeln!(self.out, "Book ID already exists! Try a different ID.")?;
			return Ok(Ok(()));
		}
		let Ok(details) = self.details("")? else {
			return Ok(Err(Eof));
		};
		let result = library.add(id, details).map(|_| ());
		self.report(result, "Book added successfully!")?;
		Ok(Ok(()))
	}

	fn display(&mut self, library: &Library) -> io::Result<()> {
		let books = library.list();
		if books.is_empty() {
			return writeln!(self.out, "No books available.");
		}
		writeln!(self.out, "\n------------ BOOK LIST ------------")?;
		for book in books {
			self.print_book(book)?;
			writeln!(self.out)?;
		}
		Ok(())
	}

	fn search(&mut self, library: &Library) -> io::Result<Result<(), Eof>> {
		let Ok(id) = self.prompt::<BookId>("Enter Book ID to search: ")? else {
			return Ok(Err(Eof));
		};
		match library.find(id) {
			Ok(book) => {
				writeln!(self.out, "\nBook Found!")?;
				self.print_book(book)?;
			}
			Err(_) => writeln!(self.out, "Book not found.")?,
		}
		Ok(Ok(()))
	}

	fn issue(&mut self, library: &mut Library) -> io::Result<Result<(), Eof>> {
		let Ok(id) = self.prompt::<BookId>("Enter Book ID to issue: ")? else {
			return Ok(Err(Eof));
		};
		let result = library.issue(id).map(|_| ());
		self.report(result, "Book issued successfully!")?;
		Ok(Ok(()))
	}

	fn return_book(&mut self, library: &mut Library) -> io::Result<Result<(), Eof>> {
		let Ok(id) = self.prompt::<BookId>("Enter Book ID to return: ")? else {
			return Ok(Err(Eof));
		};
		let result = library.return_book(id).map(|_| ());
		self.report(result, "Book returned successfully!")?;
		Ok(Ok(()))
	}

	fn update(&mut self, library: &mut Library) -> io::Result<Result<(), Eof>> {
		let Ok(id) = self.prompt::<BookId>("Enter Book ID to update: ")? else {
			return Ok(Err(Eof));
		};
		if library.find(id).is_err() {
			writeln!(self.out, "Book not found.")?;
			return Ok(Ok(()));
		}
		let Ok(details) = self.details("new ")? else {
			return Ok(Err(Eof));
		};
		let result = library.update(id, details).map(|_| ());
		self.report(result, "Book updated successfully!")?;
		Ok(Ok(()))
	}

	fn delete(&mut self, library: &mut Library) -> io::Result<Result<(), Eof>> {
		let Ok(id) = self.prompt::<BookId>("Enter Book ID to delete: ")? else {
			return Ok(Err(Eof));
		};
		let result = library.delete(id).map(|_| ());
		self.report(result, "Book deleted successfully!")?;
		Ok(Ok(()))
	}

	fn details(&mut self, qualifier: &str) -> io::Result<Result<BookDetails, Eof>> {
		let Ok(title) = self.prompt_text(&format!("Enter {qualifier}Title: "))? else {
			return Ok(Err(Eof));
		};
		let Ok(author) = self.prompt_text(&format!("Enter {qualifier}Author: "))? else {
			return Ok(Err(Eof));
		};
		let Ok(year) = self.prompt::<Year>(&format!("Enter {qualifier}Year: "))? else {
			return Ok(Err(Eof));
		};
		let Ok(quantity) = self.prompt::<Quantity>(&format!("Enter {qualifier}Quantity: "))? else {
			return Ok(Err(Eof));
		};
		Ok(Ok(BookDetails::new(&title, &author, year, quantity)))
	}

	fn report(&mut self, result: Result<(), LibraryError>, success: &str) -> io::Result<()> {
		match result {
			Ok(()) => writeln!(self.out, "{success}"),
			Err(LibraryError::Store(e)) => {
				writeln!(self.out, "{success}")?;
				writeln!(self.out, "Error saving file! {e}")
			}
			Err(LibraryError::Catalog(e)) => writeln!(self.out, "{}", catalog_message(&e)),
		}
	}

	fn print_book(&mut self, book: &Book) -> io::Result<()> {
		writeln!(
			self.out,
			"ID: {}\nTitle: {}\nAuthor: {}\nYear: {}\nQuantity: {}\nStatus: {}",
			book.id, book.title, book.author, book.year, book.quantity, book.status
		)
	}

	/// Asks until a line parses as `T`.
	fn prompt<T: FromStr>(&mut self, label: &str) -> io::Result<Result<T, Eof>> {
		loop {
			let Ok(line) = self.prompt_text(label)? else {
				return Ok(Err(Eof));
			};
			match line.trim().parse() {
				Ok(value) => return Ok(Ok(value)),
				Err(_) => writeln!(self.out, "Please enter a valid number.")?,
			}
		}
	}

	/// Asks until a non-blank line arrives.
	fn prompt_text(&mut self, label: &str) -> io::Result<Result<String, Eof>> {
		loop {
			write!(self.out, "{label}")?;
			self.out.flush()?;
			let mut line = String::new();
			if self.input.read_line(&mut line)? == 0 {
				return Ok(Err(Eof));
			}
			let line = line.trim_end_matches(['\n', '\r']);
			if !line.trim().is_empty() {
				return Ok(Ok(line.trim_start().to_owned()));
			}
		}
	}
}

fn catalog_message(err: &crate::catalog::CatalogError) -> &'static str {
	use crate::catalog::CatalogError::*;
	match err {
		DuplicateId(_) => "Book ID already exists! Try a different ID.",
		Full(_) => "Library is full!",
		NotFound(_) => "Book not found.",
		OutOfStock(_) => "Book is not available!",
		QuantityOverflow(_) => "Book can't hold any more copies!",
	}
}
