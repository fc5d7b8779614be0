use serde::Deserialize;

pub type BookId = i32;
pub type Year = i32;
pub type Quantity = u32;

/// Longest title or author a record keeps, in characters.
pub const MAX_FIELD_CHARS: usize = 49;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
	Available,
	Issued,
}

impl Status {
	/// Integer code used by the store file.
	pub fn code(self) -> u8 {
		match self {
			Status::Available => 0,
			Status::Issued => 1,
		}
	}

	pub fn from_code(code: u8) -> Option<Self> {
		match code {
			0 => Some(Status::Available),
			1 => Some(Status::Issued),
			_ => None,
		}
	}

	pub fn from_quantity(quantity: Quantity) -> Self {
		if quantity > 0 {
			Status::Available
		} else {
			Status::Issued
		}
	}
}

impl std::fmt::Display for Status {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(match self {
			Status::Available => "Available",
			Status::Issued => "Issued",
		})
	}
}

/// One catalog entry. `status` is stored, not computed: each catalog
/// operation decides on its own whether to touch it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Book {
	pub id: BookId,
	pub title: String,
	pub author: String,
	pub year: Year,
	pub quantity: Quantity,
	pub status: Status,
}

/// Editable part of a record, shared by add and update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookDetails {
	pub title: String,
	pub author: String,
	pub year: Year,
	pub quantity: Quantity,
}

impl BookDetails {
	pub fn new(title: &str, author: &str, year: Year, quantity: Quantity) -> Self {
		BookDetails {
			title: clamp_field(title),
			author: clamp_field(author),
			year,
			quantity,
		}
	}
}

impl Book {
	pub fn new(id: BookId, details: BookDetails) -> Self {
		Book {
			id,
			title: clamp_field(&details.title),
			author: clamp_field(&details.author),
			year: details.year,
			quantity: details.quantity,
			status: Status::Available,
		}
	}
}

/// Cuts `field` down to [`MAX_FIELD_CHARS`] characters.
pub fn clamp_field(field: &str) -> String {
	match field.char_indices().nth(MAX_FIELD_CHARS) {
		Some((end, _)) => field[..end].to_owned(),
		None => field.to_owned(),
	}
}

#[derive(Debug, Deserialize)]
pub struct NewBookForm {
	pub id: BookId,
	pub title: String,
	pub author: String,
	pub year: Year,
	pub quantity: Quantity,
}

#[derive(Debug, Deserialize)]
pub struct UpdateBookForm {
	pub title: String,
	pub author: String,
	pub year: Year,
	pub quantity: Quantity,
}

impl From<UpdateBookForm> for BookDetails {
	fn from(form: UpdateBookForm) -> Self {
		BookDetails::new(&form.title, &form.author, form.year, form.quantity)
	}
}

// id stays a string so a malformed value renders a page instead of a
// rejection from the extractor
#[derive(Debug, Deserialize)]
pub struct SearchParam {
	pub id: Option<String>,
}
