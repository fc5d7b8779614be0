use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
	extract::{Path, Query, State},
	http::StatusCode,
	routing::{get, post},
	Form, Router,
};
use maud::{html, Markup, DOCTYPE};
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::catalog::CatalogError;
use crate::library::{Library, LibraryError};
use crate::types::{Book, BookDetails, BookId, NewBookForm, SearchParam, UpdateBookForm};

/// The lock covers both the catalog and its file, so saves never overlap.
pub type SharedState = Arc<Mutex<Library>>;

type Page = (StatusCode, Markup);

pub fn router(state: SharedState) -> Router {
	Router::new()
		.route("/", get(display_all))
		.route("/search", get(perform_search))
		.route("/books", post(add_book))
		.route("/books/:id", get(display_book))
		.route("/books/:id/issue", post(issue_book))
		.route("/books/:id/return", post(return_book))
		.route("/books/:id/update", post(update_book))
		.route("/books/:id/delete", post(delete_book))
		.layer(TraceLayer::new_for_http())
		.with_state(state)
}

/// Serves until Ctrl-C, then writes the catalog one last time.
pub async fn serve(library: Library, addr: SocketAddr) -> anyhow::Result<()> {
	let state: SharedState = Arc::new(Mutex::new(library));
	let listener = tokio::net::TcpListener::bind(addr).await?;
	info!(%addr, "listening");

	axum::serve(listener, router(state.clone()))
		.with_graceful_shutdown(shutdown_signal())
		.await?;

	let library = state.lock_owned().await;
	tokio::task::spawn_blocking(move || library.shutdown()).await??;
	Ok(())
}

/// Runs a write-through mutation on the blocking pool. The guard moves
/// into the task, so the next mutation waits until this save is done.
async fn mutate<T, F>(state: &SharedState, op: F) -> Result<T, LibraryError>
where
	T: Send + 'static,
	F: FnOnce(&mut Library) -> Result<T, LibraryError> + Send + 'static,
{
	let mut library = state.clone().lock_owned().await;
	match tokio::task::spawn_blocking(move || op(&mut library)).await {
		Ok(result) => result,
		Err(e) => std::panic::resume_unwind(e.into_panic()),
	}
}

async fn shutdown_signal() {
	if let Err(e) = tokio::signal::ctrl_c().await {
		warn!(error = %e, "can't listen for ctrl-c, shutting down");
	}
	info!("shutting down");
}

async fn display_all(State(state): State<SharedState>) -> Markup {
	let library = state.lock().await;
	let catalog = library.catalog();

	layout(html! {
		p { (catalog.len()) " / " (catalog.capacity()) " books" }
		@if catalog.is_empty() {
			p { "No books available." }
		} @else {
			(book_table(catalog.list()))
		}
		h2 { "Search" }
		form method="GET" action="/search" {
			input name="id" type="number" placeholder="id" {}
			button { "Search" }
		}
		h2 { "Add" }
		form method="POST" action="/books" {
			input name="id" type="number" placeholder="id" {}
			(details_inputs(None))
			button { "Add" }
		}
	})
}

async fn perform_search(
	State(state): State<SharedState>,
	Query(qry): Query<SearchParam>,
) -> Page {
	let raw = qry.id.unwrap_or_default();
	let Ok(id) = raw.trim().parse::<BookId>() else {
		return (
			StatusCode::BAD_REQUEST,
			layout(html! { p { "Invalid book id: " (raw) } }),
		);
	};
	let library = state.lock().await;
	match library.find(id) {
		Ok(book) => (StatusCode::OK, book_page(book)),
		Err(e) => error_page(&e.into()),
	}
}

async fn display_book(State(state): State<SharedState>, Path(id): Path<BookId>) -> Page {
	let library = state.lock().await;
	match library.find(id) {
		Ok(book) => (StatusCode::OK, book_page(book)),
		Err(e) => error_page(&e.into()),
	}
}

async fn add_book(State(state): State<SharedState>, Form(form): Form<NewBookForm>) -> Page {
	let details = BookDetails::new(&form.title, &form.author, form.year, form.quantity);
	let result = mutate(&state, move |library| library.add(form.id, details)).await;
	done(result, StatusCode::CREATED, "Book added.")
}

async fn issue_book(State(state): State<SharedState>, Path(id): Path<BookId>) -> Page {
	let result = mutate(&state, move |library| library.issue(id)).await;
	done(result, StatusCode::OK, "Book issued.")
}

async fn return_book(State(state): State<SharedState>, Path(id): Path<BookId>) -> Page {
	let result = mutate(&state, move |library| library.return_book(id)).await;
	done(result, StatusCode::OK, "Book returned.")
}

async fn update_book(
	State(state): State<SharedState>,
	Path(id): Path<BookId>,
	Form(form): Form<UpdateBookForm>,
) -> Page {
	let result = mutate(&state, move |library| library.update(id, form.into())).await;
	done(result, StatusCode::OK, "Book updated.")
}

async fn delete_book(State(state): State<SharedState>, Path(id): Path<BookId>) -> Page {
	match mutate(&state, move |library| library.delete(id)).await {
		Ok(book) => (
			StatusCode::OK,
			layout(html! { p { "Deleted " (book.title) "." } }),
		),
		Err(e) => error_page(&e),
	}
}

fn done(result: Result<Book, LibraryError>, status: StatusCode, message: &str) -> Page {
	match result {
		Ok(book) => (
			status,
			layout(html! {
				p { (message) }
				(book_table(std::slice::from_ref(&book)))
			}),
		),
		Err(e) => error_page(&e),
	}
}

fn error_page(err: &LibraryError) -> Page {
	let status = match err {
		LibraryError::Catalog(CatalogError::NotFound(_)) => StatusCode::NOT_FOUND,
		LibraryError::Catalog(CatalogError::DuplicateId(_)) => StatusCode::CONFLICT,
		LibraryError::Catalog(CatalogError::OutOfStock(_)) => StatusCode::CONFLICT,
		LibraryError::Catalog(CatalogError::QuantityOverflow(_)) => StatusCode::CONFLICT,
		LibraryError::Catalog(CatalogError::Full(_)) => StatusCode::INSUFFICIENT_STORAGE,
		LibraryError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
	};
	(status, layout(html! { p class="error" { (err) } }))
}

fn layout(body: Markup) -> Markup {
	html! {
		(DOCTYPE)
		html {
			head { title { "Library" } }
			body {
				h1 { a href="/" { "Library" } }
				(body)
			}
		}
	}
}

fn book_table(books: &[Book]) -> Markup {
	html! {
		table {
			thead { tr {
				th { "ID" }
				th { "Title" }
				th { "Author" }
				th { "Year" }
				th { "Quantity" }
				th { "Status" }
			} }
			tbody {
				@for book in books {
					tr {
						td { a href={ "/books/" (book.id) } { (book.id) } }
						td { (book.title) }
						td { (book.author) }
						td { (book.year) }
						td { (book.quantity) }
						td { (book.status) }
					}
				}
			}
		}
	}
}

fn book_page(book: &Book) -> Markup {
	let base = format!("/books/{}", book.id);
	layout(html! {
		(book_table(std::slice::from_ref(book)))
		form method="POST" action={ (base) "/issue" } { button { "Issue" } }
		form method="POST" action={ (base) "/return" } { button { "Return" } }
		form method="POST" action={ (base) "/delete" } { button { "Delete" } }
		h2 { "Update" }
		form method="POST" action={ (base) "/update" } {
			(details_inputs(Some(book)))
			button { "Update" }
		}
	})
}

fn details_inputs(book: Option<&Book>) -> Markup {
	html! {
		input name="title" type="text" maxlength="49" placeholder="title" value=[book.map(|b| &b.title)] {}
		input name="author" type="text" maxlength="49" placeholder="author" value=[book.map(|b| &b.author)] {}
		input name="year" type="number" placeholder="year" value=[book.map(|b| b.year)] {}
		input name="quantity" type="number" min="0" placeholder="quantity" value=[book.map(|b| b.quantity)] {}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::store::FlatFile;
	use crate::types::Status;
	use axum::body::Body;
	use axum::http::{header, Method, Request};
	use tempfile::TempDir;
	use tower::ServiceExt;

	fn test_state(dir: &TempDir) -> SharedState {
		state_with_capacity(dir, 2)
	}

	fn state_with_capacity(dir: &TempDir, capacity: usize) -> SharedState {
		let store = FlatFile::new(dir.path().join("books.txt"));
		Arc::new(Mutex::new(Library::open(store, capacity).unwrap()))
	}

	async fn send(state: &SharedState, method: Method, uri: &str, form: Option<&str>) -> (StatusCode, String) {
		let mut builder = Request::builder().method(method).uri(uri);
		let body = match form {
			Some(form) => {
				builder = builder.header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
				Body::from(form.to_owned())
			}
			None => Body::empty(),
		};
		let response = router(state.clone())
			.oneshot(builder.body(body).unwrap())
			.await
			.unwrap();
		let status = response.status();
		let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
		(status, String::from_utf8(bytes.to_vec()).unwrap())
	}

	const DUNE: &str = "id=1&title=Dune&author=Herbert&year=1965&quantity=1";

	#[tokio::test]
	async fn add_list_and_search() {
		let dir = TempDir::new().unwrap();
		let state = test_state(&dir);

		let (status, _) = send(&state, Method::POST, "/books", Some(DUNE)).await;
		assert_eq!(status, StatusCode::CREATED);

		let (status, body) = send(&state, Method::GET, "/", None).await;
		assert_eq!(status, StatusCode::OK);
		assert!(body.contains("Herbert"));

		let (status, body) = send(&state, Method::GET, "/search?id=1", None).await;
		assert_eq!(status, StatusCode::OK);
		assert!(body.contains("Dune"));

		let (status, _) = send(&state, Method::GET, "/search?id=abc", None).await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		let (status, _) = send(&state, Method::GET, "/books/7", None).await;
		assert_eq!(status, StatusCode::NOT_FOUND);
	}

	#[tokio::test]
	async fn empty_catalog_renders() {
		let dir = TempDir::new().unwrap();
		let state = test_state(&dir);
		let (status, body) = send(&state, Method::GET, "/", None).await;
		assert_eq!(status, StatusCode::OK);
		assert!(body.contains("No books available."));
	}

	#[tokio::test]
	async fn issue_and_return_map_errors() {
		let dir = TempDir::new().unwrap();
		let state = test_state(&dir);
		send(&state, Method::POST, "/books", Some(DUNE)).await;

		let (status, _) = send(&state, Method::POST, "/books/1/issue", None).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(state.lock().await.find(1).unwrap().status, Status::Issued);

		let (status, _) = send(&state, Method::POST, "/books/1/issue", None).await;
		assert_eq!(status, StatusCode::CONFLICT);

		let (status, _) = send(&state, Method::POST, "/books/1/return", None).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(state.lock().await.find(1).unwrap().quantity, 1);
	}

	#[tokio::test]
	async fn duplicate_and_full() {
		let dir = TempDir::new().unwrap();
		let state = test_state(&dir);
		send(&state, Method::POST, "/books", Some(DUNE)).await;

		let (status, _) = send(&state, Method::POST, "/books", Some(DUNE)).await;
		assert_eq!(status, StatusCode::CONFLICT);

		let emma = "id=2&title=Emma&author=Austen&year=1815&quantity=1";
		send(&state, Method::POST, "/books", Some(emma)).await;
		let ubik = "id=3&title=Ubik&author=Dick&year=1969&quantity=1";
		let (status, _) = send(&state, Method::POST, "/books", Some(ubik)).await;
		assert_eq!(status, StatusCode::INSUFFICIENT_STORAGE);
	}

	#[tokio::test]
	async fn update_then_delete_persists() {
		let dir = TempDir::new().unwrap();
		let state = test_state(&dir);
		send(&state, Method::POST, "/books", Some(DUNE)).await;

		let form = "title=Dune+Messiah&author=Herbert&year=1969&quantity=0";
		let (status, body) = send(&state, Method::POST, "/books/1/update", Some(form)).await;
		assert_eq!(status, StatusCode::OK);
		assert!(body.contains("Dune Messiah"));
		assert!(body.contains("Issued"));

		let (status, _) = send(&state, Method::POST, "/books/1/delete", None).await;
		assert_eq!(status, StatusCode::OK);
		let (status, _) = send(&state, Method::POST, "/books/1/delete", None).await;
		assert_eq!(status, StatusCode::NOT_FOUND);

		let text = std::fs::read_to_string(dir.path().join("books.txt")).unwrap();
		assert!(text.is_empty());
	}

	#[tokio::test]
	async fn return_past_max_quantity_conflicts() {
		let dir = TempDir::new().unwrap();
		let state = test_state(&dir);
		let huge = format!("id=1&title=Huge&author=Someone&year=2000&quantity={}", u32::MAX);
		send(&state, Method::POST, "/books", Some(huge.as_str())).await;

		let (status, _) = send(&state, Method::POST, "/books/1/return", None).await;

		assert_eq!(status, StatusCode::CONFLICT);
		assert_eq!(state.lock().await.find(1).unwrap().quantity, u32::MAX);
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
	async fn concurrent_adds_are_all_saved() {
		let dir = TempDir::new().unwrap();
		let state = state_with_capacity(&dir, 100);

		let mut handles = Vec::new();
		for id in 1..=20 {
			let state = state.clone();
			handles.push(tokio::spawn(async move {
				let form = format!("id={id}&title=Book{id}&author=Someone&year=2000&quantity=1");
				send(&state, Method::POST, "/books", Some(form.as_str())).await.0
			}));
		}
		for handle in handles {
			assert_eq!(handle.await.unwrap(), StatusCode::CREATED);
		}

		let reopened = Library::open(FlatFile::new(dir.path().join("books.txt")), 100).unwrap();
		assert_eq!(reopened.list().len(), 20);
	}
}
