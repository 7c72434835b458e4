//! Book endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    error::AppResult,
    models::{
        book::{Book, BookDetail, BookInput, BookQuery, BookSummary},
        pagination::{PaginatedResponse, Pagination},
    },
    repository::BookFilter,
};

use super::AuthenticatedUser;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct DeleteBookQuery {
    /// Delete the book's copies too (none may be on loan)
    #[serde(default)]
    pub force: bool,
}

/// List books ordered by title
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    params(BookQuery),
    responses(
        (status = 200, description = "Page of books", body = PaginatedResponse<BookSummary>)
    )
)]
pub async fn list_books(
    State(state): State<crate::AppState>,
    Query(query): Query<BookQuery>,
) -> AppResult<Json<PaginatedResponse<BookSummary>>> {
    let page = Pagination::new(query.page, query.per_page);
    let filter = BookFilter {
        title_contains: query.title,
        author_id: query.author_id,
        genre_id: query.genre_id,
    };

    let (books, total) = state.services.catalog.list_books(&filter, page).await?;
    Ok(Json(PaginatedResponse::new(books, total, page)))
}

/// Get a book with its author and copies
#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "books",
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book details", body = BookDetail),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book(
    State(state): State<crate::AppState>,
    viewer: Option<AuthenticatedUser>,
    Path(id): Path<i32>,
) -> AppResult<Json<BookDetail>> {
    let viewer = viewer.map(|AuthenticatedUser(claims)| claims);
    let book = state
        .services
        .catalog
        .get_book(viewer.as_ref(), id, state.clock.today())
        .await?;
    Ok(Json(book))
}

/// Create a book
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    security(("bearer_auth" = [])),
    request_body = BookInput,
    responses(
        (status = 201, description = "Book created", body = Book),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "edit-catalog required"),
        (status = 404, description = "Author or genre not found")
    )
)]
pub async fn create_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(input): Json<BookInput>,
) -> AppResult<(StatusCode, Json<Book>)> {
    let book = state.services.catalog.create_book(&claims, input).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

/// Replace a book
#[utoipa::path(
    put,
    path = "/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    request_body = BookInput,
    responses(
        (status = 200, description = "Book updated", body = Book),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "edit-catalog required"),
        (status = 404, description = "Book, author or genre not found")
    )
)]
pub async fn update_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(input): Json<BookInput>,
) -> AppResult<Json<Book>> {
    let book = state.services.catalog.update_book(&claims, id, input).await?;
    Ok(Json(book))
}

/// Delete a book
#[utoipa::path(
    delete,
    path = "/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Book ID"),
        DeleteBookQuery
    ),
    responses(
        (status = 204, description = "Book deleted"),
        (status = 403, description = "edit-catalog required"),
        (status = 404, description = "Book not found"),
        (status = 409, description = "Book has copies (or a copy on loan when forced)")
    )
)]
pub async fn delete_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Query(query): Query<DeleteBookQuery>,
) -> AppResult<StatusCode> {
    state.services.catalog.delete_book(&claims, id, query.force).await?;
    Ok(StatusCode::NO_CONTENT)
}
