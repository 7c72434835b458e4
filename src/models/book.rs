//! Book (catalog title) model and related types

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::{author::Author, book_instance::BookInstanceDetails, genre::Genre};

/// How many genre names the list view shows
pub const GENRE_DISPLAY_LIMIT: usize = 3;

/// Book record with its genres
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author_id: i32,
    pub summary: String,
    pub isbn: String,
    pub genres: Vec<Genre>,
}

/// Bare books row, genres are loaded separately
#[derive(Debug, Clone, FromRow)]
pub struct BookRow {
    pub id: i32,
    pub title: String,
    pub author_id: i32,
    pub summary: String,
    pub isbn: String,
}

impl BookRow {
    pub fn with_genres(self, genres: Vec<Genre>) -> Book {
        Book {
            id: self.id,
            title: self.title,
            author_id: self.author_id,
            summary: self.summary,
            isbn: self.isbn,
            genres,
        }
    }
}

/// Short book representation for lists
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BookSummary {
    pub id: i32,
    pub title: String,
    pub author_id: i32,
    /// "Last, First"
    pub author_name: String,
    /// First genres joined with ", "
    pub genre_display: String,
}

impl BookSummary {
    pub fn new(book: &Book, author: &Author) -> Self {
        Self {
            id: book.id,
            title: book.title.clone(),
            author_id: book.author_id,
            author_name: author.display_name(),
            genre_display: display_genres(&book.genres),
        }
    }
}

/// Join the first few genre names for compact display
pub fn display_genres(genres: &[Genre]) -> String {
    genres
        .iter()
        .take(GENRE_DISPLAY_LIMIT)
        .map(|g| g.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Book with author and copies, as shown on the detail page
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookDetail {
    #[serde(flatten)]
    pub book: Book,
    pub author: Author,
    pub instances: Vec<BookInstanceDetails>,
}

/// Create / replace book request
#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct BookInput {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,
    pub author_id: i32,
    #[validate(length(max = 1000, message = "Summary must be at most 1000 characters"))]
    #[serde(default)]
    pub summary: String,
    /// 10 or 13 character ISBN
    #[validate(length(min = 10, max = 13, message = "ISBN must be 10-13 characters"))]
    pub isbn: String,
    #[serde(default)]
    pub genre_ids: Vec<i32>,
}

/// Book query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct BookQuery {
    /// Case-insensitive substring of the title
    pub title: Option<String>,
    pub author_id: Option<i32>,
    pub genre_id: Option<i32>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}
