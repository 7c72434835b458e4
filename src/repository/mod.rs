//! Repository layer: catalog storage traits and their backends

pub mod authors;
pub mod book_instances;
pub mod books;
pub mod genres;
pub mod languages;
pub mod memory;
pub mod users;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        author::{Author, AuthorInput},
        book::{Book, BookInput, BookSummary},
        book_instance::{BookInstance, BookInstanceDetails, BookInstanceInput, InstanceFilter, InstanceOrder},
        genre::{Genre, GenreInput},
        language::{Language, LanguageInput},
        pagination::Pagination,
        user::Borrower,
    },
};

/// Author lookup filter
#[derive(Debug, Clone, Default)]
pub struct AuthorFilter {
    /// Case-insensitive substring of first or last name
    pub name_contains: Option<String>,
}

/// Book lookup filter
#[derive(Debug, Clone, Default)]
pub struct BookFilter {
    /// Case-insensitive substring of the title
    pub title_contains: Option<String>,
    pub author_id: Option<i32>,
    pub genre_id: Option<i32>,
}

#[async_trait]
pub trait AuthorStore: Send + Sync {
    async fn count(&self, filter: &AuthorFilter) -> AppResult<i64>;
    /// Ordered by last name, then first name
    async fn list(&self, filter: &AuthorFilter, page: Pagination) -> AppResult<(Vec<Author>, i64)>;
    async fn get(&self, id: i32) -> AppResult<Author>;
    async fn create(&self, input: &AuthorInput) -> AppResult<Author>;
    async fn update(&self, id: i32, input: &AuthorInput) -> AppResult<Author>;
    /// Refuses with `Conflict` while books reference the author
    async fn delete(&self, id: i32) -> AppResult<()>;
}

#[async_trait]
pub trait BookStore: Send + Sync {
    async fn count(&self, filter: &BookFilter) -> AppResult<i64>;
    /// Ordered by title
    async fn list(&self, filter: &BookFilter, page: Pagination) -> AppResult<(Vec<BookSummary>, i64)>;
    async fn get(&self, id: i32) -> AppResult<Book>;
    async fn create(&self, input: &BookInput) -> AppResult<Book>;
    async fn update(&self, id: i32, input: &BookInput) -> AppResult<Book>;
    /// Without `cascade`, refuses while copies exist. With it, copies go too,
    /// unless one of them is on loan.
    async fn delete(&self, id: i32, cascade: bool) -> AppResult<()>;
}

#[async_trait]
pub trait GenreStore: Send + Sync {
    async fn count(&self) -> AppResult<i64>;
    async fn list(&self) -> AppResult<Vec<Genre>>;
    async fn get(&self, id: i32) -> AppResult<Genre>;
    async fn create(&self, input: &GenreInput) -> AppResult<Genre>;
    async fn delete(&self, id: i32) -> AppResult<()>;
}

#[async_trait]
pub trait LanguageStore: Send + Sync {
    async fn list(&self) -> AppResult<Vec<Language>>;
    async fn get(&self, id: i32) -> AppResult<Language>;
    async fn create(&self, input: &LanguageInput) -> AppResult<Language>;
    async fn delete(&self, id: i32) -> AppResult<()>;
}

#[async_trait]
pub trait BookInstanceStore: Send + Sync {
    async fn count(&self, filter: &InstanceFilter) -> AppResult<i64>;
    /// `is_overdue` is left false; the caller knows today's date
    async fn list(
        &self,
        filter: &InstanceFilter,
        order: InstanceOrder,
        page: Pagination,
    ) -> AppResult<(Vec<BookInstanceDetails>, i64)>;
    async fn get(&self, id: Uuid) -> AppResult<BookInstance>;
    async fn get_details(&self, id: Uuid) -> AppResult<BookInstanceDetails>;
    async fn create(&self, input: &BookInstanceInput) -> AppResult<BookInstance>;
    async fn update(&self, id: Uuid, input: &BookInstanceInput) -> AppResult<BookInstance>;
    async fn delete(&self, id: Uuid) -> AppResult<()>;
    /// Single-record update of the due date
    async fn set_due_back(&self, id: Uuid, due_back: NaiveDate) -> AppResult<BookInstance>;
    /// Available -> on loan; `None` when the copy was not available
    async fn check_out(&self, id: Uuid, borrower_id: i32, due_back: NaiveDate) -> AppResult<Option<BookInstance>>;
    /// On loan -> available; `None` when the copy was not on loan
    async fn check_in(&self, id: Uuid) -> AppResult<Option<BookInstance>>;
}

#[async_trait]
pub trait BorrowerStore: Send + Sync {
    async fn get(&self, id: i32) -> AppResult<Borrower>;
    async fn create(&self, login: &str, first_name: &str, last_name: &str) -> AppResult<Borrower>;
}

/// Handles to every store
#[derive(Clone)]
pub struct Repository {
    pub authors: Arc<dyn AuthorStore>,
    pub books: Arc<dyn BookStore>,
    pub genres: Arc<dyn GenreStore>,
    pub languages: Arc<dyn LanguageStore>,
    pub instances: Arc<dyn BookInstanceStore>,
    pub borrowers: Arc<dyn BorrowerStore>,
}

impl Repository {
    /// Create a repository backed by the given PostgreSQL pool
    pub fn postgres(pool: Pool<Postgres>) -> Self {
        Self {
            authors: Arc::new(authors::AuthorsRepository::new(pool.clone())),
            books: Arc::new(books::BooksRepository::new(pool.clone())),
            genres: Arc::new(genres::GenresRepository::new(pool.clone())),
            languages: Arc::new(languages::LanguagesRepository::new(pool.clone())),
            instances: Arc::new(book_instances::BookInstancesRepository::new(pool.clone())),
            borrowers: Arc::new(users::BorrowersRepository::new(pool)),
        }
    }

    /// Create a repository over a fresh in-memory store
    pub fn in_memory() -> Self {
        let store = Arc::new(memory::InMemoryStore::default());
        Self {
            authors: store.clone(),
            books: store.clone(),
            genres: store.clone(),
            languages: store.clone(),
            instances: store.clone(),
            borrowers: store,
        }
    }
}

/// Postgres error code for unique constraint violations
pub(crate) const UNIQUE_VIOLATION: &str = "23505";
/// Postgres error code for foreign key violations
pub(crate) const FOREIGN_KEY_VIOLATION: &str = "23503";

fn has_code(e: &sqlx::Error, code: &str) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.code().as_deref() == Some(code))
}

pub(crate) fn is_unique_violation(e: &sqlx::Error) -> bool {
    has_code(e, UNIQUE_VIOLATION)
}

pub(crate) fn is_foreign_key_violation(e: &sqlx::Error) -> bool {
    has_code(e, FOREIGN_KEY_VIOLATION)
}

/// Maps a delete refused by a restricting foreign key to a conflict
pub(crate) fn restricted_delete(e: sqlx::Error, message: impl FnOnce() -> String) -> AppError {
    if is_foreign_key_violation(&e) {
        AppError::Conflict(message())
    } else {
        AppError::Database(e)
    }
}

#[cfg(test)]
mod tests {
    use std::{borrow::Cow, error::Error as StdError, fmt};

    use sqlx::error::{DatabaseError, ErrorKind};

    use super::*;

    #[derive(Debug)]
    struct PgError(&'static str);

    impl fmt::Display for PgError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "postgres error {}", self.0)
        }
    }

    impl StdError for PgError {}

    impl DatabaseError for PgError {
        fn message(&self) -> &str {
            "constraint violated"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed(self.0))
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            ErrorKind::Other
        }
    }

    fn pg(code: &'static str) -> sqlx::Error {
        sqlx::Error::Database(Box::new(PgError(code)))
    }

    #[test]
    fn violations_are_told_apart_by_code() {
        assert!(is_unique_violation(&pg(UNIQUE_VIOLATION)));
        assert!(!is_unique_violation(&pg(FOREIGN_KEY_VIOLATION)));
        assert!(is_foreign_key_violation(&pg(FOREIGN_KEY_VIOLATION)));
        assert!(!is_foreign_key_violation(&sqlx::Error::RowNotFound));
    }

    #[test]
    fn referenced_row_delete_is_a_conflict() {
        let err = restricted_delete(pg(FOREIGN_KEY_VIOLATION), || "Author 1 still has books".into());
        assert!(matches!(err, AppError::Conflict(ref m) if m == "Author 1 still has books"));

        let err = restricted_delete(pg(UNIQUE_VIOLATION), || unreachable!());
        assert!(matches!(err, AppError::Database(_)));

        let err = restricted_delete(sqlx::Error::PoolTimedOut, || unreachable!());
        assert!(matches!(err, AppError::Database(_)));
    }
}
