//! Data models for the catalog

pub mod author;
pub mod book;
pub mod book_instance;
pub mod genre;
pub mod language;
pub mod pagination;
pub mod user;

// Re-export commonly used types
pub use author::{Author, AuthorDetail, AuthorInput};
pub use book::{Book, BookDetail, BookInput, BookSummary};
pub use book_instance::{BookInstance, BookInstanceDetails, BookInstanceInput, LoanScope, LoanStatus, RenewalForm};
pub use genre::Genre;
pub use language::Language;
pub use pagination::{PaginatedResponse, Pagination};
pub use user::{Borrower, Capability, UserClaims};
