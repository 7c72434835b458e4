//! Catalog management service

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::{
    access::{require, AccessGate},
    loan_policy::is_overdue,
};
use crate::{
    error::{AppError, AppResult},
    models::{
        author::{Author, AuthorDetail, AuthorInput},
        book::{Book, BookDetail, BookInput, BookSummary},
        book_instance::{BookInstance, BookInstanceDetails, BookInstanceInput, InstanceFilter, InstanceOrder, LoanStatus},
        genre::{Genre, GenreInput},
        language::{Language, LanguageInput},
        pagination::Pagination,
        user::{Capability, UserClaims},
    },
    repository::{AuthorFilter, BookFilter, Repository},
};

/// Counts shown on the catalog home page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CatalogSummary {
    pub num_books: i64,
    pub num_instances: i64,
    pub num_instances_available: i64,
    pub num_authors: i64,
    pub num_genres: i64,
    /// Books whose title contains the requested text, when one was given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_books_matching: Option<i64>,
}

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
    gate: Arc<dyn AccessGate>,
}

impl CatalogService {
    pub fn new(repository: Repository, gate: Arc<dyn AccessGate>) -> Self {
        Self { repository, gate }
    }

    fn require_editor(&self, principal: &UserClaims) -> AppResult<()> {
        require(self.gate.as_ref(), principal, Capability::EditCatalog)
    }

    /// Borrower details stay visible to loan viewers and to the borrower
    fn present(&self, viewer: Option<&UserClaims>, mut details: BookInstanceDetails, today: NaiveDate) -> BookInstanceDetails {
        details.is_overdue = is_overdue(details.status, details.due_back, today);

        let visible = match (viewer, details.borrower.as_ref()) {
            (_, None) => true,
            (Some(viewer), Some(borrower)) => {
                borrower.id == viewer.user_id || self.gate.has_capability(viewer, Capability::ViewAllLoans)
            }
            (None, Some(_)) => false,
        };

        if visible {
            details
        } else {
            details.redact_borrower()
        }
    }

    // =========================================================================
    // SUMMARY
    // =========================================================================

    pub async fn summary(&self, title_contains: Option<&str>) -> AppResult<CatalogSummary> {
        let available = InstanceFilter {
            status: Some(LoanStatus::Available),
            ..InstanceFilter::default()
        };

        let num_books_matching = match title_contains.map(str::trim).filter(|t| !t.is_empty()) {
            Some(title) => Some(
                self.repository
                    .books
                    .count(&BookFilter {
                        title_contains: Some(title.to_string()),
                        ..BookFilter::default()
                    })
                    .await?,
            ),
            None => None,
        };

        Ok(CatalogSummary {
            num_books: self.repository.books.count(&BookFilter::default()).await?,
            num_instances: self.repository.instances.count(&InstanceFilter::default()).await?,
            num_instances_available: self.repository.instances.count(&available).await?,
            num_authors: self.repository.authors.count(&AuthorFilter::default()).await?,
            num_genres: self.repository.genres.count().await?,
            num_books_matching,
        })
    }

    // =========================================================================
    // AUTHORS
    // =========================================================================

    pub async fn list_authors(&self, filter: &AuthorFilter, page: Pagination) -> AppResult<(Vec<Author>, i64)> {
        self.repository.authors.list(filter, page).await
    }

    /// Author with every book they wrote
    pub async fn get_author(&self, id: i32) -> AppResult<AuthorDetail> {
        let author = self.repository.authors.get(id).await?;
        let filter = BookFilter {
            author_id: Some(id),
            ..BookFilter::default()
        };
        let (books, _) = self.repository.books.list(&filter, Pagination::unbounded()).await?;
        Ok(AuthorDetail { author, books })
    }

    pub async fn create_author(&self, principal: &UserClaims, input: AuthorInput) -> AppResult<Author> {
        self.require_editor(principal)?;
        input.validate()?;

        let author = self.repository.authors.create(&input).await?;
        tracing::info!("User {} created author {} ({})", principal.user_id, author.id, author.display_name());
        Ok(author)
    }

    pub async fn update_author(&self, principal: &UserClaims, id: i32, input: AuthorInput) -> AppResult<Author> {
        self.require_editor(principal)?;
        input.validate()?;
        self.repository.authors.update(id, &input).await
    }

    pub async fn delete_author(&self, principal: &UserClaims, id: i32) -> AppResult<()> {
        self.require_editor(principal)?;
        self.repository.authors.delete(id).await?;
        tracing::info!("User {} deleted author {}", principal.user_id, id);
        Ok(())
    }

    // =========================================================================
    // BOOKS
    // =========================================================================

    pub async fn list_books(&self, filter: &BookFilter, page: Pagination) -> AppResult<(Vec<BookSummary>, i64)> {
        self.repository.books.list(filter, page).await
    }

    /// Book with its author and copies
    pub async fn get_book(&self, viewer: Option<&UserClaims>, id: i32, today: NaiveDate) -> AppResult<BookDetail> {
        let book = self.repository.books.get(id).await?;
        let author = self.repository.authors.get(book.author_id).await?;

        let filter = InstanceFilter {
            book_id: Some(id),
            ..InstanceFilter::default()
        };
        let (instances, _) = self
            .repository
            .instances
            .list(&filter, InstanceOrder::DueBack, Pagination::unbounded())
            .await?;
        let instances = instances
            .into_iter()
            .map(|i| self.present(viewer, i, today))
            .collect();

        Ok(BookDetail { book, author, instances })
    }

    /// Referenced author and genres must exist
    async fn check_book_refs(&self, input: &BookInput) -> AppResult<()> {
        self.repository.authors.get(input.author_id).await?;
        for genre_id in &input.genre_ids {
            self.repository.genres.get(*genre_id).await?;
        }
        Ok(())
    }

    pub async fn create_book(&self, principal: &UserClaims, input: BookInput) -> AppResult<Book> {
        self.require_editor(principal)?;
        input.validate()?;
        self.check_book_refs(&input).await?;

        let book = self.repository.books.create(&input).await?;
        tracing::info!("User {} created book {} ({})", principal.user_id, book.id, book.title);
        Ok(book)
    }

    pub async fn update_book(&self, principal: &UserClaims, id: i32, input: BookInput) -> AppResult<Book> {
        self.require_editor(principal)?;
        input.validate()?;
        self.check_book_refs(&input).await?;
        self.repository.books.update(id, &input).await
    }

    /// With `force`, copies not on loan are deleted along with the book
    pub async fn delete_book(&self, principal: &UserClaims, id: i32, force: bool) -> AppResult<()> {
        self.require_editor(principal)?;
        self.repository.books.delete(id, force).await?;
        tracing::info!("User {} deleted book {} (force={})", principal.user_id, id, force);
        Ok(())
    }

    // =========================================================================
    // GENRES & LANGUAGES
    // =========================================================================

    pub async fn list_genres(&self) -> AppResult<Vec<Genre>> {
        self.repository.genres.list().await
    }

    pub async fn get_genre(&self, id: i32) -> AppResult<Genre> {
        self.repository.genres.get(id).await
    }

    pub async fn create_genre(&self, principal: &UserClaims, input: GenreInput) -> AppResult<Genre> {
        self.require_editor(principal)?;
        input.validate()?;
        self.repository.genres.create(&input).await
    }

    pub async fn delete_genre(&self, principal: &UserClaims, id: i32) -> AppResult<()> {
        self.require_editor(principal)?;
        self.repository.genres.delete(id).await
    }

    pub async fn list_languages(&self) -> AppResult<Vec<Language>> {
        self.repository.languages.list().await
    }

    pub async fn create_language(&self, principal: &UserClaims, input: LanguageInput) -> AppResult<Language> {
        self.require_editor(principal)?;
        input.validate()?;
        self.repository.languages.create(&input).await
    }

    pub async fn delete_language(&self, principal: &UserClaims, id: i32) -> AppResult<()> {
        self.require_editor(principal)?;
        self.repository.languages.delete(id).await
    }

    // =========================================================================
    // BOOK INSTANCES
    // =========================================================================

    pub async fn list_instances(
        &self,
        viewer: Option<&UserClaims>,
        filter: &InstanceFilter,
        page: Pagination,
        today: NaiveDate,
    ) -> AppResult<(Vec<BookInstanceDetails>, i64)> {
        if let Some(borrower_id) = filter.borrower_id {
            match viewer {
                Some(viewer) if viewer.user_id == borrower_id => {}
                Some(viewer) => require(self.gate.as_ref(), viewer, Capability::ViewAllLoans)?,
                None => {
                    return Err(AppError::Authentication(
                        "Filtering by borrower requires authentication".to_string(),
                    ))
                }
            }
        }

        let (instances, total) = self
            .repository
            .instances
            .list(filter, InstanceOrder::DueBack, page)
            .await?;
        let instances = instances
            .into_iter()
            .map(|i| self.present(viewer, i, today))
            .collect();
        Ok((instances, total))
    }

    pub async fn get_instance(&self, viewer: Option<&UserClaims>, id: Uuid, today: NaiveDate) -> AppResult<BookInstanceDetails> {
        let details = self.repository.instances.get_details(id).await?;
        Ok(self.present(viewer, details, today))
    }

    /// Referenced book, language and borrower must exist
    async fn check_instance_refs(&self, input: &BookInstanceInput) -> AppResult<()> {
        self.repository.books.get(input.book_id).await?;
        if let Some(language_id) = input.language_id {
            self.repository.languages.get(language_id).await?;
        }
        if let Some(borrower_id) = input.borrower_id {
            self.repository.borrowers.get(borrower_id).await?;
        }
        Ok(())
    }

    pub async fn create_instance(&self, principal: &UserClaims, input: BookInstanceInput) -> AppResult<BookInstance> {
        self.require_editor(principal)?;
        input.validate()?;
        self.check_instance_refs(&input).await?;

        let instance = self.repository.instances.create(&input).await?;
        tracing::info!(
            "User {} added copy {} of book {}",
            principal.user_id,
            instance.id,
            instance.book_id
        );
        Ok(instance)
    }

    pub async fn update_instance(&self, principal: &UserClaims, id: Uuid, input: BookInstanceInput) -> AppResult<BookInstance> {
        self.require_editor(principal)?;
        input.validate()?;
        self.check_instance_refs(&input).await?;
        self.repository.instances.update(id, &input).await
    }

    /// Copies on loan cannot be deleted
    pub async fn delete_instance(&self, principal: &UserClaims, id: Uuid) -> AppResult<()> {
        self.require_editor(principal)?;
        self.repository.instances.delete(id).await?;
        tracing::info!("User {} deleted copy {}", principal.user_id, id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::user::Borrower, services::access::ClaimsGate};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
    }

    fn editor() -> UserClaims {
        UserClaims::new(1, "cataloguer", [Capability::EditCatalog], 1)
    }

    fn librarian() -> UserClaims {
        UserClaims::new(2, "librarian", [Capability::ViewAllLoans, Capability::MarkReturned], 1)
    }

    fn service() -> CatalogService {
        CatalogService::new(Repository::in_memory(), Arc::new(ClaimsGate))
    }

    fn author_input(first: &str, last: &str) -> AuthorInput {
        AuthorInput {
            first_name: first.into(),
            last_name: last.into(),
            date_of_birth: None,
            date_of_death: None,
        }
    }

    fn book_input(title: &str, author_id: i32, genre_ids: Vec<i32>) -> BookInput {
        BookInput {
            title: title.into(),
            author_id,
            summary: String::new(),
            isbn: "9780441013593".into(),
            genre_ids,
        }
    }

    fn copy_input(book_id: i32, status: LoanStatus, borrower: Option<&Borrower>) -> BookInstanceInput {
        BookInstanceInput {
            book_id,
            imprint: "Ace, 1965".into(),
            due_back: borrower.map(|_| today()),
            status,
            borrower_id: borrower.map(|b| b.id),
            language_id: None,
        }
    }

    #[tokio::test]
    async fn summary_counts_the_catalog() {
        let catalog = service();
        let author = catalog.create_author(&editor(), author_input("Frank", "Herbert")).await.unwrap();
        let dune = catalog
            .create_book(&editor(), book_input("Dune", author.id, vec![]))
            .await
            .unwrap();
        catalog
            .create_book(&editor(), book_input("Dune Messiah", author.id, vec![]))
            .await
            .unwrap();
        catalog
            .create_book(&editor(), book_input("The Dosadi Experiment", author.id, vec![]))
            .await
            .unwrap();
        catalog
            .create_instance(&editor(), copy_input(dune.id, LoanStatus::Available, None))
            .await
            .unwrap();
        catalog
            .create_instance(&editor(), copy_input(dune.id, LoanStatus::Maintenance, None))
            .await
            .unwrap();
        catalog
            .create_genre(&editor(), GenreInput { name: "Science Fiction".into() })
            .await
            .unwrap();

        let summary = catalog.summary(Some("dune")).await.unwrap();
        assert_eq!(
            summary,
            CatalogSummary {
                num_books: 3,
                num_instances: 2,
                num_instances_available: 1,
                num_authors: 1,
                num_genres: 1,
                num_books_matching: Some(2),
            }
        );
        assert_eq!(catalog.summary(None).await.unwrap().num_books_matching, None);
    }

    #[tokio::test]
    async fn writes_need_edit_catalog() {
        let catalog = service();
        let result = catalog.create_author(&librarian(), author_input("Ursula", "Le Guin")).await;
        assert!(matches!(result, Err(AppError::Authorization(_))));
        assert_eq!(catalog.summary(None).await.unwrap().num_authors, 0);
    }

    #[tokio::test]
    async fn invalid_input_is_rejected_before_storage() {
        let catalog = service();
        let result = catalog.create_author(&editor(), author_input("", "Le Guin")).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn book_needs_existing_author_and_genres() {
        let catalog = service();
        let missing_author = catalog.create_book(&editor(), book_input("Dune", 42, vec![])).await;
        assert!(matches!(missing_author, Err(AppError::NotFound(_))));

        let author = catalog.create_author(&editor(), author_input("Frank", "Herbert")).await.unwrap();
        let missing_genre = catalog
            .create_book(&editor(), book_input("Dune", author.id, vec![999]))
            .await;
        assert!(matches!(missing_genre, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn author_detail_lists_their_books() {
        let catalog = service();
        let author = catalog.create_author(&editor(), author_input("Frank", "Herbert")).await.unwrap();
        let other = catalog.create_author(&editor(), author_input("Iain", "Banks")).await.unwrap();
        catalog
            .create_book(&editor(), book_input("Dune", author.id, vec![]))
            .await
            .unwrap();
        catalog
            .create_book(&editor(), book_input("Excession", other.id, vec![]))
            .await
            .unwrap();

        let detail = catalog.get_author(author.id).await.unwrap();
        assert_eq!(detail.books.len(), 1);
        assert_eq!(detail.books[0].title, "Dune");
        assert_eq!(detail.books[0].author_name, "Herbert, Frank");

        let refused = catalog.delete_author(&editor(), author.id).await;
        assert!(matches!(refused, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn borrower_is_hidden_from_other_patrons() {
        let repo = Repository::in_memory();
        let catalog = CatalogService::new(repo.clone(), Arc::new(ClaimsGate));
        let reader = repo.borrowers.create("reader", "Ada", "Okafor").await.unwrap();
        let author = catalog.create_author(&editor(), author_input("Frank", "Herbert")).await.unwrap();
        let book = catalog
            .create_book(&editor(), book_input("Dune", author.id, vec![]))
            .await
            .unwrap();
        let copy = catalog
            .create_instance(&editor(), copy_input(book.id, LoanStatus::OnLoan, Some(&reader)))
            .await
            .unwrap();

        let stranger = UserClaims::new(77, "stranger", [], 1);
        let owner = UserClaims::new(reader.id, "reader", [], 1);

        let seen = catalog.get_instance(Some(&stranger), copy.id, today()).await.unwrap();
        assert!(seen.borrower.is_none());
        assert!(catalog.get_instance(None, copy.id, today()).await.unwrap().borrower.is_none());
        assert!(catalog.get_instance(Some(&owner), copy.id, today()).await.unwrap().borrower.is_some());
        assert!(catalog.get_instance(Some(&librarian()), copy.id, today()).await.unwrap().borrower.is_some());

        let detail = catalog.get_book(Some(&stranger), book.id, today()).await.unwrap();
        assert_eq!(detail.instances.len(), 1);
        assert!(detail.instances[0].borrower.is_none());
    }

    #[tokio::test]
    async fn borrower_filter_needs_view_all_loans() {
        let repo = Repository::in_memory();
        let catalog = CatalogService::new(repo.clone(), Arc::new(ClaimsGate));
        let reader = repo.borrowers.create("reader", "Ada", "Okafor").await.unwrap();
        let filter = InstanceFilter {
            borrower_id: Some(reader.id),
            ..InstanceFilter::default()
        };

        let stranger = UserClaims::new(77, "stranger", [], 1);
        let refused = catalog
            .list_instances(Some(&stranger), &filter, Pagination::default(), today())
            .await;
        assert!(matches!(refused, Err(AppError::Authorization(_))));

        let owner = UserClaims::new(reader.id, "reader", [], 1);
        assert!(catalog
            .list_instances(Some(&owner), &filter, Pagination::default(), today())
            .await
            .is_ok());
        assert!(catalog
            .list_instances(Some(&librarian()), &filter, Pagination::default(), today())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn instance_needs_existing_borrower() {
        let catalog = service();
        let author = catalog.create_author(&editor(), author_input("Frank", "Herbert")).await.unwrap();
        let book = catalog
            .create_book(&editor(), book_input("Dune", author.id, vec![]))
            .await
            .unwrap();
        let ghost = Borrower {
            id: 404,
            login: "ghost".into(),
            first_name: "No".into(),
            last_name: "One".into(),
        };

        let result = catalog
            .create_instance(&editor(), copy_input(book.id, LoanStatus::OnLoan, Some(&ghost)))
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
