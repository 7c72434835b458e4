//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{authors, book_instances, books, catalog, genres, health, loans};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Catalog API",
        version = "1.0.0",
        description = "Library catalog and loans REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Catalog
        catalog::summary,
        // Authors
        authors::list_authors,
        authors::get_author,
        authors::create_author,
        authors::update_author,
        authors::delete_author,
        // Books
        books::list_books,
        books::get_book,
        books::create_book,
        books::update_book,
        books::delete_book,
        // Genres & languages
        genres::list_genres,
        genres::get_genre,
        genres::create_genre,
        genres::delete_genre,
        genres::list_languages,
        genres::create_language,
        genres::delete_language,
        // Copies
        book_instances::list_instances,
        book_instances::get_instance,
        book_instances::create_instance,
        book_instances::update_instance,
        book_instances::delete_instance,
        // Loans
        loans::list_loans,
        loans::list_overdue,
        loans::renewal_form,
        loans::renew,
        loans::lend,
        loans::mark_returned,
    ),
    components(
        schemas(
            // Catalog
            crate::services::catalog::CatalogSummary,
            crate::models::author::Author,
            crate::models::author::AuthorDetail,
            crate::models::author::AuthorInput,
            crate::models::book::Book,
            crate::models::book::BookSummary,
            crate::models::book::BookDetail,
            crate::models::book::BookInput,
            crate::models::genre::Genre,
            crate::models::genre::GenreInput,
            crate::models::language::Language,
            crate::models::language::LanguageInput,
            // Copies
            crate::models::book_instance::BookInstance,
            crate::models::book_instance::BookInstanceDetails,
            crate::models::book_instance::BookInstanceInput,
            crate::models::book_instance::LoanStatus,
            crate::models::user::Borrower,
            // Loans
            crate::models::book_instance::LoanScope,
            crate::models::book_instance::RenewalForm,
            loans::RenewRequest,
            loans::BorrowRequest,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "catalog", description = "Catalog overview"),
        (name = "authors", description = "Author management"),
        (name = "books", description = "Book management"),
        (name = "genres", description = "Genres and languages"),
        (name = "book-instances", description = "Physical copies"),
        (name = "loans", description = "Lending, returns and renewals")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
