//! Book instance (copy) endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        book_instance::{BookInstance, BookInstanceDetails, BookInstanceInput, BookInstanceQuery},
        pagination::{PaginatedResponse, Pagination},
    },
};

use super::AuthenticatedUser;

/// List copies ordered by due date
///
/// Borrowers are shown only to `view-all-loans` holders and to the
/// borrower themself.
#[utoipa::path(
    get,
    path = "/book-instances",
    tag = "book-instances",
    params(BookInstanceQuery),
    responses(
        (status = 200, description = "Page of copies", body = PaginatedResponse<BookInstanceDetails>),
        (status = 403, description = "Borrower filter needs view-all-loans")
    )
)]
pub async fn list_instances(
    State(state): State<crate::AppState>,
    viewer: Option<AuthenticatedUser>,
    Query(query): Query<BookInstanceQuery>,
) -> AppResult<Json<PaginatedResponse<BookInstanceDetails>>> {
    let viewer = viewer.map(|AuthenticatedUser(claims)| claims);
    let page = Pagination::new(query.page, query.per_page);

    let (instances, total) = state
        .services
        .catalog
        .list_instances(viewer.as_ref(), &query.filter(), page, state.clock.today())
        .await?;
    Ok(Json(PaginatedResponse::new(instances, total, page)))
}

#[utoipa::path(
    get,
    path = "/book-instances/{id}",
    tag = "book-instances",
    params(
        ("id" = Uuid, Path, description = "Copy ID")
    ),
    responses(
        (status = 200, description = "Copy details", body = BookInstanceDetails),
        (status = 404, description = "Copy not found")
    )
)]
pub async fn get_instance(
    State(state): State<crate::AppState>,
    viewer: Option<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<BookInstanceDetails>> {
    let viewer = viewer.map(|AuthenticatedUser(claims)| claims);
    let instance = state
        .services
        .catalog
        .get_instance(viewer.as_ref(), id, state.clock.today())
        .await?;
    Ok(Json(instance))
}

/// Add a copy of a book
#[utoipa::path(
    post,
    path = "/book-instances",
    tag = "book-instances",
    security(("bearer_auth" = [])),
    request_body = BookInstanceInput,
    responses(
        (status = 201, description = "Copy created", body = BookInstance),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "edit-catalog required"),
        (status = 404, description = "Book, language or borrower not found")
    )
)]
pub async fn create_instance(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(input): Json<BookInstanceInput>,
) -> AppResult<(StatusCode, Json<BookInstance>)> {
    let instance = state.services.catalog.create_instance(&claims, input).await?;
    Ok((StatusCode::CREATED, Json(instance)))
}

#[utoipa::path(
    put,
    path = "/book-instances/{id}",
    tag = "book-instances",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Copy ID")
    ),
    request_body = BookInstanceInput,
    responses(
        (status = 200, description = "Copy updated", body = BookInstance),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "edit-catalog required"),
        (status = 404, description = "Copy, book, language or borrower not found")
    )
)]
pub async fn update_instance(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(input): Json<BookInstanceInput>,
) -> AppResult<Json<BookInstance>> {
    let instance = state.services.catalog.update_instance(&claims, id, input).await?;
    Ok(Json(instance))
}

#[utoipa::path(
    delete,
    path = "/book-instances/{id}",
    tag = "book-instances",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Copy ID")
    ),
    responses(
        (status = 204, description = "Copy deleted"),
        (status = 403, description = "edit-catalog required"),
        (status = 404, description = "Copy not found"),
        (status = 409, description = "Copy is on loan")
    )
)]
pub async fn delete_instance(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.services.catalog.delete_instance(&claims, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
