//! Loan management endpoints

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    response::Redirect,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        book_instance::{BookInstanceDetails, LoanScope, RenewalForm},
        pagination::{PaginatedResponse, Pagination},
    },
};

use super::RequestContext;

/// Where a successful renewal sends the librarian
pub const RENEWAL_REDIRECT: &str = "/api/v1/loans?scope=all";

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct LoansQuery {
    /// `mine` (default) or `all`
    pub scope: Option<LoanScope>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct OverdueQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Renewal form submission
#[derive(Debug, Deserialize, ToSchema)]
pub struct RenewRequest {
    /// New due date, today up to four weeks ahead
    pub renewal_date: NaiveDate,
}

/// Lend request
#[derive(Debug, Deserialize, ToSchema)]
pub struct BorrowRequest {
    pub borrower_id: i32,
    /// Defaults to three weeks from today
    pub due_back: Option<NaiveDate>,
}

/// Copies on loan to the caller, or to everybody
#[utoipa::path(
    get,
    path = "/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(LoansQuery),
    responses(
        (status = 200, description = "Copies on loan", body = PaginatedResponse<BookInstanceDetails>),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "scope=all needs mark-returned")
    )
)]
pub async fn list_loans(
    State(state): State<crate::AppState>,
    ctx: RequestContext,
    Query(query): Query<LoansQuery>,
) -> AppResult<Json<PaginatedResponse<BookInstanceDetails>>> {
    let page = Pagination::new(query.page, query.per_page);

    let (loans, total) = state
        .services
        .loans
        .list_loans_for(&ctx.principal, query.scope.unwrap_or_default(), page, ctx.today)
        .await?;
    Ok(Json(PaginatedResponse::new(loans, total, page)))
}

/// Copies on loan past their due date
#[utoipa::path(
    get,
    path = "/loans/overdue",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(OverdueQuery),
    responses(
        (status = 200, description = "Overdue copies", body = PaginatedResponse<BookInstanceDetails>),
        (status = 403, description = "view-all-loans required")
    )
)]
pub async fn list_overdue(
    State(state): State<crate::AppState>,
    ctx: RequestContext,
    Query(query): Query<OverdueQuery>,
) -> AppResult<Json<PaginatedResponse<BookInstanceDetails>>> {
    let page = Pagination::new(query.page, query.per_page);

    let (loans, total) = state
        .services
        .loans
        .list_overdue(&ctx.principal, page, ctx.today)
        .await?;
    Ok(Json(PaginatedResponse::new(loans, total, page)))
}

/// Renewal form pre-filled with a date three weeks out
#[utoipa::path(
    get,
    path = "/book-instances/{id}/renew",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Copy ID")
    ),
    responses(
        (status = 200, description = "Renewal form", body = RenewalForm),
        (status = 403, description = "mark-returned required"),
        (status = 404, description = "Copy not found")
    )
)]
pub async fn renewal_form(
    State(state): State<crate::AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> AppResult<Json<RenewalForm>> {
    let form = state
        .services
        .loans
        .renewal_form(&ctx.principal, id, ctx.today)
        .await?;
    Ok(Json(form))
}

/// Renew a copy and go back to the list of all loans
#[utoipa::path(
    post,
    path = "/book-instances/{id}/renew",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Copy ID")
    ),
    request_body = RenewRequest,
    responses(
        (status = 303, description = "Renewed; see all loans"),
        (status = 400, description = "Renewal date malformed or outside the allowed window", body = crate::error::ErrorResponse),
        (status = 403, description = "mark-returned required"),
        (status = 404, description = "Copy not found")
    )
)]
pub async fn renew(
    State(state): State<crate::AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    payload: Result<Json<RenewRequest>, JsonRejection>,
) -> AppResult<Redirect> {
    // The date is the form's only field
    let Json(request) = payload.map_err(|rejection| AppError::InvalidField {
        field: "renewal_date",
        message: rejection.body_text(),
    })?;

    state
        .services
        .loans
        .renew(&ctx.principal, id, request.renewal_date, ctx.today)
        .await?;
    Ok(Redirect::to(RENEWAL_REDIRECT))
}

/// Lend an available copy
#[utoipa::path(
    post,
    path = "/book-instances/{id}/borrow",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Copy ID")
    ),
    request_body = BorrowRequest,
    responses(
        (status = 200, description = "Copy lent", body = BookInstanceDetails),
        (status = 400, description = "Due date outside the allowed window"),
        (status = 403, description = "mark-returned required"),
        (status = 404, description = "Copy or borrower not found"),
        (status = 422, description = "Copy not available")
    )
)]
pub async fn lend(
    State(state): State<crate::AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(request): Json<BorrowRequest>,
) -> AppResult<Json<BookInstanceDetails>> {
    let instance = state
        .services
        .loans
        .lend(&ctx.principal, id, request.borrower_id, request.due_back, ctx.today)
        .await?;
    Ok(Json(instance))
}

/// Mark a copy returned
#[utoipa::path(
    post,
    path = "/book-instances/{id}/return",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Copy ID")
    ),
    responses(
        (status = 200, description = "Copy available again", body = BookInstanceDetails),
        (status = 403, description = "mark-returned required"),
        (status = 404, description = "Copy not found"),
        (status = 422, description = "Copy not on loan")
    )
)]
pub async fn mark_returned(
    State(state): State<crate::AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> AppResult<Json<BookInstanceDetails>> {
    let instance = state
        .services
        .loans
        .mark_returned(&ctx.principal, id, ctx.today)
        .await?;
    Ok(Json(instance))
}
