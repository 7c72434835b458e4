//! Catalog home page endpoint

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{error::AppResult, services::catalog::CatalogSummary};

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct SummaryQuery {
    /// Also count books whose title contains this text
    pub title_contains: Option<String>,
}

/// Record counts for the catalog home page
#[utoipa::path(
    get,
    path = "/catalog/summary",
    tag = "catalog",
    params(SummaryQuery),
    responses(
        (status = 200, description = "Catalog counts", body = CatalogSummary)
    )
)]
pub async fn summary(
    State(state): State<crate::AppState>,
    Query(query): Query<SummaryQuery>,
) -> AppResult<Json<CatalogSummary>> {
    let summary = state
        .services
        .catalog
        .summary(query.title_contains.as_deref())
        .await?;
    Ok(Json(summary))
}
