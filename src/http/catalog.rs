//! Public catalog and submission intake.

use super::extract::ApiJson;
use super::{AppState, rfc3339};
use crate::db::{NewSubmission, Product};
use crate::error::{ApiError, ApiResult};
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

/// A live listing as shown to the public. The seller's email is never exposed.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProduct {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub price_cents: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub sale_status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sold_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listed_at: Option<String>,
}

impl From<Product> for PublicProduct {
    fn from(p: Product) -> Self {
        Self {
            id: p.id,
            title: p.title,
            description: p.description,
            price_cents: p.price_cents,
            location: p.location,
            sale_status: p.sale_status.as_str(),
            sold_at: p.sold_at.and_then(rfc3339),
            listed_at: p.approved_at.and_then(rfc3339),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    limit: Option<i64>,
    offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SubmissionBody {
    title: String,
    #[serde(default)]
    description: String,
    price_cents: i64,
    location: Option<String>,
    submitter_email: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionCreated {
    id: i64,
    status: &'static str,
}

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// GET /products
pub async fn list_products(
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
) -> ApiResult<Json<Vec<PublicProduct>>> {
    let limit = page.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let offset = page.offset.unwrap_or(0).max(0);

    let products = state.db.products().list_live(limit, offset).await?;
    Ok(Json(products.into_iter().map(PublicProduct::from).collect()))
}

/// GET /products/:id
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<PublicProduct>> {
    let product = state
        .db
        .products()
        .find_live(id)
        .await?
        .ok_or(ApiError::NotFound("listing"))?;
    Ok(Json(product.into()))
}

/// POST /submissions
pub async fn submit(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<SubmissionBody>,
) -> ApiResult<(StatusCode, Json<SubmissionCreated>)> {
    let product = state
        .moderation
        .submit(NewSubmission {
            title: body.title,
            description: body.description,
            price_cents: body.price_cents,
            location: body.location,
            submitter_email: body.submitter_email,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SubmissionCreated {
            id: product.id,
            status: product.status.as_str(),
        }),
    ))
}
