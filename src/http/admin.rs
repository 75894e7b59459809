//! Moderator endpoints.
//!
//! `POST /admin/session` trades the configured password for a signed,
//! expiring bearer token. Every other route here takes an [`AdminSession`],
//! which refuses the request unless that token checks out.

use super::extract::ApiJson;
use super::{AppState, rfc3339};
use crate::db::{DeletionRequest, Product, ProductStatus};
use crate::error::{ApiError, ApiResult};
use axum::extract::{FromRequestParts, Path, State};
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::{Json, async_trait};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Proof that the request carries a valid moderator session.
pub struct AdminSession;

#[async_trait]
impl FromRequestParts<AppState> for AdminSession {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .ok_or(ApiError::Unauthorized)?;

        if state.sessions.verify(token) {
            Ok(AdminSession)
        } else {
            Err(ApiError::Unauthorized)
        }
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginBody {
    password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    token: String,
    expires_at: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RejectBody {
    reason: Option<String>,
}

/// Full listing record for moderators.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminProduct {
    id: i64,
    title: String,
    description: String,
    price_cents: i64,
    location: Option<String>,
    submitter_email: String,
    status: &'static str,
    sale_status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sale_comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sold_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rejection_reason: Option<String>,
    created_at: Option<String>,
    approved_at: Option<String>,
}

impl From<Product> for AdminProduct {
    fn from(p: Product) -> Self {
        Self {
            id: p.id,
            title: p.title,
            description: p.description,
            price_cents: p.price_cents,
            location: p.location,
            submitter_email: p.submitter_email,
            status: p.status.as_str(),
            sale_status: p.sale_status.as_str(),
            sale_comment: p.sale_comment,
            sold_at: p.sold_at.and_then(rfc3339),
            rejection_reason: p.rejection_reason,
            created_at: rfc3339(p.created_at),
            approved_at: p.approved_at.and_then(rfc3339),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminDeletionRequest {
    id: i64,
    product_id: i64,
    product_title: String,
    submitter_email: String,
    reason: Option<String>,
    origin: &'static str,
    status: &'static str,
    created_at: Option<String>,
    resolved_at: Option<String>,
}

impl From<DeletionRequest> for AdminDeletionRequest {
    fn from(r: DeletionRequest) -> Self {
        Self {
            id: r.id,
            product_id: r.product_id,
            product_title: r.product_title,
            submitter_email: r.submitter_email,
            reason: r.reason,
            origin: r.origin.as_str(),
            status: r.status.as_str(),
            created_at: rfc3339(r.created_at),
            resolved_at: r.resolved_at.and_then(rfc3339),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalResponse {
    product_id: i64,
    title: String,
    approved_at: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectionResponse {
    product_id: i64,
    status: &'static str,
}

/// POST /admin/session
pub async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginBody>,
) -> ApiResult<Json<SessionResponse>> {
    let stored = state.admin_password.clone();
    // Hash verification blocks for tens of milliseconds
    let valid = tokio::task::spawn_blocking(move || {
        crate::security::password::verify(&body.password, &stored)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("password check panicked: {e}")))?;

    if !valid {
        warn!("Failed moderator login");
        return Err(ApiError::Unauthorized);
    }

    let session = state.sessions.issue();
    info!("Moderator session issued");
    Ok(Json(SessionResponse {
        token: session.token,
        expires_at: chrono::DateTime::from_timestamp_millis(session.expires_at_millis)
            .map(|t| t.to_rfc3339()),
    }))
}

/// GET /admin/submissions
pub async fn list_submissions(
    _admin: AdminSession,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<AdminProduct>>> {
    let products = state
        .db
        .products()
        .list_by_status(ProductStatus::Submitted)
        .await?;
    Ok(Json(products.into_iter().map(AdminProduct::from).collect()))
}

/// GET /admin/products/:id
///
/// Any status, with the seller's contact and moderation history.
pub async fn get_product(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<AdminProduct>> {
    let product = state
        .db
        .products()
        .find(id)
        .await?
        .ok_or(ApiError::NotFound("listing"))?;
    Ok(Json(product.into()))
}

/// POST /admin/products/:id/approve
pub async fn approve_product(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<ApprovalResponse>> {
    let approved = state.moderation.approve_submission(id).await?;
    Ok(Json(ApprovalResponse {
        product_id: approved.product_id,
        title: approved.title,
        approved_at: rfc3339(approved.approved_at),
    }))
}

/// POST /admin/products/:id/reject
pub async fn reject_product(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ApiJson(body): ApiJson<RejectBody>,
) -> ApiResult<Json<RejectionResponse>> {
    state
        .moderation
        .reject_submission(id, body.reason.as_deref())
        .await?;
    Ok(Json(RejectionResponse {
        product_id: id,
        status: ProductStatus::Rejected.as_str(),
    }))
}

/// DELETE /admin/products/:id
pub async fn delete_product(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    state.moderation.delete_product(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /admin/deletion-requests
pub async fn list_deletion_requests(
    _admin: AdminSession,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<AdminDeletionRequest>>> {
    let requests = state.db.deletion_requests().list_pending().await?;
    Ok(Json(
        requests.into_iter().map(AdminDeletionRequest::from).collect(),
    ))
}

/// POST /admin/deletion-requests/:id/approve
pub async fn approve_deletion(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<AdminDeletionRequest>> {
    let request = state.moderation.approve_deletion(id).await?;
    Ok(Json(request.into()))
}

/// POST /admin/deletion-requests/:id/reject
pub async fn reject_deletion(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<AdminDeletionRequest>> {
    let request = state.moderation.reject_deletion(id).await?;
    Ok(Json(request.into()))
}
