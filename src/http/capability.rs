//! Endpoints behind the links mailed to sellers.
//!
//! The token is the only authority. A `resourceId` sent alongside it is
//! accepted for compatibility with older clients and otherwise ignored.

use super::extract::ApiJson;
use super::{AppState, rfc3339};
use crate::error::ApiResult;
use crate::moderation::TokenInspection;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SaleConfirmationBody {
    token: String,
    comment: Option<String>,
    /// Ignored; the token decides which listing is affected.
    resource_id: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleConfirmationResponse {
    resource_id: i64,
    sold_at: Option<String>,
    already_verified: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TokenDeletionBody {
    token: String,
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LegacyDeletionBody {
    resource_id: i64,
    submitter_email: String,
    reason: Option<String>,
}

/// Either a capability link or, where still enabled, id plus email.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum DeletionRequestBody {
    Token(TokenDeletionBody),
    Legacy(LegacyDeletionBody),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletionRequestResponse {
    request_id: i64,
    resource_id: i64,
    already_requested: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Valid,
    Invalid,
    NotFound,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenValidationResponse {
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    resource_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    resource_title: Option<String>,
    status: ValidationStatus,
}

/// POST /sale-confirmations
pub async fn confirm_sale(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<SaleConfirmationBody>,
) -> ApiResult<Json<SaleConfirmationResponse>> {
    let outcome = state
        .moderation
        .confirm_sale(&body.token, body.comment.as_deref())
        .await?;

    if let Some(claimed) = body.resource_id
        && claimed != outcome.product_id
    {
        debug!(
            claimed,
            product_id = outcome.product_id,
            "Ignoring resourceId that disagrees with the token"
        );
    }

    Ok(Json(SaleConfirmationResponse {
        resource_id: outcome.product_id,
        sold_at: rfc3339(outcome.sold_at),
        already_verified: outcome.already_verified,
    }))
}

/// POST /deletion-requests
pub async fn request_deletion(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<DeletionRequestBody>,
) -> ApiResult<(StatusCode, Json<DeletionRequestResponse>)> {
    let outcome = match body {
        DeletionRequestBody::Token(body) => {
            state
                .moderation
                .request_deletion(&body.token, body.reason.as_deref())
                .await?
        }
        DeletionRequestBody::Legacy(body) => {
            state
                .moderation
                .request_deletion_legacy(
                    body.resource_id,
                    &body.submitter_email,
                    body.reason.as_deref(),
                )
                .await?
        }
    };

    Ok((
        StatusCode::ACCEPTED,
        Json(DeletionRequestResponse {
            request_id: outcome.request_id,
            resource_id: outcome.product_id,
            already_requested: outcome.already_requested,
        }),
    ))
}

/// GET /token-validation/:token
///
/// Always answers 200; the body says whether the link still works.
pub async fn validate_token(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> ApiResult<Json<TokenValidationResponse>> {
    let response = match state.moderation.inspect(&token).await? {
        TokenInspection::Valid { product_id, title } => TokenValidationResponse {
            valid: true,
            resource_id: Some(product_id),
            resource_title: Some(title),
            status: ValidationStatus::Valid,
        },
        TokenInspection::NotFound => TokenValidationResponse {
            valid: false,
            resource_id: None,
            resource_title: None,
            status: ValidationStatus::NotFound,
        },
        TokenInspection::Invalid => TokenValidationResponse {
            valid: false,
            resource_id: None,
            resource_title: None,
            status: ValidationStatus::Invalid,
        },
    };
    Ok(Json(response))
}
