//! Request body extraction.

use crate::error::ApiError;
use axum::extract::{FromRequest, Request};
use axum::{Json, async_trait};
use serde::de::DeserializeOwned;

/// JSON request body whose rejections use the API error shape.
///
/// Drop-in for [`axum::Json`] on the request side. Responses keep using
/// `Json` directly.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}
