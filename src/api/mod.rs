//! API routes and handlers.

pub mod admin;
pub mod middleware;
pub mod recipes;

use crate::{context::AppContext, error::AppError};
use axum::{
    extract::{FromRequest, Request},
    Json, Router,
};

/// Build API routes
pub fn routes() -> Router<AppContext> {
    Router::new().merge(recipes::routes()).merge(admin::routes())
}

/// `axum::Json` with rejections mapped into the 400 error taxonomy, so a
/// malformed body produces the same JSON error shape as every other client
/// input error.
pub struct AppJson<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for AppJson<T>
where
    T: serde::de::DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::Validation(rejection.body_text()))?;
        Ok(AppJson(value))
    }
}
