//! Body and path extractors whose rejections render as [`AppError`].
//!
//! Messages are fixed: serde's own error text can quote submitted values,
//! which may include a password.

use axum::{
    async_trait,
    extract::{
        rejection::{FormRejection, JsonRejection, PathRejection},
        FromRequest, FromRequestParts, Path, Request,
    },
    http::request::Parts,
    Form, Json,
};

use crate::error::AppError;

pub struct AppJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for AppJson<T>
where
    S: Send + Sync,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|_| AppError::invalid_input("Invalid JSON body"))?;
        Ok(AppJson(value))
    }
}

pub struct AppForm<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for AppForm<T>
where
    S: Send + Sync,
    Form<T>: FromRequest<S, Rejection = FormRejection>,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Form(value) = Form::<T>::from_request(req, state)
            .await
            .map_err(|_| AppError::invalid_input("Invalid form body"))?;
        Ok(AppForm(value))
    }
}

pub struct AppPath<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for AppPath<T>
where
    S: Send + Sync,
    Path<T>: FromRequestParts<S, Rejection = PathRejection>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::invalid_input("Invalid path parameter"))?;
        Ok(AppPath(value))
    }
}
