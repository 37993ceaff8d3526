use axum::{
    extract::{FromRef, State},
    routing::post,
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{LoginForm, TokenResponse},
        jwt::JwtKeys,
    },
    error::AppResult,
    extract::{AppForm, AppJson},
    state::AppState,
    users::{
        dto::{PublicUser, UserCreate},
        services as directory,
    },
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<UserCreate>,
) -> AppResult<Json<PublicUser>> {
    let user = directory::create(state.store.as_ref(), payload).await?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, form))]
pub async fn login(
    State(state): State<AppState>,
    AppForm(form): AppForm<LoginForm>,
) -> AppResult<Json<TokenResponse>> {
    let user = directory::authenticate(state.store.as_ref(), &form.username, &form.password).await?;

    let keys = JwtKeys::from_ref(&state);
    let access_token = keys.issue_access(&user.email)?;

    Ok(Json(TokenResponse::bearer(
        access_token,
        keys.access_ttl.whole_seconds(),
    )))
}
