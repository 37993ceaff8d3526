use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{PublicUser, UserUpdate},
    services as directory,
};
use crate::{
    auth::{extractors::CurrentUser, gate::ensure_self},
    error::AppResult,
    extract::{AppJson, AppPath},
    state::AppState,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(read_me))
        .route(
            "/:user_id",
            get(read_user).put(update_user).delete(delete_user),
        )
}

#[instrument(skip_all)]
pub async fn read_me(CurrentUser(current): CurrentUser) -> Json<PublicUser> {
    Json(current.into())
}

// CurrentUser precedes AppPath so callers are authenticated before the id is looked at.
#[instrument(skip(state, current))]
pub async fn read_user(
    CurrentUser(current): CurrentUser,
    State(state): State<AppState>,
    AppPath(user_id): AppPath<i64>,
) -> AppResult<Json<PublicUser>> {
    ensure_self(&current, user_id)?;
    let user = directory::get(state.store.as_ref(), user_id).await?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, current, payload))]
pub async fn update_user(
    CurrentUser(current): CurrentUser,
    State(state): State<AppState>,
    AppPath(user_id): AppPath<i64>,
    AppJson(payload): AppJson<UserUpdate>,
) -> AppResult<Json<PublicUser>> {
    ensure_self(&current, user_id)?;
    let user = directory::update(state.store.as_ref(), user_id, payload).await?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, current))]
pub async fn delete_user(
    CurrentUser(current): CurrentUser,
    State(state): State<AppState>,
    AppPath(user_id): AppPath<i64>,
) -> AppResult<StatusCode> {
    ensure_self(&current, user_id)?;
    directory::delete(state.store.as_ref(), user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
