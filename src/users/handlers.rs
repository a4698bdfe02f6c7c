use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    response::IntoResponse,
    routing::{get, patch},
    Router,
};
use tracing::instrument;

use super::{dto::UpdateAccountRequest, services};
use crate::{
    auth::extractors::AuthUser,
    error::ApiResult,
    extract::{ApiJson, ApiPath, MultipartForm},
    media::services::MediaKind,
    response::ApiResponse,
    state::AppState,
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/users/current-user", get(current_user))
        .route("/users/c/:username", get(channel_profile))
        .route("/users/watch-history", get(watch_history))
}

pub fn write_routes(state: &AppState) -> Router<AppState> {
    let upload_limit = state.config.upload_limit_mb * 1024 * 1024;
    Router::new()
        .route("/users/update-account", patch(update_account))
        .route(
            "/users/update-avatar",
            patch(update_avatar).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/users/update-cover-img",
            patch(update_cover_img).layer(DefaultBodyLimit::max(upload_limit)),
        )
}

pub async fn current_user(AuthUser(user): AuthUser) -> ApiResult<impl IntoResponse> {
    Ok(ApiResponse::ok(user, "Current user fetched successfully"))
}

#[instrument(skip(state, user, payload))]
pub async fn update_account(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(payload): ApiJson<UpdateAccountRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = services::update_account(&state, user.id, payload).await?;
    Ok(ApiResponse::ok(user, "Account details updated successfully"))
}

#[instrument(skip(state, user, mp))]
pub async fn update_avatar(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    mp: Multipart,
) -> ApiResult<impl IntoResponse> {
    let mut form = MultipartForm::read(mp).await?;
    let user =
        services::replace_image(&state, user.id, MediaKind::Avatar, form.take_file("avatar"))
            .await?;
    Ok(ApiResponse::ok(user, "Avatar updated successfully"))
}

#[instrument(skip(state, user, mp))]
pub async fn update_cover_img(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    mp: Multipart,
) -> ApiResult<impl IntoResponse> {
    let mut form = MultipartForm::read(mp).await?;
    let user = services::replace_image(
        &state,
        user.id,
        MediaKind::CoverImage,
        form.take_file("coverImg"),
    )
    .await?;
    Ok(ApiResponse::ok(user, "Cover image updated successfully"))
}

#[instrument(skip(state, viewer))]
pub async fn channel_profile(
    State(state): State<AppState>,
    AuthUser(viewer): AuthUser,
    ApiPath(username): ApiPath<String>,
) -> ApiResult<impl IntoResponse> {
    let profile = services::channel_profile(&state, &username, Some(viewer.id)).await?;
    Ok(ApiResponse::ok(profile, "User channel fetched successfully"))
}

#[instrument(skip(state, user))]
pub async fn watch_history(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<impl IntoResponse> {
    let history = services::watch_history(&state, user.id).await?;
    Ok(ApiResponse::ok(history, "Watch history fetched successfully"))
}
