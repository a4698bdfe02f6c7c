use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    response::IntoResponse,
    routing::{get, patch, post},
    Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{ListVideosQuery, PublishForm, UpdateVideoForm},
    services,
};
use crate::{
    auth::extractors::{AuthUser, OptionalAuthUser},
    error::ApiResult,
    extract::{ApiPath, ApiQuery, MultipartForm},
    response::ApiResponse,
    state::AppState,
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/videos", get(list_videos))
        .route("/videos/:video_id", get(get_video).delete(delete_video))
        .route("/videos/toggle/publish/:video_id", patch(toggle_publish))
}

pub fn write_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/videos", post(publish_video))
        .route("/videos/:video_id", patch(update_video))
        .layer(DefaultBodyLimit::max(
            state.config.upload_limit_mb * 1024 * 1024,
        ))
}

#[instrument(skip(state, viewer))]
pub async fn list_videos(
    State(state): State<AppState>,
    OptionalAuthUser(viewer): OptionalAuthUser,
    ApiQuery(q): ApiQuery<ListVideosQuery>,
) -> ApiResult<impl IntoResponse> {
    let page = services::list_videos(&state, q, viewer.map(|u| u.id)).await?;
    Ok(ApiResponse::ok(page, "Videos fetched successfully"))
}

#[instrument(skip(state, user, mp))]
pub async fn publish_video(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    mp: Multipart,
) -> ApiResult<impl IntoResponse> {
    let form = PublishForm::from_multipart(MultipartForm::read(mp).await?);
    let video = services::publish_video(&state, user.id, form).await?;
    Ok(ApiResponse::created(video, "Video published successfully"))
}

#[instrument(skip(state, viewer))]
pub async fn get_video(
    State(state): State<AppState>,
    OptionalAuthUser(viewer): OptionalAuthUser,
    ApiPath(video_id): ApiPath<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let video = services::get_video(&state, video_id, viewer.map(|u| u.id)).await?;
    Ok(ApiResponse::ok(video, "Video fetched successfully"))
}

#[instrument(skip(state, user, mp))]
pub async fn update_video(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(video_id): ApiPath<Uuid>,
    mp: Multipart,
) -> ApiResult<impl IntoResponse> {
    let form = UpdateVideoForm::from_multipart(MultipartForm::read(mp).await?);
    let video = services::update_video(&state, video_id, user.id, form).await?;
    Ok(ApiResponse::ok(video, "Video updated successfully"))
}

#[instrument(skip(state, user))]
pub async fn delete_video(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(video_id): ApiPath<Uuid>,
) -> ApiResult<impl IntoResponse> {
    services::delete_video(&state, video_id, user.id).await?;
    Ok(ApiResponse::ok(serde_json::json!({}), "Video deleted successfully"))
}

#[instrument(skip(state, user))]
pub async fn toggle_publish(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(video_id): ApiPath<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let video = services::toggle_publish(&state, video_id, user.id).await?;
    Ok(ApiResponse::ok(video, "Publish status toggled successfully"))
}
