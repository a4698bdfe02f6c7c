use axum::{
    extract::State,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{repo::LikeTarget, services};
use crate::{
    auth::extractors::AuthUser,
    error::ApiResult,
    extract::ApiPath,
    response::ApiResponse,
    state::AppState,
};

pub fn like_routes() -> Router<AppState> {
    Router::new()
        .route("/likes/toggle/v/:video_id", post(toggle_video_like))
        .route("/likes/toggle/t/:tweet_id", post(toggle_tweet_like))
        .route("/likes/videos", get(liked_videos))
}

fn toggled_message(liked: bool) -> &'static str {
    if liked {
        "Liked successfully"
    } else {
        "Like removed successfully"
    }
}

#[instrument(skip(state, user))]
pub async fn toggle_video_like(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(video_id): ApiPath<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let status = services::toggle_like(&state, user.id, LikeTarget::Video(video_id)).await?;
    let message = toggled_message(status.liked);
    Ok(ApiResponse::ok(status, message))
}

#[instrument(skip(state, user))]
pub async fn toggle_tweet_like(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(tweet_id): ApiPath<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let status = services::toggle_like(&state, user.id, LikeTarget::Tweet(tweet_id)).await?;
    let message = toggled_message(status.liked);
    Ok(ApiResponse::ok(status, message))
}

#[instrument(skip(state, user))]
pub async fn liked_videos(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<impl IntoResponse> {
    let videos = services::liked_videos(&state, user.id).await?;
    Ok(ApiResponse::ok(videos, "Liked videos fetched successfully"))
}
