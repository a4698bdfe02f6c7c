use axum::{
    extract::State,
    response::IntoResponse,
    routing::get,
    Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::services;
use crate::{
    auth::extractors::AuthUser,
    error::ApiResult,
    extract::ApiPath,
    response::ApiResponse,
    state::AppState,
};

pub fn subscription_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/subscriptions/c/:channel_id",
            get(channel_subscribers).post(toggle_subscription),
        )
        .route("/subscriptions/u/:subscriber_id", get(subscribed_channels))
}

#[instrument(skip(state, user))]
pub async fn toggle_subscription(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(channel_id): ApiPath<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let status = services::toggle_subscription(&state, user.id, channel_id).await?;
    let message = if status.subscribed {
        "Subscribed successfully"
    } else {
        "Unsubscribed successfully"
    };
    Ok(ApiResponse::ok(status, message))
}

#[instrument(skip(state, _user))]
pub async fn channel_subscribers(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    ApiPath(channel_id): ApiPath<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let subscribers = services::channel_subscribers(&state, channel_id).await?;
    Ok(ApiResponse::ok(subscribers, "Subscribers fetched successfully"))
}

#[instrument(skip(state, _user))]
pub async fn subscribed_channels(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    ApiPath(subscriber_id): ApiPath<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let channels = services::subscribed_channels(&state, subscriber_id).await?;
    Ok(ApiResponse::ok(channels, "Subscribed channels fetched successfully"))
}
