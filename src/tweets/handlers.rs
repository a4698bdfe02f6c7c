use axum::{
    extract::State,
    response::IntoResponse,
    routing::{get, patch, post},
    Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{dto::TweetRequest, services};
use crate::{
    auth::extractors::AuthUser,
    error::ApiResult,
    extract::{ApiJson, ApiPath},
    response::ApiResponse,
    state::AppState,
};

pub fn tweet_routes() -> Router<AppState> {
    Router::new()
        .route("/tweets", post(create_tweet))
        .route("/tweets/user/:user_id", get(user_tweets))
        .route("/tweets/:tweet_id", patch(update_tweet).delete(delete_tweet))
}

#[instrument(skip(state, user, payload))]
pub async fn create_tweet(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(payload): ApiJson<TweetRequest>,
) -> ApiResult<impl IntoResponse> {
    let tweet = services::create_tweet(&state, user.id, payload).await?;
    Ok(ApiResponse::created(tweet, "Tweet created successfully"))
}

#[instrument(skip(state, _user))]
pub async fn user_tweets(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    ApiPath(user_id): ApiPath<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let tweets = services::user_tweets(&state, user_id).await?;
    Ok(ApiResponse::ok(tweets, "User tweets fetched successfully"))
}

#[instrument(skip(state, user, payload))]
pub async fn update_tweet(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(tweet_id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<TweetRequest>,
) -> ApiResult<impl IntoResponse> {
    let tweet = services::update_tweet(&state, tweet_id, user.id, payload).await?;
    Ok(ApiResponse::ok(tweet, "Tweet updated successfully"))
}

#[instrument(skip(state, user))]
pub async fn delete_tweet(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(tweet_id): ApiPath<Uuid>,
) -> ApiResult<impl IntoResponse> {
    services::delete_tweet(&state, tweet_id, user.id).await?;
    Ok(ApiResponse::ok(serde_json::json!({}), "Tweet deleted successfully"))
}
