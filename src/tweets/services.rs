use tracing::{info, warn};
use uuid::Uuid;

use super::{
    dto::{TweetRequest, TweetWithOwner, MAX_TWEET_CHARS},
    repo::Tweet,
};
use crate::{
    error::{ApiError, ApiResult},
    likes::repo::LikeTarget,
    state::AppState,
    users::dto::OwnerView,
};

fn validated(req: TweetRequest) -> ApiResult<String> {
    let content = req.content.trim();
    if content.is_empty() {
        return Err(ApiError::BadRequest("content is required".into()));
    }
    if content.chars().count() > MAX_TWEET_CHARS {
        return Err(ApiError::BadRequest(format!(
            "content must be at most {MAX_TWEET_CHARS} characters"
        )));
    }
    Ok(content.to_string())
}

async fn owned_tweet(st: &AppState, tweet_id: Uuid, user_id: Uuid) -> ApiResult<Tweet> {
    let tweet = st
        .tweets
        .find_by_id(tweet_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Tweet not found".into()))?;
    if tweet.owner_id != user_id {
        warn!(%tweet_id, %user_id, "tweet mutation by non-owner");
        return Err(ApiError::Forbidden(
            "You are not allowed to modify this tweet".into(),
        ));
    }
    Ok(tweet)
}

pub async fn create_tweet(st: &AppState, owner_id: Uuid, req: TweetRequest) -> ApiResult<Tweet> {
    let content = validated(req)?;
    let tweet = st.tweets.create(owner_id, &content).await?;
    info!(tweet_id = %tweet.id, %owner_id, "tweet created");
    Ok(tweet)
}

pub async fn user_tweets(st: &AppState, user_id: Uuid) -> ApiResult<Vec<TweetWithOwner>> {
    let owner = st
        .users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
    let owner = OwnerView::from(&owner);
    let tweets = st.tweets.list_by_owner(user_id).await?;
    Ok(tweets
        .into_iter()
        .map(|tweet| TweetWithOwner {
            tweet,
            owner: owner.clone(),
        })
        .collect())
}

pub async fn update_tweet(
    st: &AppState,
    tweet_id: Uuid,
    user_id: Uuid,
    req: TweetRequest,
) -> ApiResult<Tweet> {
    owned_tweet(st, tweet_id, user_id).await?;
    let content = validated(req)?;
    st.tweets
        .update_content(tweet_id, &content)
        .await?
        .ok_or_else(|| ApiError::NotFound("Tweet not found".into()))
}

pub async fn delete_tweet(st: &AppState, tweet_id: Uuid, user_id: Uuid) -> ApiResult<()> {
    owned_tweet(st, tweet_id, user_id).await?;
    st.likes
        .delete_for_target(LikeTarget::Tweet(tweet_id))
        .await?;
    if !st.tweets.delete(tweet_id).await? {
        return Err(ApiError::NotFound("Tweet not found".into()));
    }
    info!(%tweet_id, "tweet deleted");
    Ok(())
}
