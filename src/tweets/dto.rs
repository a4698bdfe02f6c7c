use serde::{Deserialize, Serialize};

use super::repo::Tweet;
use crate::users::dto::OwnerView;

pub const MAX_TWEET_CHARS: usize = 280;

#[derive(Debug, Default, Deserialize)]
pub struct TweetRequest {
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct TweetWithOwner {
    #[serde(flatten)]
    pub tweet: Tweet,
    pub owner: OwnerView,
}
