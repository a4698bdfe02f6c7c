use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use super::repo::LikeTarget;
use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
    videos::{dto::VideoWithOwner, services::with_owners},
};

#[derive(Debug, Serialize)]
pub struct LikeStatus {
    pub liked: bool,
}

async fn ensure_target_exists(st: &AppState, target: LikeTarget) -> ApiResult<()> {
    let found = match target {
        LikeTarget::Video(id) => st.videos.find_by_id(id).await?.is_some(),
        LikeTarget::Tweet(id) => st.tweets.find_by_id(id).await?.is_some(),
    };
    if found {
        Ok(())
    } else {
        let what = match target {
            LikeTarget::Video(_) => "Video",
            LikeTarget::Tweet(_) => "Tweet",
        };
        Err(ApiError::NotFound(format!("{what} not found")))
    }
}

/// Flips the caller's like on `target`. Only the caller's own edge is ever
/// looked up or removed.
pub async fn toggle_like(st: &AppState, user_id: Uuid, target: LikeTarget) -> ApiResult<LikeStatus> {
    ensure_target_exists(st, target).await?;
    let liked = match st.likes.find(user_id, target).await? {
        Some(existing) => {
            st.likes.delete(existing.id).await?;
            false
        }
        None => {
            st.likes.create(user_id, target).await?;
            true
        }
    };
    info!(%user_id, ?target, liked, "like toggled");
    Ok(LikeStatus { liked })
}

/// Videos the user liked, most recent like first. Videos that have since
/// been unpublished by someone else are left out.
pub async fn liked_videos(st: &AppState, user_id: Uuid) -> ApiResult<Vec<VideoWithOwner>> {
    let ids: Vec<Uuid> = st
        .likes
        .list_video_likes(user_id)
        .await?
        .iter()
        .filter_map(|like| match like.target() {
            Some(LikeTarget::Video(id)) => Some(id),
            _ => None,
        })
        .collect();
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut videos = st.videos.find_many(&ids).await?;
    videos.retain(|v| v.is_published || v.owner_id == user_id);
    videos.sort_by_key(|v| ids.iter().position(|id| *id == v.id));
    with_owners(st, videos).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::services::test_support::signed_up;
    use crate::videos::repo_types::NewVideo;

    async fn video_by(st: &AppState, owner_id: Uuid, title: &str) -> Uuid {
        st.videos
            .create(NewVideo {
                owner_id,
                video_file: format!("https://media.test/{title}.mp4"),
                thumbnail: format!("https://media.test/{title}.png"),
                title: title.into(),
                description: "d".into(),
                duration: 3.0,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn toggle_flips_only_own_like() {
        let st = AppState::fake();
        let (alice, _) = signed_up(&st, "alice").await;
        let (bob, _) = signed_up(&st, "bob").await;
        let video = LikeTarget::Video(video_by(&st, alice.id, "clip").await);

        assert!(toggle_like(&st, alice.id, video).await.unwrap().liked);
        assert!(toggle_like(&st, bob.id, video).await.unwrap().liked);
        assert_eq!(st.likes.count(video).await.unwrap(), 2);

        assert!(!toggle_like(&st, bob.id, video).await.unwrap().liked);
        assert_eq!(st.likes.count(video).await.unwrap(), 1);
        assert!(st.likes.find(alice.id, video).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn tweet_likes_and_missing_targets() {
        let st = AppState::fake();
        let (alice, _) = signed_up(&st, "alice").await;
        let tweet = st.tweets.create(alice.id, "hi").await.unwrap();

        let status = toggle_like(&st, alice.id, LikeTarget::Tweet(tweet.id))
            .await
            .unwrap();
        assert!(status.liked);

        for target in [LikeTarget::Video(Uuid::new_v4()), LikeTarget::Tweet(Uuid::new_v4())] {
            assert!(matches!(
                toggle_like(&st, alice.id, target).await,
                Err(ApiError::NotFound(_))
            ));
        }
    }

    #[tokio::test]
    async fn liked_videos_newest_like_first() {
        let st = AppState::fake();
        let (alice, _) = signed_up(&st, "alice").await;
        let (bob, _) = signed_up(&st, "bob").await;
        let first = video_by(&st, alice.id, "first").await;
        let second = video_by(&st, alice.id, "second").await;
        let hidden = video_by(&st, alice.id, "hidden").await;

        toggle_like(&st, bob.id, LikeTarget::Video(second)).await.unwrap();
        toggle_like(&st, bob.id, LikeTarget::Video(first)).await.unwrap();
        toggle_like(&st, bob.id, LikeTarget::Video(hidden)).await.unwrap();
        st.videos.set_published(hidden, false).await.unwrap();
        let tweet = st.tweets.create(alice.id, "hi").await.unwrap();
        toggle_like(&st, bob.id, LikeTarget::Tweet(tweet.id)).await.unwrap();

        let liked = liked_videos(&st, bob.id).await.unwrap();
        let titles: Vec<&str> = liked.iter().map(|v| v.video.title.as_str()).collect();
        assert_eq!(titles, vec!["first", "second"]);
        assert_eq!(liked[0].owner.as_ref().unwrap().username, "alice");
    }
}
