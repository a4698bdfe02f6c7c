use std::collections::HashMap;

use tracing::{error, info, warn};
use uuid::Uuid;

use super::{
    dto::{ListVideosQuery, PublishForm, SortType, UpdateVideoForm, VideoDetails, VideoPage, VideoWithOwner},
    repo_types::{NewVideo, Video, VideoFilter, VideoPatch},
};
use crate::{
    error::{ApiError, ApiResult},
    likes::repo::LikeTarget,
    media::services::{self as media, MediaKind},
    state::AppState,
    users::dto::OwnerView,
};

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Pairs each video with its owner's public fields, keeping the input order.
pub async fn with_owners(st: &AppState, videos: Vec<Video>) -> ApiResult<Vec<VideoWithOwner>> {
    let mut owner_ids: Vec<Uuid> = videos.iter().map(|v| v.owner_id).collect();
    owner_ids.sort();
    owner_ids.dedup();
    let owners: HashMap<Uuid, OwnerView> = st
        .users
        .find_many(&owner_ids)
        .await?
        .iter()
        .map(|u| (u.id, OwnerView::from(u)))
        .collect();

    Ok(videos
        .into_iter()
        .map(|video| VideoWithOwner {
            owner: owners.get(&video.owner_id).cloned(),
            video,
        })
        .collect())
}

/// Loads a video for mutation by `user_id`: missing is 404, foreign is 403.
async fn owned_video(st: &AppState, video_id: Uuid, user_id: Uuid) -> ApiResult<Video> {
    let video = st
        .videos
        .find_by_id(video_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Video not found".into()))?;
    if video.owner_id != user_id {
        warn!(%video_id, %user_id, "video mutation by non-owner");
        return Err(ApiError::Forbidden(
            "You are not allowed to modify this video".into(),
        ));
    }
    Ok(video)
}

pub async fn list_videos(
    st: &AppState,
    q: ListVideosQuery,
    viewer: Option<Uuid>,
) -> ApiResult<VideoPage> {
    let page = q.page.unwrap_or(1);
    let limit = q.limit.unwrap_or(DEFAULT_PAGE_SIZE);
    let mut errors = Vec::new();
    if page < 1 {
        errors.push("page must be at least 1".to_string());
    }
    if !(1..=MAX_PAGE_SIZE).contains(&limit) {
        errors.push(format!("limit must be between 1 and {MAX_PAGE_SIZE}"));
    }
    let offset = if page >= 1 {
        (page - 1).checked_mul(limit)
    } else {
        None
    };
    if page >= 1 && offset.is_none() {
        errors.push("page is out of range".to_string());
    }
    let (Some(offset), true) = (offset, errors.is_empty()) else {
        return Err(ApiError::Validation(errors));
    };

    let filter = VideoFilter {
        query: q
            .query
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        owner_id: q.user_id,
        // own drafts only show up when browsing one's own channel
        viewer_id: viewer.filter(|v| q.user_id == Some(*v)),
        sort: q.sort_by.unwrap_or_default(),
        descending: q.sort_type.unwrap_or_default() == SortType::Desc,
        limit,
        offset,
    };
    let videos = st.videos.list(&filter).await?;
    Ok(VideoPage {
        videos: with_owners(st, videos).await?,
        page,
        limit,
    })
}

pub async fn publish_video(st: &AppState, owner_id: Uuid, form: PublishForm) -> ApiResult<Video> {
    let mut errors = Vec::new();
    if form.title.is_none() {
        errors.push("title is required".to_string());
    }
    if form.description.is_none() {
        errors.push("description is required".to_string());
    }
    let duration = match form.duration.as_deref() {
        None => 0.0,
        Some(raw) => match raw.parse::<f64>() {
            Ok(d) if d.is_finite() && d >= 0.0 => d,
            _ => {
                errors.push("duration must be a non-negative number of seconds".to_string());
                0.0
            }
        },
    };
    if form.video_file.is_none() {
        errors.push("videoFile is required".to_string());
    }
    if form.thumbnail.is_none() {
        errors.push("thumbnail is required".to_string());
    }
    let (Some(title), Some(description), Some(video_file), Some(thumbnail), true) = (
        form.title,
        form.description,
        form.video_file,
        form.thumbnail,
        errors.is_empty(),
    ) else {
        return Err(ApiError::Validation(errors));
    };

    let video_url = media::upload(st, MediaKind::Video, owner_id, video_file)
        .await
        .map_err(|e| {
            error!(error = %e, "video upload failed");
            ApiError::Internal("Error while uploading video".into())
        })?;
    let thumbnail_url = match media::upload(st, MediaKind::Thumbnail, owner_id, thumbnail).await {
        Ok(url) => url,
        Err(e) => {
            error!(error = %e, "thumbnail upload failed");
            media::remove(st, &video_url).await;
            return Err(ApiError::Internal("Error while uploading thumbnail".into()));
        }
    };

    let created = st
        .videos
        .create(NewVideo {
            owner_id,
            video_file: video_url.clone(),
            thumbnail: thumbnail_url.clone(),
            title,
            description,
            duration,
        })
        .await;
    match created {
        Ok(video) => {
            info!(video_id = %video.id, %owner_id, "video published");
            Ok(video)
        }
        Err(e) => {
            media::remove(st, &video_url).await;
            media::remove(st, &thumbnail_url).await;
            Err(e.into())
        }
    }
}

/// Fetches a video for `viewer`. Counts a view and, for signed-in viewers,
/// moves the video to the front of their watch history.
pub async fn get_video(
    st: &AppState,
    video_id: Uuid,
    viewer: Option<Uuid>,
) -> ApiResult<VideoDetails> {
    let mut video = st
        .videos
        .find_by_id(video_id)
        .await?
        .filter(|v| v.is_published || Some(v.owner_id) == viewer)
        .ok_or_else(|| ApiError::NotFound("Video not found".into()))?;

    st.videos.increment_views(video_id).await?;
    video.views += 1;

    let is_liked = match viewer {
        Some(viewer) => {
            st.users.record_watch(viewer, video_id).await?;
            st.likes
                .find(viewer, LikeTarget::Video(video_id))
                .await?
                .is_some()
        }
        None => false,
    };
    let likes_count = st.likes.count(LikeTarget::Video(video_id)).await?;
    let owner = st
        .users
        .find_by_id(video.owner_id)
        .await?
        .as_ref()
        .map(OwnerView::from);

    Ok(VideoDetails {
        video,
        owner,
        likes_count,
        is_liked,
    })
}

pub async fn update_video(
    st: &AppState,
    video_id: Uuid,
    user_id: Uuid,
    form: UpdateVideoForm,
) -> ApiResult<Video> {
    let current = owned_video(st, video_id, user_id).await?;
    if form.is_empty() {
        return Err(ApiError::BadRequest(
            "At least one of title, description or thumbnail is required".into(),
        ));
    }

    let thumbnail = match form.thumbnail {
        Some(item) => Some(
            media::upload(st, MediaKind::Thumbnail, user_id, item)
                .await
                .map_err(|e| {
                    error!(error = %e, "thumbnail upload failed");
                    ApiError::Internal("Error while uploading thumbnail".into())
                })?,
        ),
        None => None,
    };
    let patch = VideoPatch {
        title: form.title,
        description: form.description,
        thumbnail: thumbnail.clone(),
    };

    let updated = match st.videos.update(video_id, &patch).await {
        Ok(Some(video)) => video,
        Ok(None) => {
            if let Some(url) = &thumbnail {
                media::remove(st, url).await;
            }
            return Err(ApiError::NotFound("Video not found".into()));
        }
        Err(e) => {
            if let Some(url) = &thumbnail {
                media::remove(st, url).await;
            }
            return Err(e.into());
        }
    };
    if thumbnail.is_some() {
        media::remove(st, &current.thumbnail).await;
    }
    info!(%video_id, "video updated");
    Ok(updated)
}

pub async fn delete_video(st: &AppState, video_id: Uuid, user_id: Uuid) -> ApiResult<()> {
    let video = owned_video(st, video_id, user_id).await?;
    let likes = st.likes.delete_for_target(LikeTarget::Video(video_id)).await?;
    if !st.videos.delete(video_id).await? {
        return Err(ApiError::NotFound("Video not found".into()));
    }
    media::remove(st, &video.video_file).await;
    media::remove(st, &video.thumbnail).await;
    info!(%video_id, likes, "video deleted");
    Ok(())
}

pub async fn toggle_publish(st: &AppState, video_id: Uuid, user_id: Uuid) -> ApiResult<Video> {
    let video = owned_video(st, video_id, user_id).await?;
    let updated = st
        .videos
        .set_published(video_id, !video.is_published)
        .await?
        .ok_or_else(|| ApiError::NotFound("Video not found".into()))?;
    info!(%video_id, is_published = updated.is_published, "publish status toggled");
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::services::test_support::{png, signed_up};
    use crate::media::services::UploadItem;
    use crate::memory::FakeStorage;
    use crate::videos::repo_types::VideoSort;
    use bytes::Bytes;

    fn mp4() -> UploadItem {
        UploadItem {
            body: Bytes::from_static(b"\x00\x00\x00\x18ftypmp42"),
            content_type: "video/mp4".into(),
            file_name: Some("clip.mp4".into()),
        }
    }

    fn publish_form(title: &str) -> PublishForm {
        PublishForm {
            title: Some(title.into()),
            description: Some(format!("about {title}")),
            duration: Some("12.5".into()),
            video_file: Some(mp4()),
            thumbnail: Some(png()),
        }
    }

    #[tokio::test]
    async fn publish_uploads_both_assets() {
        let storage = FakeStorage::default();
        let st = AppState::fake_with(storage.clone());
        let (alice, _) = signed_up(&st, "alice").await;
        let before = storage.object_count();

        let video = publish_video(&st, alice.id, publish_form("intro")).await.unwrap();
        assert_eq!(video.owner_id, alice.id);
        assert_eq!(video.duration, 12.5);
        assert!(video.is_published);
        assert!(storage.contains_url(&video.video_file));
        assert!(storage.contains_url(&video.thumbnail));
        assert_eq!(storage.object_count(), before + 2);
    }

    #[tokio::test]
    async fn publish_collects_validation_errors() {
        let st = AppState::fake();
        let (alice, _) = signed_up(&st, "alice").await;
        let form = PublishForm {
            duration: Some("soon".into()),
            ..Default::default()
        };
        match publish_video(&st, alice.id, form).await {
            Err(ApiError::Validation(errors)) => assert_eq!(errors.len(), 5),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn failed_thumbnail_upload_removes_video_file() {
        let storage = FakeStorage::failing_for("thumbnails/");
        let st = AppState::fake_with(storage.clone());
        let (alice, _) = signed_up(&st, "alice").await;
        let before = storage.object_count();

        let err = publish_video(&st, alice.id, publish_form("intro"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Internal(_)));
        assert_eq!(storage.object_count(), before);
    }

    #[tokio::test]
    async fn unpublished_video_is_hidden_from_others() {
        let st = AppState::fake();
        let (alice, _) = signed_up(&st, "alice").await;
        let (bob, _) = signed_up(&st, "bob").await;
        let video = publish_video(&st, alice.id, publish_form("draft")).await.unwrap();
        toggle_publish(&st, video.id, alice.id).await.unwrap();

        assert!(matches!(
            get_video(&st, video.id, Some(bob.id)).await,
            Err(ApiError::NotFound(_))
        ));
        assert!(matches!(
            get_video(&st, video.id, None).await,
            Err(ApiError::NotFound(_))
        ));
        let own = get_video(&st, video.id, Some(alice.id)).await.unwrap();
        assert!(!own.video.is_published);
    }

    #[tokio::test]
    async fn get_counts_views_and_records_history() {
        let st = AppState::fake();
        let (alice, _) = signed_up(&st, "alice").await;
        let (bob, _) = signed_up(&st, "bob").await;
        let video = publish_video(&st, alice.id, publish_form("intro")).await.unwrap();
        st.likes
            .create(bob.id, LikeTarget::Video(video.id))
            .await
            .unwrap();

        let anon = get_video(&st, video.id, None).await.unwrap();
        assert_eq!(anon.video.views, 1);
        assert!(!anon.is_liked);

        let seen = get_video(&st, video.id, Some(bob.id)).await.unwrap();
        assert_eq!(seen.video.views, 2);
        assert_eq!(seen.likes_count, 1);
        assert!(seen.is_liked);
        assert_eq!(seen.owner.unwrap().username, "alice");
        assert_eq!(st.users.watch_history(bob.id).await.unwrap(), vec![video.id]);
    }

    #[tokio::test]
    async fn only_owner_may_update() {
        let storage = FakeStorage::default();
        let st = AppState::fake_with(storage.clone());
        let (alice, _) = signed_up(&st, "alice").await;
        let (bob, _) = signed_up(&st, "bob").await;
        let video = publish_video(&st, alice.id, publish_form("intro")).await.unwrap();

        let patch = || UpdateVideoForm {
            title: Some("renamed".into()),
            ..Default::default()
        };
        assert!(matches!(
            update_video(&st, video.id, bob.id, patch()).await,
            Err(ApiError::Forbidden(_))
        ));
        assert!(matches!(
            update_video(&st, Uuid::new_v4(), alice.id, patch()).await,
            Err(ApiError::NotFound(_))
        ));
        assert!(matches!(
            update_video(&st, video.id, alice.id, UpdateVideoForm::default()).await,
            Err(ApiError::BadRequest(_))
        ));

        let renamed = update_video(&st, video.id, alice.id, patch()).await.unwrap();
        assert_eq!(renamed.title, "renamed");
        assert_eq!(renamed.thumbnail, video.thumbnail);

        let rethumbed = update_video(
            &st,
            video.id,
            alice.id,
            UpdateVideoForm {
                thumbnail: Some(png()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_ne!(rethumbed.thumbnail, video.thumbnail);
        assert!(!storage.contains_url(&video.thumbnail));
        assert_eq!(rethumbed.title, "renamed");
    }

    #[tokio::test]
    async fn delete_removes_record_likes_and_media() {
        let storage = FakeStorage::default();
        let st = AppState::fake_with(storage.clone());
        let (alice, _) = signed_up(&st, "alice").await;
        let (bob, _) = signed_up(&st, "bob").await;
        let video = publish_video(&st, alice.id, publish_form("intro")).await.unwrap();
        st.likes
            .create(bob.id, LikeTarget::Video(video.id))
            .await
            .unwrap();

        assert!(matches!(
            delete_video(&st, video.id, bob.id).await,
            Err(ApiError::Forbidden(_))
        ));
        // a refused delete leaves the likes alone
        assert_eq!(st.likes.count(LikeTarget::Video(video.id)).await.unwrap(), 1);
        delete_video(&st, video.id, alice.id).await.unwrap();

        assert!(st.videos.find_by_id(video.id).await.unwrap().is_none());
        assert_eq!(st.likes.count(LikeTarget::Video(video.id)).await.unwrap(), 0);
        assert!(!storage.contains_url(&video.video_file));
        assert!(!storage.contains_url(&video.thumbnail));
        assert!(matches!(
            delete_video(&st, video.id, alice.id).await,
            Err(ApiError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn listing_filters_sorts_and_pages() {
        let st = AppState::fake();
        let (alice, _) = signed_up(&st, "alice").await;
        let (bob, _) = signed_up(&st, "bob").await;
        let cats = publish_video(&st, alice.id, publish_form("Cats")).await.unwrap();
        let dogs = publish_video(&st, alice.id, publish_form("Dogs")).await.unwrap();
        let draft = publish_video(&st, alice.id, publish_form("Cat draft")).await.unwrap();
        toggle_publish(&st, draft.id, alice.id).await.unwrap();
        publish_video(&st, bob.id, publish_form("Birds")).await.unwrap();

        let newest = list_videos(&st, ListVideosQuery::default(), None).await.unwrap();
        assert_eq!(newest.videos.len(), 3);
        assert_eq!(newest.videos[1].video.id, dogs.id);

        let search = ListVideosQuery {
            query: Some("cat".into()),
            ..Default::default()
        };
        let found = list_videos(&st, search, None).await.unwrap();
        assert_eq!(found.videos.len(), 1);
        assert_eq!(found.videos[0].video.id, cats.id);
        assert_eq!(found.videos[0].owner.as_ref().unwrap().username, "alice");

        let own_channel = ListVideosQuery {
            user_id: Some(alice.id),
            sort_by: Some(VideoSort::Title),
            sort_type: Some(SortType::Asc),
            ..Default::default()
        };
        let titles: Vec<String> = list_videos(&st, own_channel, Some(alice.id))
            .await
            .unwrap()
            .videos
            .into_iter()
            .map(|v| v.video.title)
            .collect();
        assert_eq!(titles, vec!["Cat draft", "Cats", "Dogs"]);

        let second_page = ListVideosQuery {
            page: Some(2),
            limit: Some(2),
            ..Default::default()
        };
        assert_eq!(list_videos(&st, second_page, None).await.unwrap().videos.len(), 1);

        let far_page = ListVideosQuery {
            page: Some(i64::MAX),
            ..Default::default()
        };
        assert!(matches!(
            list_videos(&st, far_page, None).await,
            Err(ApiError::Validation(_))
        ));

        let too_big = ListVideosQuery {
            limit: Some(500),
            ..Default::default()
        };
        assert!(matches!(
            list_videos(&st, too_big, None).await,
            Err(ApiError::Validation(_))
        ));
    }
}
