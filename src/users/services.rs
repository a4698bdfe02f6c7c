use tracing::{error, info};
use uuid::Uuid;

use super::dto::{ChannelProfile, UpdateAccountRequest, UserView};
use crate::{
    auth::services::is_valid_email,
    error::{ApiError, ApiResult},
    media::services::{self as media, MediaKind, UploadItem},
    state::AppState,
    videos::{dto::VideoWithOwner, services::with_owners},
};

pub async fn update_account(
    st: &AppState,
    user_id: Uuid,
    req: UpdateAccountRequest,
) -> ApiResult<UserView> {
    let full_name = req.full_name.trim();
    let email = req.email.trim().to_lowercase();
    let mut errors = Vec::new();
    if full_name.is_empty() {
        errors.push("fullName is required".to_string());
    }
    if email.is_empty() {
        errors.push("email is required".to_string());
    } else if !is_valid_email(&email) {
        errors.push("email is invalid".to_string());
    }
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    if let Some(other) = st.users.find_by_email(&email).await? {
        if other.id != user_id {
            return Err(ApiError::Conflict("Email is already in use".into()));
        }
    }

    let user = st
        .users
        .update_account(user_id, full_name, &email)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
    info!(%user_id, "account details updated");
    Ok(UserView::from(user))
}

/// Replaces the avatar or cover image. The previous asset is removed from
/// the media host once the record points at the new one.
pub async fn replace_image(
    st: &AppState,
    user_id: Uuid,
    kind: MediaKind,
    file: Option<UploadItem>,
) -> ApiResult<UserView> {
    let label = match kind {
        MediaKind::CoverImage => "Cover image",
        _ => "Avatar",
    };
    let file = file.ok_or_else(|| ApiError::BadRequest(format!("{label} file is missing")))?;

    let current = st
        .users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    let url = media::upload(st, kind, user_id, file).await.map_err(|e| {
        error!(error = %e, "image upload failed");
        ApiError::Internal(format!("Error while uploading {}", label.to_lowercase()))
    })?;

    let updated = match kind {
        MediaKind::CoverImage => st.users.set_cover_img(user_id, &url).await,
        _ => st.users.set_avatar(user_id, &url).await,
    };
    let user = match updated {
        Ok(Some(user)) => user,
        Ok(None) => {
            media::remove(st, &url).await;
            return Err(ApiError::NotFound("User not found".into()));
        }
        Err(e) => {
            media::remove(st, &url).await;
            return Err(e.into());
        }
    };

    let previous = match kind {
        MediaKind::CoverImage => current.cover_img,
        _ => Some(current.avatar),
    };
    if let Some(previous) = previous {
        media::remove(st, &previous).await;
    }

    info!(%user_id, kind = ?kind, "user image updated");
    Ok(UserView::from(user))
}

/// Channel page of `username` as seen by `viewer` (anonymous when `None`).
pub async fn channel_profile(
    st: &AppState,
    username: &str,
    viewer: Option<Uuid>,
) -> ApiResult<ChannelProfile> {
    let username = username.trim().to_lowercase();
    if username.is_empty() {
        return Err(ApiError::BadRequest("username is missing".into()));
    }

    let channel = st
        .users
        .find_by_username(&username)
        .await?
        .ok_or_else(|| ApiError::NotFound("Channel does not exist".into()))?;

    let subscriber_count = st.subscriptions.count_subscribers(channel.id).await?;
    let subscribed_to_count = st.subscriptions.count_subscribed_to(channel.id).await?;
    let is_subscribed = match viewer {
        Some(viewer) => st
            .subscriptions
            .find_pair(viewer, channel.id)
            .await?
            .is_some(),
        None => false,
    };

    Ok(ChannelProfile {
        id: channel.id,
        username: channel.username,
        full_name: channel.full_name,
        avatar: channel.avatar,
        cover_img: channel.cover_img,
        subscriber_count,
        subscribed_to_count,
        is_subscribed,
        created_at: channel.created_at,
    })
}

/// Watched videos, most recent first, each with its owner's public fields.
pub async fn watch_history(st: &AppState, user_id: Uuid) -> ApiResult<Vec<VideoWithOwner>> {
    let ids = st.users.watch_history(user_id).await?;
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut videos = st.videos.find_many(&ids).await?;
    videos.sort_by_key(|v| ids.iter().position(|id| *id == v.id));
    with_owners(st, videos).await
}
