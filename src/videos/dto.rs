use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::repo_types::{Video, VideoSort};
use crate::{extract::MultipartForm, media::services::UploadItem, users::dto::OwnerView};

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortType {
    Asc,
    #[default]
    Desc,
}

/// `GET /videos` query string.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListVideosQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub query: Option<String>,
    pub sort_by: Option<VideoSort>,
    pub sort_type: Option<SortType>,
    pub user_id: Option<Uuid>,
}

/// Multipart body of `POST /videos`.
#[derive(Debug, Default)]
pub struct PublishForm {
    pub title: Option<String>,
    pub description: Option<String>,
    pub duration: Option<String>,
    pub video_file: Option<UploadItem>,
    pub thumbnail: Option<UploadItem>,
}

impl PublishForm {
    pub fn from_multipart(mut form: MultipartForm) -> Self {
        Self {
            title: form.text("title"),
            description: form.text("description"),
            duration: form.text("duration"),
            video_file: form.take_file("videoFile"),
            thumbnail: form.take_file("thumbnail"),
        }
    }
}

/// Multipart body of `PATCH /videos/:videoId`; absent parts are kept.
#[derive(Debug, Default)]
pub struct UpdateVideoForm {
    pub title: Option<String>,
    pub description: Option<String>,
    pub thumbnail: Option<UploadItem>,
}

impl UpdateVideoForm {
    pub fn from_multipart(mut form: MultipartForm) -> Self {
        Self {
            title: form.text("title"),
            description: form.text("description"),
            thumbnail: form.take_file("thumbnail"),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.thumbnail.is_none()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoWithOwner {
    #[serde(flatten)]
    pub video: Video,
    pub owner: Option<OwnerView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoDetails {
    #[serde(flatten)]
    pub video: Video,
    pub owner: Option<OwnerView>,
    pub likes_count: i64,
    pub is_liked: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoPage {
    pub videos: Vec<VideoWithOwner>,
    pub page: i64,
    pub limit: i64,
}
