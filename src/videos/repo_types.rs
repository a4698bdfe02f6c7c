use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub video_file: String, // media URL
    pub thumbnail: String,  // media URL
    pub title: String,
    pub description: String,
    pub duration: f64, // seconds
    pub views: i64,
    pub is_published: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewVideo {
    pub owner_id: Uuid,
    pub video_file: String,
    pub thumbnail: String,
    pub title: String,
    pub description: String,
    pub duration: f64,
}

/// Fields replaced by an update; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct VideoPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub thumbnail: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum VideoSort {
    #[default]
    CreatedAt,
    Views,
    Duration,
    Title,
}

impl VideoSort {
    pub fn column(self) -> &'static str {
        match self {
            VideoSort::CreatedAt => "created_at",
            VideoSort::Views => "views",
            VideoSort::Duration => "duration",
            VideoSort::Title => "title",
        }
    }
}

#[derive(Debug, Clone)]
pub struct VideoFilter {
    /// Case-insensitive match on title or description.
    pub query: Option<String>,
    pub owner_id: Option<Uuid>,
    /// Unpublished videos of this user are included as well.
    pub viewer_id: Option<Uuid>,
    pub sort: VideoSort,
    pub descending: bool,
    pub limit: i64,
    pub offset: i64,
}
