use anyhow::Context;
use bytes::Bytes;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::state::AppState;

/// One uploaded file part, held in memory until it is pushed to the media host.
#[derive(Debug, Clone)]
pub struct UploadItem {
    pub body: Bytes,
    pub content_type: String,
    pub file_name: Option<String>,
}

/// Folder under which an asset lives on the media host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Avatar,
    CoverImage,
    Video,
    Thumbnail,
}

impl MediaKind {
    fn folder(self) -> &'static str {
        match self {
            MediaKind::Avatar => "avatars",
            MediaKind::CoverImage => "covers",
            MediaKind::Video => "videos",
            MediaKind::Thumbnail => "thumbnails",
        }
    }
}

/// Uploads `item` for `owner` and returns the public URL.
pub async fn upload(
    st: &AppState,
    kind: MediaKind,
    owner: Uuid,
    item: UploadItem,
) -> anyhow::Result<String> {
    let ext = ext_from_mime(&item.content_type)
        .or_else(|| item.file_name.as_deref().and_then(ext_from_file_name))
        .unwrap_or("bin");
    let key = format!("{}/{}/{}.{}", kind.folder(), owner, Uuid::new_v4(), ext);
    let url = st
        .storage
        .put_object(&key, item.body, &item.content_type)
        .await
        .with_context(|| format!("put_object {}", key))?;
    debug!(%key, "media uploaded");
    Ok(url)
}

/// Deletes an asset previously returned by [`upload`]. Failures are logged
/// and swallowed: a leftover object never fails the request.
pub async fn remove(st: &AppState, url: &str) {
    let Some(key) = st.storage.key_from_url(url) else {
        return;
    };
    if let Err(e) = st.storage.delete_object(&key).await {
        warn!(error = %e, %key, "media delete failed");
    }
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        "image/heic" => Some("heic"),
        "video/mp4" => Some("mp4"),
        "video/webm" => Some("webm"),
        "video/quicktime" => Some("mov"),
        "video/x-matroska" => Some("mkv"),
        _ => None,
    }
}

fn ext_from_file_name(name: &str) -> Option<&'static str> {
    let (_, ext) = name.rsplit_once('.')?;
    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => Some("jpg"),
        "png" => Some("png"),
        "webp" => Some("webp"),
        "gif" => Some("gif"),
        "mp4" => Some("mp4"),
        "webm" => Some("webm"),
        "mov" => Some("mov"),
        "mkv" => Some("mkv"),
        _ => None,
    }
}
