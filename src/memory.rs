//! In-memory repositories and media host used by tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::UniqueViolation;
use crate::likes::repo::{Like, LikeRepo, LikeTarget};
use crate::storage::{strip_public_prefix, StorageClient};
use crate::subscriptions::repo::{Subscription, SubscriptionRepo};
use crate::tweets::repo::{Tweet, TweetRepo};
use crate::users::repo::UserRepo;
use crate::users::repo_types::{NewUser, User};
use crate::videos::repo::VideoRepo;
use crate::videos::repo_types::{NewVideo, Video, VideoFilter, VideoPatch, VideoSort};

pub const FAKE_MEDIA_URL: &str = "https://media.test/vidtube";

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    watch_history: HashMap<Uuid, Vec<Uuid>>,
    videos: Vec<Video>,
    tweets: Vec<Tweet>,
    subscriptions: Vec<Subscription>,
    likes: Vec<Like>,
}

/// Every table lives behind one lock; rows are kept in insertion order so
/// "newest first" is a reverse scan.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    user_insert_conflicts: bool,
}

impl MemoryStore {
    /// User inserts fail with a unique violation, as when a concurrent
    /// registration commits first.
    pub fn conflicting_user_inserts() -> Self {
        Self {
            user_insert_conflicts: true,
            ..Self::default()
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut Tables) -> R) -> anyhow::Result<R> {
        let mut guard = self
            .tables
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store poisoned"))?;
        Ok(f(&mut guard))
    }
}

fn duplicate(what: &str) -> anyhow::Error {
    anyhow::Error::new(UniqueViolation(what.to_string()))
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn create(&self, new: NewUser) -> anyhow::Result<User> {
        let conflicts = self.user_insert_conflicts;
        self.with(|t| {
            if conflicts
                || t
                    .users
                    .iter()
                    .any(|u| u.username == new.username || u.email == new.email)
            {
                return Err(duplicate("user"));
            }
            let now = OffsetDateTime::now_utc();
            let user = User {
                id: Uuid::new_v4(),
                username: new.username,
                email: new.email,
                full_name: new.full_name,
                password_hash: new.password_hash,
                avatar: new.avatar,
                cover_img: new.cover_img,
                refresh_token: None,
                created_at: now,
                updated_at: now,
            };
            t.users.push(user.clone());
            Ok(user)
        })?
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        self.with(|t| t.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        self.with(|t| t.users.iter().find(|u| u.username == username).cloned())
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        self.with(|t| t.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> anyhow::Result<Option<User>> {
        self.with(|t| {
            t.users
                .iter()
                .find(|u| u.username == username || u.email == email)
                .cloned()
        })
    }

    async fn find_many(&self, ids: &[Uuid]) -> anyhow::Result<Vec<User>> {
        self.with(|t| {
            t.users
                .iter()
                .filter(|u| ids.contains(&u.id))
                .cloned()
                .collect()
        })
    }

    async fn set_refresh_token(&self, id: Uuid, token: Option<&str>) -> anyhow::Result<()> {
        self.with(|t| {
            if let Some(u) = t.users.iter_mut().find(|u| u.id == id) {
                u.refresh_token = token.map(str::to_string);
            }
        })
    }

    async fn set_password_hash(&self, id: Uuid, hash: &str) -> anyhow::Result<()> {
        self.with(|t| {
            if let Some(u) = t.users.iter_mut().find(|u| u.id == id) {
                u.password_hash = hash.to_string();
                u.updated_at = OffsetDateTime::now_utc();
            }
        })
    }

    async fn update_account(
        &self,
        id: Uuid,
        full_name: &str,
        email: &str,
    ) -> anyhow::Result<Option<User>> {
        self.with(|t| {
            if t.users.iter().any(|u| u.id != id && u.email == email) {
                return Err(duplicate("email"));
            }
            Ok(t.users.iter_mut().find(|u| u.id == id).map(|u| {
                u.full_name = full_name.to_string();
                u.email = email.to_string();
                u.updated_at = OffsetDateTime::now_utc();
                u.clone()
            }))
        })?
    }

    async fn set_avatar(&self, id: Uuid, url: &str) -> anyhow::Result<Option<User>> {
        self.with(|t| {
            t.users.iter_mut().find(|u| u.id == id).map(|u| {
                u.avatar = url.to_string();
                u.updated_at = OffsetDateTime::now_utc();
                u.clone()
            })
        })
    }

    async fn set_cover_img(&self, id: Uuid, url: &str) -> anyhow::Result<Option<User>> {
        self.with(|t| {
            t.users.iter_mut().find(|u| u.id == id).map(|u| {
                u.cover_img = Some(url.to_string());
                u.updated_at = OffsetDateTime::now_utc();
                u.clone()
            })
        })
    }

    async fn record_watch(&self, id: Uuid, video_id: Uuid) -> anyhow::Result<()> {
        self.with(|t| {
            let history = t.watch_history.entry(id).or_default();
            history.retain(|v| *v != video_id);
            history.insert(0, video_id);
        })
    }

    async fn watch_history(&self, id: Uuid) -> anyhow::Result<Vec<Uuid>> {
        self.with(|t| t.watch_history.get(&id).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl VideoRepo for MemoryStore {
    async fn create(&self, new: NewVideo) -> anyhow::Result<Video> {
        self.with(|t| {
            let now = OffsetDateTime::now_utc();
            let video = Video {
                id: Uuid::new_v4(),
                owner_id: new.owner_id,
                video_file: new.video_file,
                thumbnail: new.thumbnail,
                title: new.title,
                description: new.description,
                duration: new.duration,
                views: 0,
                is_published: true,
                created_at: now,
                updated_at: now,
            };
            t.videos.push(video.clone());
            video
        })
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Video>> {
        self.with(|t| t.videos.iter().find(|v| v.id == id).cloned())
    }

    async fn find_many(&self, ids: &[Uuid]) -> anyhow::Result<Vec<Video>> {
        self.with(|t| {
            t.videos
                .iter()
                .filter(|v| ids.contains(&v.id))
                .cloned()
                .collect()
        })
    }

    async fn list(&self, filter: &VideoFilter) -> anyhow::Result<Vec<Video>> {
        self.with(|t| {
            let needle = filter.query.as_ref().map(|q| q.to_lowercase());
            let mut rows: Vec<Video> = t
                .videos
                .iter()
                .filter(|v| v.is_published || Some(v.owner_id) == filter.viewer_id)
                .filter(|v| filter.owner_id.map_or(true, |o| v.owner_id == o))
                .filter(|v| {
                    needle.as_ref().map_or(true, |n| {
                        v.title.to_lowercase().contains(n)
                            || v.description.to_lowercase().contains(n)
                    })
                })
                .cloned()
                .collect();
            // stable: ties keep insertion order
            match filter.sort {
                VideoSort::CreatedAt => rows.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
                VideoSort::Views => rows.sort_by(|a, b| a.views.cmp(&b.views)),
                VideoSort::Duration => rows.sort_by(|a, b| a.duration.total_cmp(&b.duration)),
                VideoSort::Title => rows.sort_by(|a, b| a.title.cmp(&b.title)),
            }
            if filter.descending {
                rows.reverse();
            }
            rows.into_iter()
                .skip(filter.offset.max(0) as usize)
                .take(filter.limit.max(0) as usize)
                .collect()
        })
    }

    async fn update(&self, id: Uuid, patch: &VideoPatch) -> anyhow::Result<Option<Video>> {
        self.with(|t| {
            t.videos.iter_mut().find(|v| v.id == id).map(|v| {
                if let Some(title) = &patch.title {
                    v.title = title.clone();
                }
                if let Some(description) = &patch.description {
                    v.description = description.clone();
                }
                if let Some(thumbnail) = &patch.thumbnail {
                    v.thumbnail = thumbnail.clone();
                }
                v.updated_at = OffsetDateTime::now_utc();
                v.clone()
            })
        })
    }

    async fn set_published(&self, id: Uuid, published: bool) -> anyhow::Result<Option<Video>> {
        self.with(|t| {
            t.videos.iter_mut().find(|v| v.id == id).map(|v| {
                v.is_published = published;
                v.updated_at = OffsetDateTime::now_utc();
                v.clone()
            })
        })
    }

    async fn increment_views(&self, id: Uuid) -> anyhow::Result<()> {
        self.with(|t| {
            if let Some(v) = t.videos.iter_mut().find(|v| v.id == id) {
                v.views += 1;
            }
        })
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        self.with(|t| {
            let before = t.videos.len();
            t.videos.retain(|v| v.id != id);
            for history in t.watch_history.values_mut() {
                history.retain(|v| *v != id);
            }
            t.videos.len() != before
        })
    }
}

#[async_trait]
impl TweetRepo for MemoryStore {
    async fn create(&self, owner_id: Uuid, content: &str) -> anyhow::Result<Tweet> {
        self.with(|t| {
            let now = OffsetDateTime::now_utc();
            let tweet = Tweet {
                id: Uuid::new_v4(),
                owner_id,
                content: content.to_string(),
                created_at: now,
                updated_at: now,
            };
            t.tweets.push(tweet.clone());
            tweet
        })
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Tweet>> {
        self.with(|t| t.tweets.iter().find(|tw| tw.id == id).cloned())
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> anyhow::Result<Vec<Tweet>> {
        self.with(|t| {
            t.tweets
                .iter()
                .rev()
                .filter(|tw| tw.owner_id == owner_id)
                .cloned()
                .collect()
        })
    }

    async fn update_content(&self, id: Uuid, content: &str) -> anyhow::Result<Option<Tweet>> {
        self.with(|t| {
            t.tweets.iter_mut().find(|tw| tw.id == id).map(|tw| {
                tw.content = content.to_string();
                tw.updated_at = OffsetDateTime::now_utc();
                tw.clone()
            })
        })
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        self.with(|t| {
            let before = t.tweets.len();
            t.tweets.retain(|tw| tw.id != id);
            t.tweets.len() != before
        })
    }
}

#[async_trait]
impl SubscriptionRepo for MemoryStore {
    async fn find_pair(
        &self,
        subscriber_id: Uuid,
        channel_id: Uuid,
    ) -> anyhow::Result<Option<Subscription>> {
        self.with(|t| {
            t.subscriptions
                .iter()
                .find(|s| s.subscriber_id == subscriber_id && s.channel_id == channel_id)
                .cloned()
        })
    }

    async fn create(&self, subscriber_id: Uuid, channel_id: Uuid) -> anyhow::Result<Subscription> {
        self.with(|t| {
            if t
                .subscriptions
                .iter()
                .any(|s| s.subscriber_id == subscriber_id && s.channel_id == channel_id)
            {
                return Err(duplicate("subscription"));
            }
            let sub = Subscription {
                id: Uuid::new_v4(),
                subscriber_id,
                channel_id,
                created_at: OffsetDateTime::now_utc(),
            };
            t.subscriptions.push(sub.clone());
            Ok(sub)
        })?
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        self.with(|t| {
            let before = t.subscriptions.len();
            t.subscriptions.retain(|s| s.id != id);
            t.subscriptions.len() != before
        })
    }

    async fn count_subscribers(&self, channel_id: Uuid) -> anyhow::Result<i64> {
        self.with(|t| {
            t.subscriptions
                .iter()
                .filter(|s| s.channel_id == channel_id)
                .count() as i64
        })
    }

    async fn count_subscribed_to(&self, subscriber_id: Uuid) -> anyhow::Result<i64> {
        self.with(|t| {
            t.subscriptions
                .iter()
                .filter(|s| s.subscriber_id == subscriber_id)
                .count() as i64
        })
    }

    async fn list_by_channel(&self, channel_id: Uuid) -> anyhow::Result<Vec<Subscription>> {
        self.with(|t| {
            t.subscriptions
                .iter()
                .rev()
                .filter(|s| s.channel_id == channel_id)
                .cloned()
                .collect()
        })
    }

    async fn list_by_subscriber(&self, subscriber_id: Uuid) -> anyhow::Result<Vec<Subscription>> {
        self.with(|t| {
            t.subscriptions
                .iter()
                .rev()
                .filter(|s| s.subscriber_id == subscriber_id)
                .cloned()
                .collect()
        })
    }
}

#[async_trait]
impl LikeRepo for MemoryStore {
    async fn find(&self, user_id: Uuid, target: LikeTarget) -> anyhow::Result<Option<Like>> {
        self.with(|t| {
            t.likes
                .iter()
                .find(|l| l.liked_by == user_id && l.target() == Some(target))
                .cloned()
        })
    }

    async fn create(&self, user_id: Uuid, target: LikeTarget) -> anyhow::Result<Like> {
        self.with(|t| {
            if t
                .likes
                .iter()
                .any(|l| l.liked_by == user_id && l.target() == Some(target))
            {
                return Err(duplicate("like"));
            }
            let (video_id, tweet_id) = match target {
                LikeTarget::Video(id) => (Some(id), None),
                LikeTarget::Tweet(id) => (None, Some(id)),
            };
            let like = Like {
                id: Uuid::new_v4(),
                liked_by: user_id,
                video_id,
                tweet_id,
                created_at: OffsetDateTime::now_utc(),
            };
            t.likes.push(like.clone());
            Ok(like)
        })?
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        self.with(|t| {
            let before = t.likes.len();
            t.likes.retain(|l| l.id != id);
            t.likes.len() != before
        })
    }

    async fn count(&self, target: LikeTarget) -> anyhow::Result<i64> {
        self.with(|t| {
            t.likes
                .iter()
                .filter(|l| l.target() == Some(target))
                .count() as i64
        })
    }

    async fn list_video_likes(&self, user_id: Uuid) -> anyhow::Result<Vec<Like>> {
        self.with(|t| {
            t.likes
                .iter()
                .rev()
                .filter(|l| l.liked_by == user_id && l.video_id.is_some())
                .cloned()
                .collect()
        })
    }

    async fn delete_for_target(&self, target: LikeTarget) -> anyhow::Result<u64> {
        self.with(|t| {
            let before = t.likes.len();
            t.likes.retain(|l| l.target() != Some(target));
            (before - t.likes.len()) as u64
        })
    }
}

/// Media host keeping objects in memory. Clones share the same objects.
#[derive(Clone, Default)]
pub struct FakeStorage {
    objects: Arc<Mutex<HashMap<String, Bytes>>>,
    fail_for: Option<&'static str>,
}

impl FakeStorage {
    /// Uploads whose key contains `fragment` fail.
    pub fn failing_for(fragment: &'static str) -> Self {
        Self {
            fail_for: Some(fragment),
            ..Self::default()
        }
    }

    pub fn object_count(&self) -> usize {
        self.objects.lock().map(|o| o.len()).unwrap_or(0)
    }

    pub fn contains_url(&self, url: &str) -> bool {
        strip_public_prefix(FAKE_MEDIA_URL, url)
            .map(|key| self.objects.lock().map(|o| o.contains_key(&key)).unwrap_or(false))
            .unwrap_or(false)
    }
}

#[async_trait]
impl StorageClient for FakeStorage {
    async fn put_object(&self, key: &str, body: Bytes, _ct: &str) -> anyhow::Result<String> {
        if self.fail_for.is_some_and(|f| key.contains(f)) {
            anyhow::bail!("media host rejected {key}");
        }
        self.objects
            .lock()
            .map_err(|_| anyhow::anyhow!("fake storage poisoned"))?
            .insert(key.to_string(), body);
        Ok(format!("{FAKE_MEDIA_URL}/{key}"))
    }

    async fn delete_object(&self, key: &str) -> anyhow::Result<()> {
        self.objects
            .lock()
            .map_err(|_| anyhow::anyhow!("fake storage poisoned"))?
            .remove(key);
        Ok(())
    }

    fn key_from_url(&self, url: &str) -> Option<String> {
        strip_public_prefix(FAKE_MEDIA_URL, url)
    }
}
