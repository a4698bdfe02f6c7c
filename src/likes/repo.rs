use anyhow::Context;
use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// What a like points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeTarget {
    Video(Uuid),
    Tweet(Uuid),
}

impl LikeTarget {
    fn columns(self) -> (Option<Uuid>, Option<Uuid>) {
        match self {
            LikeTarget::Video(id) => (Some(id), None),
            LikeTarget::Tweet(id) => (None, Some(id)),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Like {
    pub id: Uuid,
    pub liked_by: Uuid,
    pub video_id: Option<Uuid>,
    pub tweet_id: Option<Uuid>,
    pub created_at: OffsetDateTime,
}

impl Like {
    pub fn target(&self) -> Option<LikeTarget> {
        match (self.video_id, self.tweet_id) {
            (Some(v), None) => Some(LikeTarget::Video(v)),
            (None, Some(t)) => Some(LikeTarget::Tweet(t)),
            _ => None,
        }
    }
}

#[async_trait]
pub trait LikeRepo: Send + Sync {
    async fn find(&self, user_id: Uuid, target: LikeTarget) -> anyhow::Result<Option<Like>>;
    async fn create(&self, user_id: Uuid, target: LikeTarget) -> anyhow::Result<Like>;
    async fn delete(&self, id: Uuid) -> anyhow::Result<bool>;
    async fn count(&self, target: LikeTarget) -> anyhow::Result<i64>;
    /// Video likes of a user, newest first.
    async fn list_video_likes(&self, user_id: Uuid) -> anyhow::Result<Vec<Like>>;
    async fn delete_for_target(&self, target: LikeTarget) -> anyhow::Result<u64>;
}

pub struct PgLikeRepo {
    db: PgPool,
}

impl PgLikeRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl LikeRepo for PgLikeRepo {
    async fn find(&self, user_id: Uuid, target: LikeTarget) -> anyhow::Result<Option<Like>> {
        let (video_id, tweet_id) = target.columns();
        let like = sqlx::query_as::<_, Like>(
            r#"
            SELECT id, liked_by, video_id, tweet_id, created_at
              FROM likes
             WHERE liked_by = $1
               AND video_id IS NOT DISTINCT FROM $2
               AND tweet_id IS NOT DISTINCT FROM $3
            "#,
        )
        .bind(user_id)
        .bind(video_id)
        .bind(tweet_id)
        .fetch_optional(&self.db)
        .await
        .context("find like")?;
        Ok(like)
    }

    async fn create(&self, user_id: Uuid, target: LikeTarget) -> anyhow::Result<Like> {
        let (video_id, tweet_id) = target.columns();
        let like = sqlx::query_as::<_, Like>(
            r#"
            INSERT INTO likes (id, liked_by, video_id, tweet_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, liked_by, video_id, tweet_id, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(video_id)
        .bind(tweet_id)
        .fetch_one(&self.db)
        .await
        .context("insert like")?;
        Ok(like)
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM likes WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete like")?;
        Ok(res.rows_affected() > 0)
    }

    async fn count(&self, target: LikeTarget) -> anyhow::Result<i64> {
        let (video_id, tweet_id) = target.columns();
        let (n,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM likes
             WHERE video_id IS NOT DISTINCT FROM $1
               AND tweet_id IS NOT DISTINCT FROM $2
            "#,
        )
        .bind(video_id)
        .bind(tweet_id)
        .fetch_one(&self.db)
        .await
        .context("count likes")?;
        Ok(n)
    }

    async fn list_video_likes(&self, user_id: Uuid) -> anyhow::Result<Vec<Like>> {
        let likes = sqlx::query_as::<_, Like>(
            r#"
            SELECT id, liked_by, video_id, tweet_id, created_at
              FROM likes
             WHERE liked_by = $1 AND video_id IS NOT NULL
             ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .context("list liked videos")?;
        Ok(likes)
    }

    async fn delete_for_target(&self, target: LikeTarget) -> anyhow::Result<u64> {
        let (video_id, tweet_id) = target.columns();
        let res = sqlx::query(
            r#"
            DELETE FROM likes
             WHERE video_id IS NOT DISTINCT FROM $1
               AND tweet_id IS NOT DISTINCT FROM $2
            "#,
        )
        .bind(video_id)
        .bind(tweet_id)
        .execute(&self.db)
        .await
        .context("delete likes for target")?;
        Ok(res.rows_affected())
    }
}
