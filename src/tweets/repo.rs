use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Tweet {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[async_trait]
pub trait TweetRepo: Send + Sync {
    async fn create(&self, owner_id: Uuid, content: &str) -> anyhow::Result<Tweet>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Tweet>>;
    /// Newest first.
    async fn list_by_owner(&self, owner_id: Uuid) -> anyhow::Result<Vec<Tweet>>;
    async fn update_content(&self, id: Uuid, content: &str) -> anyhow::Result<Option<Tweet>>;
    async fn delete(&self, id: Uuid) -> anyhow::Result<bool>;
}

pub struct PgTweetRepo {
    db: PgPool,
}

impl PgTweetRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TweetRepo for PgTweetRepo {
    async fn create(&self, owner_id: Uuid, content: &str) -> anyhow::Result<Tweet> {
        let tweet = sqlx::query_as::<_, Tweet>(
            r#"
            INSERT INTO tweets (id, owner_id, content)
            VALUES ($1, $2, $3)
            RETURNING id, owner_id, content, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(owner_id)
        .bind(content)
        .fetch_one(&self.db)
        .await
        .context("insert tweet")?;
        Ok(tweet)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Tweet>> {
        let tweet = sqlx::query_as::<_, Tweet>(
            "SELECT id, owner_id, content, created_at, updated_at FROM tweets WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find tweet by id")?;
        Ok(tweet)
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> anyhow::Result<Vec<Tweet>> {
        let tweets = sqlx::query_as::<_, Tweet>(
            r#"
            SELECT id, owner_id, content, created_at, updated_at
              FROM tweets
             WHERE owner_id = $1
             ORDER BY created_at DESC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.db)
        .await
        .context("list tweets by owner")?;
        Ok(tweets)
    }

    async fn update_content(&self, id: Uuid, content: &str) -> anyhow::Result<Option<Tweet>> {
        let tweet = sqlx::query_as::<_, Tweet>(
            r#"
            UPDATE tweets SET content = $2, updated_at = now()
            WHERE id = $1
            RETURNING id, owner_id, content, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(content)
        .fetch_optional(&self.db)
        .await
        .context("update tweet")?;
        Ok(tweet)
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM tweets WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete tweet")?;
        Ok(res.rows_affected() > 0)
    }
}
