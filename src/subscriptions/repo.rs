use anyhow::Context;
use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// Directed edge subscriber -> channel. At most one per ordered pair.
#[derive(Debug, Clone, FromRow)]
pub struct Subscription {
    pub id: Uuid,
    pub subscriber_id: Uuid,
    pub channel_id: Uuid,
    pub created_at: OffsetDateTime,
}

#[async_trait]
pub trait SubscriptionRepo: Send + Sync {
    async fn find_pair(
        &self,
        subscriber_id: Uuid,
        channel_id: Uuid,
    ) -> anyhow::Result<Option<Subscription>>;
    async fn create(&self, subscriber_id: Uuid, channel_id: Uuid) -> anyhow::Result<Subscription>;
    async fn delete(&self, id: Uuid) -> anyhow::Result<bool>;
    async fn count_subscribers(&self, channel_id: Uuid) -> anyhow::Result<i64>;
    async fn count_subscribed_to(&self, subscriber_id: Uuid) -> anyhow::Result<i64>;
    /// Newest first.
    async fn list_by_channel(&self, channel_id: Uuid) -> anyhow::Result<Vec<Subscription>>;
    /// Newest first.
    async fn list_by_subscriber(&self, subscriber_id: Uuid) -> anyhow::Result<Vec<Subscription>>;
}

pub struct PgSubscriptionRepo {
    db: PgPool,
}

impl PgSubscriptionRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SubscriptionRepo for PgSubscriptionRepo {
    async fn find_pair(
        &self,
        subscriber_id: Uuid,
        channel_id: Uuid,
    ) -> anyhow::Result<Option<Subscription>> {
        let sub = sqlx::query_as::<_, Subscription>(
            r#"
            SELECT id, subscriber_id, channel_id, created_at
              FROM subscriptions
             WHERE subscriber_id = $1 AND channel_id = $2
            "#,
        )
        .bind(subscriber_id)
        .bind(channel_id)
        .fetch_optional(&self.db)
        .await
        .context("find subscription")?;
        Ok(sub)
    }

    async fn create(&self, subscriber_id: Uuid, channel_id: Uuid) -> anyhow::Result<Subscription> {
        let sub = sqlx::query_as::<_, Subscription>(
            r#"
            INSERT INTO subscriptions (id, subscriber_id, channel_id)
            VALUES ($1, $2, $3)
            RETURNING id, subscriber_id, channel_id, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(subscriber_id)
        .bind(channel_id)
        .fetch_one(&self.db)
        .await
        .context("insert subscription")?;
        Ok(sub)
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM subscriptions WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete subscription")?;
        Ok(res.rows_affected() > 0)
    }

    async fn count_subscribers(&self, channel_id: Uuid) -> anyhow::Result<i64> {
        let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM subscriptions WHERE channel_id = $1")
            .bind(channel_id)
            .fetch_one(&self.db)
            .await
            .context("count subscribers")?;
        Ok(n)
    }

    async fn count_subscribed_to(&self, subscriber_id: Uuid) -> anyhow::Result<i64> {
        let (n,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM subscriptions WHERE subscriber_id = $1")
                .bind(subscriber_id)
                .fetch_one(&self.db)
                .await
                .context("count subscribed channels")?;
        Ok(n)
    }

    async fn list_by_channel(&self, channel_id: Uuid) -> anyhow::Result<Vec<Subscription>> {
        let subs = sqlx::query_as::<_, Subscription>(
            r#"
            SELECT id, subscriber_id, channel_id, created_at
              FROM subscriptions
             WHERE channel_id = $1
             ORDER BY created_at DESC
            "#,
        )
        .bind(channel_id)
        .fetch_all(&self.db)
        .await
        .context("list subscribers")?;
        Ok(subs)
    }

    async fn list_by_subscriber(&self, subscriber_id: Uuid) -> anyhow::Result<Vec<Subscription>> {
        let subs = sqlx::query_as::<_, Subscription>(
            r#"
            SELECT id, subscriber_id, channel_id, created_at
              FROM subscriptions
             WHERE subscriber_id = $1
             ORDER BY created_at DESC
            "#,
        )
        .bind(subscriber_id)
        .fetch_all(&self.db)
        .await
        .context("list subscribed channels")?;
        Ok(subs)
    }
}
