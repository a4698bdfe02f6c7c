use anyhow::Context;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::repo_types::{NewVideo, Video, VideoFilter, VideoPatch};

#[async_trait]
pub trait VideoRepo: Send + Sync {
    async fn create(&self, new: NewVideo) -> anyhow::Result<Video>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Video>>;
    async fn find_many(&self, ids: &[Uuid]) -> anyhow::Result<Vec<Video>>;
    async fn list(&self, filter: &VideoFilter) -> anyhow::Result<Vec<Video>>;
    async fn update(&self, id: Uuid, patch: &VideoPatch) -> anyhow::Result<Option<Video>>;
    async fn set_published(&self, id: Uuid, published: bool) -> anyhow::Result<Option<Video>>;
    async fn increment_views(&self, id: Uuid) -> anyhow::Result<()>;
    async fn delete(&self, id: Uuid) -> anyhow::Result<bool>;
}

pub struct PgVideoRepo {
    db: PgPool,
}

impl PgVideoRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

const VIDEO_COLUMNS: &str = "id, owner_id, video_file, thumbnail, title, description, duration, \
                             views, is_published, created_at, updated_at";

#[async_trait]
impl VideoRepo for PgVideoRepo {
    async fn create(&self, new: NewVideo) -> anyhow::Result<Video> {
        let video = sqlx::query_as::<_, Video>(&format!(
            r#"
            INSERT INTO videos (id, owner_id, video_file, thumbnail, title, description, duration)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {VIDEO_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(new.owner_id)
        .bind(&new.video_file)
        .bind(&new.thumbnail)
        .bind(&new.title)
        .bind(&new.description)
        .bind(new.duration)
        .fetch_one(&self.db)
        .await
        .context("insert video")?;
        Ok(video)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Video>> {
        let video = sqlx::query_as::<_, Video>(&format!(
            "SELECT {VIDEO_COLUMNS} FROM videos WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find video by id")?;
        Ok(video)
    }

    async fn find_many(&self, ids: &[Uuid]) -> anyhow::Result<Vec<Video>> {
        let videos = sqlx::query_as::<_, Video>(&format!(
            "SELECT {VIDEO_COLUMNS} FROM videos WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(&self.db)
        .await
        .context("find videos by ids")?;
        Ok(videos)
    }

    async fn list(&self, filter: &VideoFilter) -> anyhow::Result<Vec<Video>> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {VIDEO_COLUMNS} FROM videos WHERE (is_published"));
        if let Some(viewer) = filter.viewer_id {
            qb.push(" OR owner_id = ").push_bind(viewer);
        }
        qb.push(")");
        if let Some(owner) = filter.owner_id {
            qb.push(" AND owner_id = ").push_bind(owner);
        }
        if let Some(q) = &filter.query {
            let pattern = format!("%{}%", q.replace('%', "\\%").replace('_', "\\_"));
            qb.push(" AND (title ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR description ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        // column names come from a closed enum
        qb.push(format!(
            " ORDER BY {} {}, id",
            filter.sort.column(),
            if filter.descending { "DESC" } else { "ASC" }
        ));
        qb.push(" LIMIT ").push_bind(filter.limit);
        qb.push(" OFFSET ").push_bind(filter.offset);

        let videos = qb
            .build_query_as::<Video>()
            .fetch_all(&self.db)
            .await
            .context("list videos")?;
        Ok(videos)
    }

    async fn update(&self, id: Uuid, patch: &VideoPatch) -> anyhow::Result<Option<Video>> {
        let video = sqlx::query_as::<_, Video>(&format!(
            r#"
            UPDATE videos
               SET title = COALESCE($2, title),
                   description = COALESCE($3, description),
                   thumbnail = COALESCE($4, thumbnail),
                   updated_at = now()
             WHERE id = $1
            RETURNING {VIDEO_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&patch.title)
        .bind(&patch.description)
        .bind(&patch.thumbnail)
        .fetch_optional(&self.db)
        .await
        .context("update video")?;
        Ok(video)
    }

    async fn set_published(&self, id: Uuid, published: bool) -> anyhow::Result<Option<Video>> {
        let video = sqlx::query_as::<_, Video>(&format!(
            "UPDATE videos SET is_published = $2, updated_at = now() WHERE id = $1 \
             RETURNING {VIDEO_COLUMNS}"
        ))
        .bind(id)
        .bind(published)
        .fetch_optional(&self.db)
        .await
        .context("set video published")?;
        Ok(video)
    }

    async fn increment_views(&self, id: Uuid) -> anyhow::Result<()> {
        sqlx::query("UPDATE videos SET views = views + 1 WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .context("increment video views")?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM videos WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete video")?;
        Ok(res.rows_affected() > 0)
    }
}
