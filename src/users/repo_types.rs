use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database. Never serialized directly: responses use
/// the views in `users::dto`.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,              // lower-cased, unique
    pub email: String,                 // lower-cased, unique
    pub full_name: String,
    pub password_hash: String,         // argon2 PHC string
    pub avatar: String,                // media URL
    pub cover_img: Option<String>,     // media URL
    pub refresh_token: Option<String>, // current session, if any
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub avatar: String,
    pub cover_img: Option<String>,
}
