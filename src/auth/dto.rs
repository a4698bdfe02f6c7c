use serde::{Deserialize, Serialize};

use crate::{
    extract::MultipartForm, media::services::UploadItem, users::dto::UserView,
};

/// Multipart registration form.
#[derive(Debug, Default)]
pub struct RegisterForm {
    pub username: Option<String>,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub password: Option<String>,
    pub avatar: Option<UploadItem>,
    pub cover_img: Option<UploadItem>,
}

impl RegisterForm {
    pub fn from_multipart(mut form: MultipartForm) -> Self {
        Self {
            username: form.text("username"),
            email: form.text("email"),
            full_name: form.text("fullName"),
            password: form.raw("password"),
            avatar: form.take_file("avatar"),
            cover_img: form.take_file("coverImg"),
        }
    }
}

/// Request body for login. An identifier containing `@` is an email.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(default)]
    pub username_or_email: String,
    #[serde(default)]
    pub password: String,
}

/// Request body for token refresh; the cookie takes precedence.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub old_password: String,
    #[serde(default)]
    pub new_password: String,
}

/// A freshly issued token pair.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
}

/// Response returned after login.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: UserView,
    #[serde(flatten)]
    pub session: Session,
}
