use axum::extract::FromRef;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{
    dto::{ChangePasswordRequest, LoginRequest, RegisterForm, Session},
    jwt::JwtKeys,
    password::{hash_password, verify_dummy, verify_password, MIN_PASSWORD_LEN},
};
use crate::{
    error::{ApiError, ApiResult},
    media::services::{self as media, MediaKind},
    state::AppState,
    users::{dto::UserView, repo_types::NewUser},
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Usernames never contain `@`, so login can route on it unambiguously.
pub(crate) fn is_valid_username(username: &str) -> bool {
    lazy_static! {
        static ref USERNAME_RE: Regex = Regex::new(r"^[a-z0-9._-]+$").unwrap();
    }
    USERNAME_RE.is_match(username)
}

const INVALID_CREDENTIALS: &str = "Invalid user credentials";

fn normalized(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
}

/// Registers a user: validates the form, rejects taken identities, pushes
/// the images to the media host and stores the record.
pub async fn register(st: &AppState, form: RegisterForm) -> ApiResult<UserView> {
    let mut errors = Vec::new();
    let username = normalized(form.username);
    let email = normalized(form.email);
    let full_name = form
        .full_name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());
    match &username {
        None => errors.push("username is required".to_string()),
        Some(u) if !is_valid_username(u) => errors.push(
            "username may only contain letters, digits, '.', '_' and '-'".to_string(),
        ),
        _ => {}
    }
    match &email {
        None => errors.push("email is required".to_string()),
        Some(e) if !is_valid_email(e) => errors.push("email is invalid".to_string()),
        _ => {}
    }
    if full_name.is_none() {
        errors.push("fullName is required".to_string());
    }
    match &form.password {
        None => errors.push("password is required".to_string()),
        Some(p) if p.chars().count() < MIN_PASSWORD_LEN => errors.push(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )),
        _ => {}
    }
    let (Some(username), Some(email), Some(full_name), Some(password)) =
        (username, email, full_name, form.password)
    else {
        return Err(ApiError::Validation(errors));
    };
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    if st
        .users
        .find_by_username_or_email(&username, &email)
        .await?
        .is_some()
    {
        warn!(%username, %email, "registration conflict");
        return Err(ApiError::Conflict(
            "User with this email or username already exists".into(),
        ));
    }

    let password_hash = hash_password(&password)?;

    let avatar = form
        .avatar
        .ok_or_else(|| ApiError::BadRequest("Avatar file is required".into()))?;

    // objects are keyed per registration attempt until the user id exists
    let upload_owner = Uuid::new_v4();
    let avatar_url = media::upload(st, MediaKind::Avatar, upload_owner, avatar)
        .await
        .map_err(|e| {
            error!(error = %e, "avatar upload failed");
            ApiError::Internal("Failed to upload avatar".into())
        })?;

    let cover_url = match form.cover_img {
        Some(cover) => match media::upload(st, MediaKind::CoverImage, upload_owner, cover).await {
            Ok(url) => Some(url),
            Err(e) => {
                error!(error = %e, "cover image upload failed");
                media::remove(st, &avatar_url).await;
                return Err(ApiError::Internal("Failed to upload cover image".into()));
            }
        },
        None => None,
    };

    let created = st
        .users
        .create(NewUser {
            username,
            email,
            full_name,
            password_hash,
            avatar: avatar_url.clone(),
            cover_img: cover_url.clone(),
        })
        .await;
    let user = match created {
        Ok(user) => user,
        Err(e) => {
            media::remove(st, &avatar_url).await;
            if let Some(cover_url) = &cover_url {
                media::remove(st, cover_url).await;
            }
            return Err(e.into());
        }
    };

    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok(UserView::from(user))
}

/// Mints a token pair and makes its refresh token the user's only valid one.
/// Nothing is returned unless both tokens were signed and persisted.
pub async fn issue_session(st: &AppState, user_id: Uuid) -> ApiResult<Session> {
    let keys = JwtKeys::from_ref(st);
    let access_token = keys.sign_access(user_id).map_err(|e| {
        error!(error = %e, "jwt sign access failed");
        ApiError::Internal("Failed to generate tokens".into())
    })?;
    let refresh_token = keys.sign_refresh(user_id).map_err(|e| {
        error!(error = %e, "jwt sign refresh failed");
        ApiError::Internal("Failed to generate tokens".into())
    })?;

    st.users
        .set_refresh_token(user_id, Some(&refresh_token))
        .await?;

    Ok(Session {
        access_token,
        refresh_token,
    })
}

pub async fn login(st: &AppState, req: LoginRequest) -> ApiResult<(UserView, Session)> {
    let identifier = req.username_or_email.trim().to_lowercase();
    if identifier.is_empty() || req.password.is_empty() {
        return Err(ApiError::BadRequest(
            "usernameOrEmail and password are required".into(),
        ));
    }

    let found = if identifier.contains('@') {
        st.users.find_by_email(&identifier).await?
    } else {
        st.users.find_by_username(&identifier).await?
    };

    let Some(user) = found else {
        verify_dummy(&req.password);
        warn!(%identifier, "login unknown user");
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.into()));
    };

    if !verify_password(&req.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.into()));
    }

    let session = issue_session(st, user.id).await?;
    info!(user_id = %user.id, "user logged in");
    Ok((UserView::from(user), session))
}

/// Rotates a session: the presented refresh token must verify and must equal
/// the one currently stored for its subject, so a token that was already
/// rotated away (or logged out) is refused.
pub async fn refresh_session(st: &AppState, presented: Option<String>) -> ApiResult<Session> {
    let token = presented
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("Unauthorized request".into()))?;

    let keys = JwtKeys::from_ref(st);
    let claims = keys.verify_refresh(&token).map_err(|e| {
        warn!(error = %e, "refresh token rejected");
        ApiError::Unauthorized(e.to_string())
    })?;

    let user = st
        .users
        .find_by_id(claims.sub)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid refresh token".into()))?;

    if user.refresh_token.as_deref() != Some(token.as_str()) {
        warn!(user_id = %user.id, "stale refresh token presented");
        return Err(ApiError::Unauthorized(
            "Refresh token is expired or used".into(),
        ));
    }

    let session = issue_session(st, user.id).await?;
    info!(user_id = %user.id, "session rotated");
    Ok(session)
}

pub async fn logout(st: &AppState, user_id: Uuid) -> ApiResult<()> {
    st.users.set_refresh_token(user_id, None).await?;
    info!(%user_id, "user logged out");
    Ok(())
}

pub async fn change_password(
    st: &AppState,
    user_id: Uuid,
    req: ChangePasswordRequest,
) -> ApiResult<()> {
    if req.old_password.is_empty() || req.new_password.is_empty() {
        return Err(ApiError::BadRequest(
            "oldPassword and newPassword are required".into(),
        ));
    }
    if req.new_password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::BadRequest(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let user = st
        .users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    if !verify_password(&req.old_password, &user.password_hash)? {
        warn!(%user_id, "change password with wrong old password");
        return Err(ApiError::BadRequest("Invalid old password".into()));
    }

    let hash = hash_password(&req.new_password)?;
    st.users.set_password_hash(user_id, &hash).await?;
    info!(%user_id, "password changed");
    Ok(())
}
