use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use tracing::warn;

use super::{
    cookies::{get_cookie, ACCESS_COOKIE},
    jwt::JwtKeys,
};
use crate::{error::ApiError, state::AppState, users::dto::UserView};

/// Identity resolved from a valid access token.
///
/// Reads the `accessToken` cookie, falling back to `Authorization: Bearer`.
/// The token must verify against the access secret and its subject must
/// still exist. The gate only reads; it never writes to the store.
#[derive(Debug, Clone)]
pub struct AuthUser(pub UserView);

fn access_token(parts: &Parts) -> Option<String> {
    get_cookie(&parts.headers, ACCESS_COOKIE).or_else(|| {
        parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer ").or_else(|| v.strip_prefix("bearer ")))
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    })
}

async fn resolve(state: &AppState, token: &str) -> Result<UserView, ApiError> {
    let keys = JwtKeys::from_ref(state);
    let claims = keys.verify_access(token).map_err(|e| {
        warn!(error = %e, "invalid access token");
        ApiError::Unauthorized("Invalid or expired access token".into())
    })?;

    let user = state
        .users
        .find_by_id(claims.sub)
        .await?
        .ok_or_else(|| {
            warn!(user_id = %claims.sub, "access token for unknown user");
            ApiError::Unauthorized("Invalid access token".into())
        })?;
    Ok(UserView::from(user))
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = access_token(parts)
            .ok_or_else(|| ApiError::Unauthorized("Unauthorized request".into()))?;
        Ok(AuthUser(resolve(state, &token).await?))
    }
}

/// Like [`AuthUser`] for routes open to anonymous callers: no token means
/// `None`, but a token that is present must be valid.
#[derive(Debug, Clone)]
pub struct OptionalAuthUser(pub Option<UserView>);

#[async_trait]
impl FromRequestParts<AppState> for OptionalAuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match access_token(parts) {
            Some(token) => Ok(OptionalAuthUser(Some(resolve(state, &token).await?))),
            None => Ok(OptionalAuthUser(None)),
        }
    }
}
