use axum::{
    extract::{DefaultBodyLimit, FromRef, Multipart, State},
    http::HeaderMap,
    response::{AppendHeaders, IntoResponse},
    routing::post,
    Router,
};
use tracing::instrument;

use super::{
    cookies::{cleared_cookies, get_cookie, session_cookies, REFRESH_COOKIE},
    dto::{ChangePasswordRequest, LoginRequest, LoginResponse, RefreshRequest, RegisterForm},
    extractors::AuthUser,
    jwt::JwtKeys,
    services,
};
use crate::{
    error::ApiResult,
    extract::{ApiJson, MultipartForm},
    response::ApiResponse,
    state::AppState,
};

pub fn auth_routes(state: &AppState) -> Router<AppState> {
    let upload_limit = state.config.upload_limit_mb * 1024 * 1024;
    Router::new()
        .route(
            "/users/register",
            post(register).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/users/login", post(login))
        .route("/users/logout", post(logout))
        .route("/users/refresh-token", post(refresh))
        .route("/users/change-password", post(change_password))
}

#[instrument(skip(state, mp))]
pub async fn register(
    State(state): State<AppState>,
    mp: Multipart,
) -> ApiResult<impl IntoResponse> {
    let form = RegisterForm::from_multipart(MultipartForm::read(mp).await?);
    let user = services::register(&state, form).await?;
    Ok(ApiResponse::created(user, "User registered successfully"))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let (user, session) = services::login(&state, payload).await?;
    let cookies = session_cookies(
        &JwtKeys::from_ref(&state),
        &session.access_token,
        &session.refresh_token,
        state.config.cookie_secure,
    );
    Ok((
        AppendHeaders(cookies),
        ApiResponse::ok(LoginResponse { user, session }, "User logged in successfully"),
    ))
}

#[instrument(skip(state, user))]
pub async fn logout(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<impl IntoResponse> {
    services::logout(&state, user.id).await?;
    Ok((
        AppendHeaders(cleared_cookies(state.config.cookie_secure)),
        ApiResponse::ok(serde_json::json!({}), "User logged out successfully"),
    ))
}

#[instrument(skip(state, headers, body))]
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Option<ApiJson<RefreshRequest>>,
) -> ApiResult<impl IntoResponse> {
    let presented = get_cookie(&headers, REFRESH_COOKIE)
        .or_else(|| body.and_then(|ApiJson(b)| b.refresh_token));
    let session = services::refresh_session(&state, presented).await?;
    let cookies = session_cookies(
        &JwtKeys::from_ref(&state),
        &session.access_token,
        &session.refresh_token,
        state.config.cookie_secure,
    );
    Ok((
        AppendHeaders(cookies),
        ApiResponse::ok(session, "Access token refreshed"),
    ))
}

#[instrument(skip(state, user, payload))]
pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(payload): ApiJson<ChangePasswordRequest>,
) -> ApiResult<impl IntoResponse> {
    services::change_password(&state, user.id, payload).await?;
    Ok(ApiResponse::ok(
        serde_json::json!({}),
        "Password changed successfully",
    ))
}
