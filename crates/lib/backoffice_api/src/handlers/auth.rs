//! Authentication request handlers.
//!
//! Tokens travel only in cookies. Login and refresh return the CSRF nonce in
//! the body, in the same response that sets the cookies.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, State};
use axum_extra::extract::cookie::CookieJar;
use backoffice_core::auth::session::IssuedSession;
use backoffice_core::models::auth::Identity;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{LoginRequest, MeResponse, OkResponse, SessionResponse};
use crate::services::cookies::REFRESH_COOKIE;

/// Attach both session cookies and build the body carrying the nonce.
fn bind_session(
    state: &AppState,
    jar: CookieJar,
    session: IssuedSession,
) -> (CookieJar, Json<SessionResponse>) {
    let jar = jar
        .add(state.cookies.access_cookie(&session.access_token))
        .add(state.cookies.refresh_cookie(&session.refresh_token));
    let body = SessionResponse {
        user: session.user.into(),
        csrf_token: session.csrf_nonce,
    };
    (jar, Json(body))
}

/// `POST /auth/login`: authenticate with email + password.
pub async fn login_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<(CookieJar, Json<SessionResponse>)> {
    let Json(body) = payload?;
    body.validate()?;
    let session = state.sessions.login(body.email.trim(), &body.password).await?;
    Ok(bind_session(&state, jar, session))
}

/// `POST /auth/refresh`: exchange the refresh cookie for a new session.
pub async fn refresh_handler(
    State(state): State<AppState>,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<SessionResponse>)> {
    let token = jar
        .get(REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or(AppError::Unauthenticated)?;
    let session = state.sessions.refresh(&token).await?;
    Ok(bind_session(&state, jar, session))
}

/// `POST /auth/logout`: revoke refresh tokens and clear cookies.
pub async fn logout_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<OkResponse>)> {
    state.sessions.logout(&identity).await?;
    let jar = jar
        .add(state.cookies.clear_access())
        .add(state.cookies.clear_refresh());
    Ok((jar, Json(OkResponse { ok: true })))
}

/// `GET /auth/me`: the caller, re-read from the store.
pub async fn me_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> AppResult<Json<MeResponse>> {
    let user = state.sessions.current_user(&identity).await?;
    Ok(Json(MeResponse { user: user.into() }))
}
