//! Request extractors for session authentication and client metadata

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{HeaderMap, StatusCode, header, request::Parts},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::AppState;
use crate::entities::users;
use crate::models::error::{ApiError, api_error, db_error};
use crate::services::sessions;

pub const SESSION_COOKIE: &str = "sessionid";

const UNKNOWN_CLIENT: &str = "unknown";

/// The logged-in user behind the request's session.
///
/// Rejects with 401 unless the request carries an active, unexpired session
/// key, either in the `sessionid` cookie or as `Authorization: Bearer <key>`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: users::Model,
    pub session_key: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session_key = session_key_from_headers(&parts.headers).ok_or_else(|| {
            api_error(StatusCode::UNAUTHORIZED, "Authentication required")
        })?;

        let ttl = state.config.session_ttl;
        let resolved = sessions::resolve_session(&state.db, &session_key, ttl)
            .await
            .map_err(db_error)?;

        match resolved {
            Some((user, _session)) => Ok(AuthUser { user, session_key }),
            None => Err(api_error(
                StatusCode::UNAUTHORIZED,
                "Session expired or invalid, please log in again",
            )),
        }
    }
}

/// Session key from the cookie, falling back to a bearer token
pub fn session_key_from_headers(headers: &HeaderMap) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        let value = cookie.value().trim();
        if !value.is_empty() {
            return Some(value.to_string());
        }
    }

    let auth_header = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = auth_header
        .strip_prefix("Bearer ")
        .or_else(|| auth_header.strip_prefix("bearer "))?
        .trim();

    (!token.is_empty()).then(|| token.to_string())
}

/// Client address and user agent, recorded on login
#[derive(Debug, Clone)]
pub struct ClientMeta {
    pub ip: String,
    pub user_agent: String,
}

impl<S> FromRequestParts<S> for ClientMeta
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());

        let user_agent = parts
            .headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        Ok(ClientMeta {
            ip: client_ip(&parts.headers, peer),
            user_agent,
        })
    }
}

/// First `X-Forwarded-For` hop when behind a proxy, else the socket peer
pub fn client_ip(headers: &HeaderMap, peer: Option<String>) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
        .or(peer)
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

pub fn session_cookie(session_key: &str, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, session_key.to_string()))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .build()
}

pub fn clear_session_cookie() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE).path("/").build()
}
