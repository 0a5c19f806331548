use axum::{Json, extract::State, http::StatusCode};
use axum_extra::extract::cookie::CookieJar;

use crate::AppState;
use crate::auth::{AuthUser, ClientMeta, SESSION_COOKIE, clear_session_cookie, session_cookie};
use crate::models::account::{
    LoginRequest, MessageResponse, ProfileResponse, RegisterRequest, SessionResponse,
    UpdateProfileRequest,
};
use crate::models::error::{ApiError, db_error};
use crate::services::{accounts, sessions};

/// Sign up and log straight in
pub async fn register(
    State(state): State<AppState>,
    client: ClientMeta,
    jar: CookieJar,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, CookieJar, Json<SessionResponse>), ApiError> {
    let new_user = accounts::validate_registration(&payload)?;
    let account = accounts::create_user(&state.db, new_user, state.config.starting_balance).await?;

    let user = accounts::record_login(&state.db, account.user, &client.ip).await?;
    let session_key = sessions::new_session_key();
    sessions::open_session(&state.db, user.id, &session_key, &client.ip, &client.user_agent)
        .await
        .map_err(db_error)?;

    let jar = jar.add(session_cookie(&session_key, state.config.secure_cookies));

    Ok((
        StatusCode::CREATED,
        jar,
        Json(SessionResponse {
            message: format!("Welcome, {}! Your account has been created.", user.username),
            username: user.username,
            session_key,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    client: ClientMeta,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<(CookieJar, Json<SessionResponse>), ApiError> {
    let user = accounts::authenticate(&state.db, &payload.username, &payload.password).await?;

    // Keep the browser's key only if it already belongs to this user
    let presented = jar.get(SESSION_COOKIE).map(|c| c.value().to_string());
    let session_key = match presented {
        Some(key) => match sessions::find_by_key(&state.db, &key).await.map_err(db_error)? {
            Some(existing) if existing.user_id == user.id => key,
            _ => sessions::new_session_key(),
        },
        None => sessions::new_session_key(),
    };

    let user = accounts::record_login(&state.db, user, &client.ip).await?;
    sessions::open_session(&state.db, user.id, &session_key, &client.ip, &client.user_agent)
        .await
        .map_err(db_error)?;

    let jar = jar.add(session_cookie(&session_key, state.config.secure_cookies));

    Ok((
        jar,
        Json(SessionResponse {
            message: format!("Welcome back, {}!", user.username),
            username: user.username,
            session_key,
        }),
    ))
}

pub async fn logout(
    State(state): State<AppState>,
    auth: AuthUser,
    jar: CookieJar,
) -> Result<(CookieJar, Json<MessageResponse>), ApiError> {
    sessions::close_session(&state.db, auth.user.id, &auth.session_key)
        .await
        .map_err(db_error)?;

    Ok((
        jar.remove(clear_session_cookie()),
        Json(MessageResponse {
            message: "You have been logged out.".to_string(),
        }),
    ))
}

pub async fn get_profile(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ProfileResponse>, ApiError> {
    let (user, profile) = accounts::load_profile(&state.db, auth.user.id).await?;
    Ok(Json(ProfileResponse::new(user, profile)))
}

pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let (user, profile) = accounts::update_profile(&state.db, auth.user.id, payload).await?;
    tracing::info!("Profile updated for {}", user.username);
    Ok(Json(ProfileResponse::new(user, profile)))
}
