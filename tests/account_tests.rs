mod common;

use axum::http::{Method, StatusCode};
use chrono::{Duration, Utc};
use paper_trader::entities::{portfolios, prelude::*, user_profiles, user_sessions, users};
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set};
use serde_json::json;

use crate::common::{TEST_PASSWORD, build_test_app, decimal, register, send};

async fn user_id(state: &paper_trader::AppState, username: &str) -> i32 {
    Users::find()
        .filter(users::Column::Username.eq(username))
        .one(&state.db)
        .await
        .unwrap()
        .expect("user exists")
        .id
}

#[tokio::test]
async fn test_home() {
    let (app, _state) = build_test_app().await;
    let response = send(&app, Method::GET, "/", None, None).await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_register_creates_profile_and_portfolio() {
    let (app, state) = build_test_app().await;

    let response = send(
        &app,
        Method::POST,
        "/register",
        None,
        Some(json!({
            "username": "alice",
            "password1": TEST_PASSWORD,
            "password2": TEST_PASSWORD,
            "email": "alice@example.com",
        })),
    )
    .await;

    assert_eq!(response.status, StatusCode::CREATED);
    let session_key = response.body["session_key"].as_str().unwrap();
    assert_eq!(response.session_cookie().as_deref(), Some(session_key));

    let id = user_id(&state, "alice").await;

    let profiles = UserProfiles::find()
        .filter(user_profiles::Column::UserId.eq(id))
        .all(&state.db)
        .await
        .unwrap();
    assert_eq!(profiles.len(), 1);
    assert_eq!(profiles[0].account_balance, dec!(10000));

    let portfolios = Portfolios::find()
        .filter(portfolios::Column::UserId.eq(id))
        .all(&state.db)
        .await
        .unwrap();
    assert_eq!(portfolios.len(), 1);
    assert_eq!(portfolios[0].name, "My Portfolio");

    // Registration logs the user in
    let profile = send(&app, Method::GET, "/profile", Some(session_key), None).await;
    assert_eq!(profile.status, StatusCode::OK);
    assert_eq!(profile.body["username"], "alice");
    assert_eq!(decimal(&profile.body["account_balance"]), dec!(10000));
    assert!(profile.body.get("password_hash").is_none());
}

#[tokio::test]
async fn test_register_duplicate_username() {
    let (app, state) = build_test_app().await;
    register(&app, "bob").await;

    let response = send(
        &app,
        Method::POST,
        "/register",
        None,
        Some(json!({
            "username": "bob",
            "password1": TEST_PASSWORD,
            "password2": TEST_PASSWORD,
        })),
    )
    .await;

    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(Users::find().count(&state.db).await.unwrap(), 1);
    assert_eq!(UserProfiles::find().count(&state.db).await.unwrap(), 1);
}

#[tokio::test]
async fn test_register_rejects_bad_input() {
    let (app, state) = build_test_app().await;

    let mismatch = send(
        &app,
        Method::POST,
        "/register",
        None,
        Some(json!({
            "username": "carol",
            "password1": TEST_PASSWORD,
            "password2": "something-else-42",
        })),
    )
    .await;
    assert_eq!(mismatch.status, StatusCode::BAD_REQUEST);
    assert!(mismatch.body["error"].as_str().unwrap().contains("didn't match"));

    let bad_username = send(
        &app,
        Method::POST,
        "/register",
        None,
        Some(json!({
            "username": "carol smith",
            "password1": TEST_PASSWORD,
            "password2": TEST_PASSWORD,
        })),
    )
    .await;
    assert_eq!(bad_username.status, StatusCode::BAD_REQUEST);

    assert_eq!(Users::find().count(&state.db).await.unwrap(), 0);
}

#[tokio::test]
async fn test_login_with_same_key_updates_session() {
    let (app, state) = build_test_app().await;
    let session_key = register(&app, "dave").await;
    let id = user_id(&state, "dave").await;

    for _ in 0..2 {
        let response = send(
            &app,
            Method::POST,
            "/login",
            Some(&session_key),
            Some(json!({ "username": "dave", "password": TEST_PASSWORD })),
        )
        .await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body["session_key"], session_key.as_str());
    }

    let sessions = UserSessions::find()
        .filter(user_sessions::Column::UserId.eq(id))
        .all(&state.db)
        .await
        .unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].session_key, session_key);
    assert!(sessions[0].is_active);
    assert_eq!(sessions[0].user_agent, "integration-test");

    // A login without a cookie opens a second session
    let fresh = send(
        &app,
        Method::POST,
        "/login",
        None,
        Some(json!({ "username": "dave", "password": TEST_PASSWORD })),
    )
    .await;
    assert_eq!(fresh.status, StatusCode::OK);
    assert_ne!(fresh.body["session_key"], session_key.as_str());
    assert_eq!(
        UserSessions::find()
            .filter(user_sessions::Column::UserId.eq(id))
            .count(&state.db)
            .await
            .unwrap(),
        2
    );

    let user = Users::find_by_id(id).one(&state.db).await.unwrap().unwrap();
    assert!(user.last_login.is_some());
}

#[tokio::test]
async fn test_login_does_not_adopt_foreign_session_key() {
    let (app, _state) = build_test_app().await;
    let erin_key = register(&app, "erin").await;
    register(&app, "frank").await;

    let response = send(
        &app,
        Method::POST,
        "/login",
        Some(&erin_key),
        Some(json!({ "username": "frank", "password": TEST_PASSWORD })),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_ne!(response.body["session_key"], erin_key.as_str());

    // Erin's session is untouched
    let profile = send(&app, Method::GET, "/profile", Some(&erin_key), None).await;
    assert_eq!(profile.body["username"], "erin");
}

#[tokio::test]
async fn test_login_rejects_bad_credentials() {
    let (app, _state) = build_test_app().await;
    register(&app, "gina").await;

    let wrong_password = send(
        &app,
        Method::POST,
        "/login",
        None,
        Some(json!({ "username": "gina", "password": "not-the-password" })),
    )
    .await;
    assert_eq!(wrong_password.status, StatusCode::UNAUTHORIZED);
    assert!(wrong_password.session_cookie().is_none());

    let unknown_user = send(
        &app,
        Method::POST,
        "/login",
        None,
        Some(json!({ "username": "nobody", "password": TEST_PASSWORD })),
    )
    .await;
    assert_eq!(unknown_user.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_deactivates_session() {
    let (app, state) = build_test_app().await;
    let session_key = register(&app, "hank").await;

    let response = send(&app, Method::POST, "/logout", Some(&session_key), None).await;
    assert_eq!(response.status, StatusCode::OK);

    let session = UserSessions::find()
        .filter(user_sessions::Column::SessionKey.eq(&session_key))
        .one(&state.db)
        .await
        .unwrap()
        .expect("session row is kept");
    assert!(!session.is_active);

    let after = send(&app, Method::GET, "/profile", Some(&session_key), None).await;
    assert_eq!(after.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_routes_require_session() {
    let (app, _state) = build_test_app().await;

    for (method, uri) in [
        (Method::GET, "/profile"),
        (Method::GET, "/dashboard"),
        (Method::GET, "/transactions"),
        (Method::POST, "/logout"),
    ] {
        let response = send(&app, method, uri, None, None).await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED, "{}", uri);
    }

    let bogus = send(&app, Method::GET, "/profile", Some("not-a-real-key"), None).await;
    assert_eq!(bogus.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_update_profile() {
    let (app, _state) = build_test_app().await;
    let session_key = register(&app, "iris").await;

    let response = send(
        &app,
        Method::PUT,
        "/profile",
        Some(&session_key),
        Some(json!({
            "phone_number": "5551234567",
            "date_of_birth": "1990-05-17",
            "first_name": "Iris",
        })),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.body);
    assert_eq!(response.body["phone_number"], "5551234567");
    assert_eq!(response.body["date_of_birth"], "1990-05-17");
    assert_eq!(response.body["first_name"], "Iris");

    let bad_phone = send(
        &app,
        Method::PUT,
        "/profile",
        Some(&session_key),
        Some(json!({ "phone_number": "555-123-456789" })),
    )
    .await;
    assert_eq!(bad_phone.status, StatusCode::BAD_REQUEST);

    let unchanged = send(&app, Method::GET, "/profile", Some(&session_key), None).await;
    assert_eq!(unchanged.body["phone_number"], "5551234567");
}

#[tokio::test]
async fn test_idle_session_expires() {
    let (app, state) = build_test_app().await;
    let session_key = register(&app, "jack").await;

    let session = UserSessions::find()
        .filter(user_sessions::Column::SessionKey.eq(&session_key))
        .one(&state.db)
        .await
        .unwrap()
        .unwrap();
    let idle_since = Utc::now().naive_utc() - state.config.session_ttl - Duration::days(1);
    let mut active_model: user_sessions::ActiveModel = session.into();
    active_model.last_activity = Set(idle_since);
    active_model.update(&state.db).await.unwrap();

    let response = send(&app, Method::GET, "/profile", Some(&session_key), None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let session = UserSessions::find()
        .filter(user_sessions::Column::SessionKey.eq(&session_key))
        .one(&state.db)
        .await
        .unwrap()
        .unwrap();
    assert!(!session.is_active);
}

#[tokio::test]
async fn test_active_session_is_refreshed() {
    let (app, state) = build_test_app().await;
    let session_key = register(&app, "kate").await;

    let recent = Utc::now().naive_utc() - Duration::hours(1);
    let session = UserSessions::find()
        .filter(user_sessions::Column::SessionKey.eq(&session_key))
        .one(&state.db)
        .await
        .unwrap()
        .unwrap();
    let mut active_model: user_sessions::ActiveModel = session.into();
    active_model.last_activity = Set(recent);
    active_model.update(&state.db).await.unwrap();

    let response = send(&app, Method::GET, "/profile", Some(&session_key), None).await;
    assert_eq!(response.status, StatusCode::OK);

    let session = UserSessions::find()
        .filter(user_sessions::Column::SessionKey.eq(&session_key))
        .one(&state.db)
        .await
        .unwrap()
        .unwrap();
    assert!(session.is_active);
    assert!(session.last_activity > recent);
}

#[tokio::test]
async fn test_inactive_user_cannot_log_in() {
    let (app, state) = build_test_app().await;
    let session_key = register(&app, "liam").await;
    let id = user_id(&state, "liam").await;

    let user = Users::find_by_id(id).one(&state.db).await.unwrap().unwrap();
    let mut active_model: users::ActiveModel = user.into();
    active_model.is_active = Set(false);
    active_model.update(&state.db).await.unwrap();

    let login = send(
        &app,
        Method::POST,
        "/login",
        None,
        Some(json!({ "username": "liam", "password": TEST_PASSWORD })),
    )
    .await;
    assert_eq!(login.status, StatusCode::FORBIDDEN);
    assert!(login.session_cookie().is_none());

    // The session opened at registration stops resolving too
    let profile = send(&app, Method::GET, "/profile", Some(&session_key), None).await;
    assert_eq!(profile.status, StatusCode::UNAUTHORIZED);
    let session = UserSessions::find()
        .filter(user_sessions::Column::SessionKey.eq(&session_key))
        .one(&state.db)
        .await
        .unwrap()
        .unwrap();
    assert!(!session.is_active);
}
