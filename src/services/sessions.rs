//! Login session tracking
//!
//! Sessions are keyed by an opaque key handed to the client as a cookie.
//! Logging out only flips `is_active`, so the table doubles as a login audit trail.

use chrono::{Duration, NaiveDateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, Set, SqlErr,
};

use crate::entities::{prelude::*, user_sessions, users};

/// Longest user agent string kept per session
const MAX_USER_AGENT_LEN: usize = 512;

/// Fresh random session key (32 hex chars)
pub fn new_session_key() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

pub async fn find_by_key<C>(
    conn: &C,
    session_key: &str,
) -> Result<Option<user_sessions::Model>, DbErr>
where
    C: ConnectionTrait,
{
    UserSessions::find()
        .filter(user_sessions::Column::SessionKey.eq(session_key))
        .one(conn)
        .await
}

/// Record a login under `session_key`.
///
/// A new row is inserted for unknown keys. A key that already has a row is
/// reassigned to `user_id` and reactivated in place instead of failing on the
/// unique constraint.
pub async fn open_session(
    db: &DatabaseConnection,
    user_id: i32,
    session_key: &str,
    ip_address: &str,
    user_agent: &str,
) -> Result<user_sessions::Model, DbErr> {
    let now = Utc::now().naive_utc();
    let user_agent: String = user_agent.chars().take(MAX_USER_AGENT_LEN).collect();

    let session = match find_by_key(db, session_key).await? {
        Some(existing) => {
            tracing::debug!("Refreshing existing session for user {}", user_id);
            refresh(db, existing, user_id, ip_address, &user_agent, now).await?
        }
        None => {
            let new_session = user_sessions::ActiveModel {
                user_id: Set(user_id),
                session_key: Set(session_key.to_string()),
                ip_address: Set(ip_address.to_string()),
                user_agent: Set(user_agent.clone()),
                created_at: Set(now),
                last_activity: Set(now),
                is_active: Set(true),
                ..Default::default()
            };

            match new_session.insert(db).await {
                Ok(session) => session,
                Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                    // Another request inserted the same key between lookup and insert
                    let existing = find_by_key(db, session_key).await?.ok_or(e)?;
                    refresh(db, existing, user_id, ip_address, &user_agent, now).await?
                }
                Err(e) => return Err(e),
            }
        }
    };

    tracing::info!(
        user_id,
        ip = %session.ip_address,
        "Session opened"
    );

    Ok(session)
}

async fn refresh<C>(
    conn: &C,
    existing: user_sessions::Model,
    user_id: i32,
    ip_address: &str,
    user_agent: &str,
    now: NaiveDateTime,
) -> Result<user_sessions::Model, DbErr>
where
    C: ConnectionTrait,
{
    let mut active_model: user_sessions::ActiveModel = existing.into();
    active_model.user_id = Set(user_id);
    active_model.ip_address = Set(ip_address.to_string());
    active_model.user_agent = Set(user_agent.to_string());
    active_model.is_active = Set(true);
    active_model.last_activity = Set(now);
    active_model.update(conn).await
}

/// Deactivate the user's active session with this key. Returns whether one was found.
pub async fn close_session(
    db: &DatabaseConnection,
    user_id: i32,
    session_key: &str,
) -> Result<bool, DbErr> {
    let session = UserSessions::find()
        .filter(user_sessions::Column::UserId.eq(user_id))
        .filter(user_sessions::Column::SessionKey.eq(session_key))
        .filter(user_sessions::Column::IsActive.eq(true))
        .one(db)
        .await?;

    let Some(session) = session else {
        return Ok(false);
    };

    let mut active_model: user_sessions::ActiveModel = session.into();
    active_model.is_active = Set(false);
    active_model.last_activity = Set(Utc::now().naive_utc());
    active_model.update(db).await?;

    tracing::info!(user_id, "Session closed");
    Ok(true)
}

/// Whether a session idle since `last_activity` has outlived `ttl` at `now`
pub fn is_expired(last_activity: NaiveDateTime, now: NaiveDateTime, ttl: Duration) -> bool {
    now.signed_duration_since(last_activity) > ttl
}

/// Look up the user behind an active, unexpired session and bump its activity time.
///
/// Sessions idle for longer than `ttl` are deactivated and treated as missing.
pub async fn resolve_session(
    db: &DatabaseConnection,
    session_key: &str,
    ttl: Duration,
) -> Result<Option<(users::Model, user_sessions::Model)>, DbErr> {
    let found = UserSessions::find()
        .filter(user_sessions::Column::SessionKey.eq(session_key))
        .filter(user_sessions::Column::IsActive.eq(true))
        .find_also_related(Users)
        .one(db)
        .await?;

    let Some((session, Some(user))) = found else {
        return Ok(None);
    };

    let now = Utc::now().naive_utc();
    let expired = is_expired(session.last_activity, now, ttl);

    let mut active_model: user_sessions::ActiveModel = session.into();
    if expired || !user.is_active {
        active_model.is_active = Set(false);
        active_model.update(db).await?;
        tracing::debug!("Session for user {} expired", user.id);
        return Ok(None);
    }

    active_model.last_activity = Set(now);
    let session = active_model.update(db).await?;

    Ok(Some((user, session)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_session_key_shape() {
        let key = new_session_key();
        assert_eq!(key.len(), 32);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(key, new_session_key());
    }

    #[test]
    fn test_is_expired() {
        let start = NaiveDate::from_ymd_opt(2026, 1, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let ttl = Duration::hours(2);
        assert!(!is_expired(start, start + Duration::hours(1), ttl));
        assert!(!is_expired(start, start + ttl, ttl));
        assert!(is_expired(start, start + ttl + Duration::seconds(1), ttl));
    }
}
