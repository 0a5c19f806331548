//! User accounts: registration, credential checks and profile edits.
//!
//! Registration creates the user, its profile and its portfolio in a single
//! transaction so an account never exists without the other two rows.

use argon2::{
    Argon2,
    password_hash::{
        Error as PasswordHashError, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
        rand_core::OsRng,
    },
};
use chrono::{NaiveDate, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
    SqlErr, TransactionTrait, TryIntoModel,
};
use thiserror::Error;

use crate::entities::{portfolios, prelude::*, user_profiles, users};
use crate::models::account::{RegisterRequest, UpdateProfileRequest};

pub const DEFAULT_PORTFOLIO_NAME: &str = "My Portfolio";
const MAX_NAME_LEN: usize = 150;
const MIN_PASSWORD_LEN: usize = 8;
const MAX_PHONE_LEN: usize = 11;

lazy_static! {
    static ref USERNAME_RE: Regex = Regex::new(r"^[\w.@+\-]+$").unwrap();
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
}

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("{0}")]
    Validation(String),
    #[error("A user with that username already exists.")]
    UsernameTaken,
    #[error("Invalid username or password.")]
    InvalidCredentials,
    #[error("This account is inactive.")]
    Inactive,
    #[error("Account not found")]
    NotFound,
    #[error("Password hashing failed: {0}")]
    Hashing(String),
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Registration input after validation
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub email: Option<String>,
    pub first_name: String,
    pub last_name: String,
}

/// Everything created for a new account
#[derive(Debug, Clone)]
pub struct Account {
    pub user: users::Model,
    pub profile: user_profiles::Model,
    pub portfolio: portfolios::Model,
}

pub fn validate_registration(request: &RegisterRequest) -> Result<NewUser, AccountError> {
    let username = request.username.trim().to_string();
    if username.is_empty() {
        return Err(AccountError::Validation("Username is required.".into()));
    }
    if username.chars().count() > MAX_NAME_LEN || !USERNAME_RE.is_match(&username) {
        return Err(AccountError::Validation(
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters (150 at most).".into(),
        ));
    }

    if request.password1 != request.password2 {
        return Err(AccountError::Validation(
            "The two password fields didn't match.".into(),
        ));
    }
    validate_password(&request.password1, &username)?;

    Ok(NewUser {
        username,
        password: request.password1.clone(),
        email: clean_email(request.email.as_deref())?,
        first_name: clean_name(request.first_name.as_deref(), "First name")?,
        last_name: clean_name(request.last_name.as_deref(), "Last name")?,
    })
}

fn validate_password(password: &str, username: &str) -> Result<(), AccountError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AccountError::Validation(format!(
            "This password is too short. It must contain at least {} characters.",
            MIN_PASSWORD_LEN
        )));
    }
    if password.chars().all(|c| c.is_ascii_digit()) {
        return Err(AccountError::Validation(
            "This password is entirely numeric.".into(),
        ));
    }
    if password.eq_ignore_ascii_case(username) {
        return Err(AccountError::Validation(
            "The password is too similar to the username.".into(),
        ));
    }
    Ok(())
}

fn clean_email(email: Option<&str>) -> Result<Option<String>, AccountError> {
    match email.map(str::trim).filter(|e| !e.is_empty()) {
        None => Ok(None),
        Some(email) if email.len() <= 254 && EMAIL_RE.is_match(email) => {
            Ok(Some(email.to_lowercase()))
        }
        Some(_) => Err(AccountError::Validation("Enter a valid email address.".into())),
    }
}

fn clean_name(name: Option<&str>, label: &str) -> Result<String, AccountError> {
    let name = name.map(str::trim).unwrap_or_default();
    if name.chars().count() > MAX_NAME_LEN {
        return Err(AccountError::Validation(format!(
            "{} must be at most {} characters.",
            label, MAX_NAME_LEN
        )));
    }
    Ok(name.to_string())
}

fn clean_phone(phone: &str) -> Result<Option<String>, AccountError> {
    let phone = phone.trim();
    if phone.is_empty() {
        return Ok(None);
    }
    if phone.len() > MAX_PHONE_LEN || !phone.chars().all(|c| c.is_ascii_digit()) {
        return Err(AccountError::Validation(format!(
            "Phone number must be digits only, at most {} characters.",
            MAX_PHONE_LEN
        )));
    }
    Ok(Some(phone.to_string()))
}

pub fn hash_password(password: &str) -> Result<String, AccountError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AccountError::Hashing(e.to_string()))
}

/// `Ok(false)` for a wrong password, `Err` only when the stored hash is unusable
pub fn verify_password(candidate: &str, stored_hash: &str) -> Result<bool, AccountError> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| AccountError::Hashing(format!("Invalid stored password hash: {e}")))?;
    match Argon2::default().verify_password(candidate.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(PasswordHashError::Password) => Ok(false),
        Err(other) => Err(AccountError::Hashing(format!(
            "Password verification failed: {other}"
        ))),
    }
}

/// Create user + profile + portfolio atomically
pub async fn create_user(
    db: &DatabaseConnection,
    new_user: NewUser,
    starting_balance: Decimal,
) -> Result<Account, AccountError> {
    let password_hash = hash_password(&new_user.password)?;
    let now = Utc::now().naive_utc();

    let txn = db.begin().await?;

    let existing = Users::find()
        .filter(users::Column::Username.eq(&new_user.username))
        .one(&txn)
        .await?;
    if existing.is_some() {
        return Err(AccountError::UsernameTaken);
    }

    let user = users::ActiveModel {
        username: Set(new_user.username),
        email: Set(new_user.email),
        first_name: Set(new_user.first_name),
        last_name: Set(new_user.last_name),
        password_hash: Set(password_hash),
        is_active: Set(true),
        date_joined: Set(now),
        last_login: Set(None),
        ..Default::default()
    }
    .insert(&txn)
    .await
    .map_err(|e| match e.sql_err() {
        // Lost a race with a concurrent registration
        Some(SqlErr::UniqueConstraintViolation(_)) => AccountError::UsernameTaken,
        _ => AccountError::Database(e),
    })?;

    let profile = user_profiles::ActiveModel {
        user_id: Set(user.id),
        phone_number: Set(None),
        date_of_birth: Set(None),
        account_balance: Set(starting_balance),
        created_at: Set(now),
        updated_at: Set(now),
        last_login_ip: Set(None),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let portfolio = portfolios::ActiveModel {
        user_id: Set(user.id),
        name: Set(DEFAULT_PORTFOLIO_NAME.to_string()),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    tracing::info!("Registered user {} (id {})", user.username, user.id);

    Ok(Account {
        user,
        profile,
        portfolio,
    })
}

/// Check a username/password pair
pub async fn authenticate(
    db: &DatabaseConnection,
    username: &str,
    password: &str,
) -> Result<users::Model, AccountError> {
    let user = Users::find()
        .filter(users::Column::Username.eq(username.trim()))
        .one(db)
        .await?
        .ok_or(AccountError::InvalidCredentials)?;

    if !verify_password(password, &user.password_hash)? {
        tracing::info!("Failed login for {}", user.username);
        return Err(AccountError::InvalidCredentials);
    }
    if !user.is_active {
        return Err(AccountError::Inactive);
    }

    Ok(user)
}

/// Stamp the login time on the user and the client IP on the profile
pub async fn record_login(
    db: &DatabaseConnection,
    user: users::Model,
    ip_address: &str,
) -> Result<users::Model, AccountError> {
    let now = Utc::now().naive_utc();

    let mut user_model: users::ActiveModel = user.into();
    user_model.last_login = Set(Some(now));
    let user = user_model.update(db).await?;

    if let Some(profile) = UserProfiles::find()
        .filter(user_profiles::Column::UserId.eq(user.id))
        .one(db)
        .await?
    {
        let mut profile_model: user_profiles::ActiveModel = profile.into();
        profile_model.last_login_ip = Set(Some(ip_address.to_string()));
        profile_model.update(db).await?;
    }

    Ok(user)
}

pub async fn load_profile(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<(users::Model, user_profiles::Model), AccountError> {
    let user = Users::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or(AccountError::NotFound)?;
    let profile = UserProfiles::find()
        .filter(user_profiles::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or(AccountError::NotFound)?;
    Ok((user, profile))
}

/// Apply a partial profile edit. Empty strings clear optional fields.
pub async fn update_profile(
    db: &DatabaseConnection,
    user_id: i32,
    request: UpdateProfileRequest,
) -> Result<(users::Model, user_profiles::Model), AccountError> {
    let email = match request.email.as_deref() {
        Some(email) => Some(clean_email(Some(email))?),
        None => None,
    };
    let first_name = match request.first_name.as_deref() {
        Some(name) => Some(clean_name(Some(name), "First name")?),
        None => None,
    };
    let last_name = match request.last_name.as_deref() {
        Some(name) => Some(clean_name(Some(name), "Last name")?),
        None => None,
    };
    let phone_number = match request.phone_number.as_deref() {
        Some(phone) => Some(clean_phone(phone)?),
        None => None,
    };
    if let Some(date_of_birth) = request.date_of_birth {
        validate_date_of_birth(date_of_birth)?;
    }

    let (user, profile) = load_profile(db, user_id).await?;
    let now = Utc::now().naive_utc();

    let txn = db.begin().await?;

    let mut user_model: users::ActiveModel = user.into();
    if let Some(email) = email {
        user_model.email = Set(email);
    }
    if let Some(first_name) = first_name {
        user_model.first_name = Set(first_name);
    }
    if let Some(last_name) = last_name {
        user_model.last_name = Set(last_name);
    }
    let user = if user_model.is_changed() {
        user_model.update(&txn).await?
    } else {
        user_model.try_into_model()?
    };

    let mut profile_model: user_profiles::ActiveModel = profile.into();
    if let Some(phone_number) = phone_number {
        profile_model.phone_number = Set(phone_number);
    }
    if let Some(date_of_birth) = request.date_of_birth {
        profile_model.date_of_birth = Set(Some(date_of_birth));
    }
    profile_model.updated_at = Set(now);
    let profile = profile_model.update(&txn).await?;

    txn.commit().await?;

    Ok((user, profile))
}

fn validate_date_of_birth(date: NaiveDate) -> Result<(), AccountError> {
    if date > Utc::now().date_naive() {
        return Err(AccountError::Validation(
            "Date of birth cannot be in the future.".into(),
        ));
    }
    Ok(())
}
