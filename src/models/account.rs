use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::entities::{user_profiles, users};

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password1: String,
    pub password2: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionResponse {
    pub message: String,
    pub username: String,
    pub session_key: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Fields a user may change on their own profile. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileResponse {
    pub username: String,
    pub email: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub account_balance: Decimal,
    pub date_joined: NaiveDateTime,
    pub last_login: Option<NaiveDateTime>,
    pub last_login_ip: Option<String>,
}

impl ProfileResponse {
    pub fn new(user: users::Model, profile: user_profiles::Model) -> Self {
        Self {
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            phone_number: profile.phone_number,
            date_of_birth: profile.date_of_birth,
            account_balance: profile.account_balance,
            date_joined: user.date_joined,
            last_login: user.last_login,
            last_login_ip: profile.last_login_ip,
        }
    }
}
