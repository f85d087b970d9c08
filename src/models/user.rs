use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Student,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Student => "student",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = InvalidRole;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "student" => Ok(Role::Student),
            _ => Err(InvalidRole(value.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Invalid role: {0}")]
pub struct InvalidRole(pub String);

/// Academic year of a student or course, stored as an integer 1 through 4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Level {
    First = 1,
    Second = 2,
    Third = 3,
    Fourth = 4,
}

impl Level {
    pub fn as_i64(self) -> i64 {
        self as i64
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Level must be between 1 and 4, got {0}")]
pub struct InvalidLevel(pub i64);

impl TryFrom<i64> for Level {
    type Error = InvalidLevel;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Level::First),
            2 => Ok(Level::Second),
            3 => Ok(Level::Third),
            4 => Ok(Level::Fourth),
            other => Err(InvalidLevel(other)),
        }
    }
}

impl From<Level> for i64 {
    fn from(level: Level) -> Self {
        level.as_i64()
    }
}

impl std::str::FromStr for Level {
    type Err = InvalidLevel;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let parsed = value.trim().parse::<i64>().map_err(|_| InvalidLevel(0))?;
        Level::try_from(parsed)
    }
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub phone_num: Option<String>,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub gender: Option<String>,
    pub role: Role,
    pub image: Option<String>,
    pub created_at: Option<String>,
}

/// A user joined with its `students` row. `id` is the owning user id.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StudentProfile {
    pub id: i64,
    pub student_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub phone_num: Option<String>,
    pub email: String,
    pub gender: Option<String>,
    pub image: Option<String>,
    #[sqlx(try_from = "i64")]
    pub level: Level,
}

/// A user joined with its `admins` row. `id` is the owning user id.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AdminProfile {
    pub id: i64,
    pub admin_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub phone_num: Option<String>,
    pub email: String,
    pub gender: Option<String>,
    pub image: Option<String>,
}

/// Everything needed to insert a `users` row and its role row.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAccount {
    pub first_name: String,
    pub last_name: String,
    pub phone_num: Option<String>,
    pub email: String,
    pub password_hash: String,
    pub gender: Option<String>,
    pub role: Role,
    pub level: Option<Level>,
    pub image: Option<String>,
}

/// Column values for an account update. `None` for `password_hash` or `image`
/// leaves the stored value untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountChanges {
    pub first_name: String,
    pub last_name: String,
    pub phone_num: Option<String>,
    pub email: String,
    pub gender: Option<String>,
    pub level: Option<Level>,
    pub password_hash: Option<String>,
    pub image: Option<String>,
}
