use super::user::Level;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Course {
    pub id: i64,
    pub name: String,
    pub code: String,
    pub description: String,
    pub credit: i64,
    #[sqlx(try_from = "i64")]
    pub level: Level,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CourseInput {
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub credit: i64,
    pub level: Level,
}
