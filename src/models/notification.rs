use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum SendMethod {
    All,
    One,
}

/// Audit row written once per dispatched message.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SendNotification {
    pub id: i64,
    pub title: String,
    pub message: String,
    pub created_at: String,
    pub send_method: SendMethod,
    pub admin_id: Option<i64>,
    pub student_id: Option<i64>,
}

/// Per-recipient delivery row.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ReceiveNotification {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub send_at: String,
    pub student_id: i64,
    pub communication_method: String,
    pub is_read: bool,
}

/// Who a `SendNotification` originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    Admin(i64),
    Student(i64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewSendNotification {
    pub title: String,
    pub message: String,
    pub send_method: SendMethod,
    pub sender: Sender,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewDelivery {
    pub student_id: i64,
    pub title: String,
    pub content: String,
    pub communication_method: String,
}
