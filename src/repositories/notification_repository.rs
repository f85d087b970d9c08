use crate::models::notification::{
    NewDelivery, NewSendNotification, ReceiveNotification, SendNotification, Sender,
};
use async_trait::async_trait;
use sqlx::SqlitePool;

use super::{RepositoryError, RepositoryResult};

#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait NotificationRepository: Send + Sync {
    /// Writes the delivery rows and the audit row in one transaction and
    /// returns the audit row id. Deliveries for students that no longer
    /// exist are skipped.
    async fn record_dispatch(
        &self,
        audit: NewSendNotification,
        deliveries: Vec<NewDelivery>,
    ) -> RepositoryResult<i64>;
    async fn list_for_student(&self, student_id: i64) -> RepositoryResult<Vec<ReceiveNotification>>;
    /// Flags one of the student's own notifications as read.
    async fn mark_read(&self, student_id: i64, notification_id: i64) -> RepositoryResult<()>;
    async fn list_sent(&self, limit: i64) -> RepositoryResult<Vec<SendNotification>>;
}

pub struct SqliteNotificationRepository {
    pool: SqlitePool,
}

impl SqliteNotificationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationRepository for SqliteNotificationRepository {
    async fn record_dispatch(
        &self,
        audit: NewSendNotification,
        deliveries: Vec<NewDelivery>,
    ) -> RepositoryResult<i64> {
        let mut tx = self.pool.begin().await?;

        for delivery in &deliveries {
            // A student deleted after the mail went out has no inbox left
            let inserted = sqlx::query(
                r#"
                INSERT INTO receive_notifications (title, content, student_id, communication_method, is_read)
                SELECT ?, ?, ?, ?, FALSE
                WHERE EXISTS (SELECT 1 FROM students WHERE id = ?)
                "#,
            )
            .bind(&delivery.title)
            .bind(&delivery.content)
            .bind(delivery.student_id)
            .bind(&delivery.communication_method)
            .bind(delivery.student_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

            if inserted == 0 {
                tracing::warn!(
                    "Skipped delivery record for missing student {}",
                    delivery.student_id
                );
            }
        }

        let (admin_id, student_id) = match audit.sender {
            Sender::Admin(id) => (Some(id), None),
            Sender::Student(id) => (None, Some(id)),
        };

        let audit_id = sqlx::query(
            r#"
            INSERT INTO send_notifications (title, message, send_method, admin_id, student_id)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&audit.title)
        .bind(&audit.message)
        .bind(audit.send_method)
        .bind(admin_id)
        .bind(student_id)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        tx.commit().await?;
        Ok(audit_id)
    }

    async fn list_for_student(&self, student_id: i64) -> RepositoryResult<Vec<ReceiveNotification>> {
        let notifications = sqlx::query_as::<_, ReceiveNotification>(
            r#"
            SELECT id, title, content, send_at, student_id, communication_method, is_read
            FROM receive_notifications
            WHERE student_id = ?
            ORDER BY send_at DESC, id DESC
            "#,
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(notifications)
    }

    async fn mark_read(&self, student_id: i64, notification_id: i64) -> RepositoryResult<()> {
        let result = sqlx::query(
            "UPDATE receive_notifications SET is_read = TRUE WHERE id = ? AND student_id = ?",
        )
        .bind(notification_id)
        .bind(student_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn list_sent(&self, limit: i64) -> RepositoryResult<Vec<SendNotification>> {
        let sent = sqlx::query_as::<_, SendNotification>(
            r#"
            SELECT id, title, message, created_at, send_method, admin_id, student_id
            FROM send_notifications
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(sent)
    }
}
