use crate::models::notification::{
    NewDelivery, NewSendNotification, ReceiveNotification, SendMethod, SendNotification, Sender,
};
use crate::repositories::{NotificationRepository, RepositoryError, UserRepository};
use crate::services::account_service::normalize_email;
use crate::services::email_service::{EmailError, EmailService, OutboundEmail};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const COMMUNICATION_METHOD: &str = "email";

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("Recipient email is required when sending to one student")]
    MissingRecipient,
    #[error("Recipient not found")]
    RecipientNotFound,
    #[error("Profile not found")]
    ProfileNotFound,
    #[error("Notification not found")]
    NotificationNotFound,
    #[error("Failed to deliver to any of {0} recipients")]
    DeliveryFailed(usize),
    #[error("{0}")]
    Email(#[from] EmailError),
    #[error("Repository error: {0}")]
    RepositoryError(#[from] RepositoryError),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: String,
    pub send_method: Option<SendMethod>,
    pub recipient_email: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedDelivery {
    pub email: String,
    pub error: String,
}

/// Outcome of one dispatch: how many students were addressed, how many
/// emails the transport accepted, and which ones it refused.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DispatchReport {
    pub recipients: usize,
    pub delivered: usize,
    pub failed: Vec<FailedDelivery>,
}

impl DispatchReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

fn required(value: String, field: &'static str) -> Result<String, NotificationError> {
    let value = value.trim().to_string();
    if value.is_empty() {
        return Err(NotificationError::MissingField(field));
    }
    Ok(value)
}

pub struct NotificationService {
    users: Arc<dyn UserRepository>,
    notifications: Arc<dyn NotificationRepository>,
    mailer: Arc<dyn EmailService>,
    admin_mailbox: String,
}

impl NotificationService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        notifications: Arc<dyn NotificationRepository>,
        mailer: Arc<dyn EmailService>,
        admin_mailbox: String,
    ) -> Self {
        Self {
            users,
            notifications,
            mailer,
            admin_mailbox,
        }
    }

    /// Emails every resolved recipient, then records the accepted deliveries
    /// together with one audit row.
    pub async fn dispatch_from_admin(
        &self,
        admin_user_id: i64,
        request: DispatchRequest,
    ) -> Result<DispatchReport, NotificationError> {
        let title = required(request.title, "Title")?;
        let message = required(request.message, "Message")?;
        let send_method = request
            .send_method
            .ok_or(NotificationError::MissingField("Send method"))?;

        let admin = self
            .users
            .find_admin(admin_user_id)
            .await?
            .ok_or(NotificationError::ProfileNotFound)?;

        let recipients = match send_method {
            SendMethod::All => self.users.list_students().await?,
            SendMethod::One => {
                let email = request
                    .recipient_email
                    .map(|email| normalize_email(&email))
                    .filter(|email| !email.is_empty())
                    .ok_or(NotificationError::MissingRecipient)?;
                let student = self
                    .users
                    .find_student_by_email(&email)
                    .await?
                    .ok_or(NotificationError::RecipientNotFound)?;
                vec![student]
            }
        };

        let mut report = DispatchReport {
            recipients: recipients.len(),
            ..Default::default()
        };
        let mut deliveries = Vec::with_capacity(recipients.len());

        for student in &recipients {
            let email = OutboundEmail::new(&student.email, &title, &message);
            match self.mailer.send_email(&email).await {
                Ok(()) => deliveries.push(NewDelivery {
                    student_id: student.student_id,
                    title: title.clone(),
                    content: message.clone(),
                    communication_method: COMMUNICATION_METHOD.to_string(),
                }),
                Err(e) => {
                    tracing::warn!("Failed to email {}: {}", student.email, e);
                    report.failed.push(FailedDelivery {
                        email: student.email.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }
        report.delivered = deliveries.len();

        if report.recipients > 0 && report.delivered == 0 {
            return Err(NotificationError::DeliveryFailed(report.recipients));
        }

        let audit_id = self
            .notifications
            .record_dispatch(
                NewSendNotification {
                    title,
                    message,
                    send_method,
                    sender: Sender::Admin(admin.admin_id),
                },
                deliveries,
            )
            .await?;

        tracing::info!(
            "Notification {} from admin {}: {}/{} delivered",
            audit_id,
            admin.admin_id,
            report.delivered,
            report.recipients
        );
        Ok(report)
    }

    /// Forwards a student's message to the administration mailbox.
    pub async fn message_admin(
        &self,
        student_user_id: i64,
        request: MessageRequest,
    ) -> Result<(), NotificationError> {
        let title = required(request.title, "Title")?;
        let message = required(request.message, "Message")?;

        let student = self
            .users
            .find_student(student_user_id)
            .await?
            .ok_or(NotificationError::ProfileNotFound)?;

        let body = format!(
            "From: {} {} <{}>\n\n{}",
            student.first_name, student.last_name, student.email, message
        );
        let email = OutboundEmail::new(&self.admin_mailbox, &title, body)
            .with_reply_to(&student.email);
        self.mailer.send_email(&email).await?;

        self.notifications
            .record_dispatch(
                NewSendNotification {
                    title,
                    message,
                    send_method: SendMethod::One,
                    sender: Sender::Student(student.student_id),
                },
                Vec::new(),
            )
            .await?;

        tracing::info!("Student {} messaged the administration", student.student_id);
        Ok(())
    }

    pub async fn inbox(
        &self,
        student_user_id: i64,
    ) -> Result<Vec<ReceiveNotification>, NotificationError> {
        let student = self
            .users
            .find_student(student_user_id)
            .await?
            .ok_or(NotificationError::ProfileNotFound)?;
        Ok(self.notifications.list_for_student(student.student_id).await?)
    }

    pub async fn mark_read(
        &self,
        student_user_id: i64,
        notification_id: i64,
    ) -> Result<(), NotificationError> {
        let student = self
            .users
            .find_student(student_user_id)
            .await?
            .ok_or(NotificationError::ProfileNotFound)?;

        self.notifications
            .mark_read(student.student_id, notification_id)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => NotificationError::NotificationNotFound,
                other => other.into(),
            })
    }

    pub async fn sent_log(&self, limit: i64) -> Result<Vec<SendNotification>, NotificationError> {
        Ok(self.notifications.list_sent(limit).await?)
    }
}
