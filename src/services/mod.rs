pub mod account_service;
pub mod auth_service;
pub mod course_service;
pub mod email_service;
pub mod import_service;
pub mod notification_service;
pub mod password;
pub mod upload_store;

pub use account_service::{AccountRequest, AccountService, AccountServiceError};
pub use auth_service::{AuthService, AuthServiceError, AuthenticatedUser, LoginRequest};
pub use course_service::{CourseRequest, CourseService, CourseServiceError};
pub use email_service::{
    create_email_service, ConsoleEmailService, EmailError, EmailService, OutboundEmail,
    SmtpEmailService,
};
pub use import_service::{ImportError, ImportRow, ImportService, ImportSummary};
pub use notification_service::{
    DispatchReport, DispatchRequest, MessageRequest, NotificationError, NotificationService,
};
pub use upload_store::{ImageUpload, UploadError, UploadStore};
