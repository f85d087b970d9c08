pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;

// Make test_utils available for both unit tests and integration tests
pub mod test_utils;

use std::sync::Arc;

use config::AppConfig;
use repositories::{
    CourseRepository, NotificationRepository, SqliteCourseRepository,
    SqliteNotificationRepository, SqliteUserRepository, UserRepository,
};
use services::{
    AccountService, AuthService, CourseService, EmailService, ImportService, NotificationService,
    UploadStore,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub auth_service: Arc<AuthService>,
    pub account_service: Arc<AccountService>,
    pub course_service: Arc<CourseService>,
    pub import_service: Arc<ImportService>,
    pub notification_service: Arc<NotificationService>,
    pub uploads: Arc<UploadStore>,
    pub pool: sqlx::SqlitePool,
}

impl AppState {
    /// Wires the SQLite repositories and services around one pool.
    pub fn new(pool: sqlx::SqlitePool, config: AppConfig, mailer: Arc<dyn EmailService>) -> Self {
        let user_repository: Arc<dyn UserRepository> =
            Arc::new(SqliteUserRepository::new(pool.clone()));
        let course_repository: Arc<dyn CourseRepository> =
            Arc::new(SqliteCourseRepository::new(pool.clone()));
        let notification_repository: Arc<dyn NotificationRepository> =
            Arc::new(SqliteNotificationRepository::new(pool.clone()));

        let uploads = Arc::new(UploadStore::new(config.upload_dir.clone()));

        let auth_service = Arc::new(AuthService::new(user_repository.clone()));
        let account_service = Arc::new(AccountService::new(
            user_repository.clone(),
            uploads.clone(),
        ));
        let course_service = Arc::new(CourseService::new(course_repository.clone()));
        let import_service = Arc::new(ImportService::new(
            user_repository.clone(),
            course_repository,
        ));
        let notification_service = Arc::new(NotificationService::new(
            user_repository,
            notification_repository,
            mailer,
            config.admin_mailbox.clone(),
        ));

        AppState {
            config: Arc::new(config),
            auth_service,
            account_service,
            course_service,
            import_service,
            notification_service,
            uploads,
            pool,
        }
    }
}
