pub mod test_helpers {
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{header, HeaderValue, Method, Request, Response},
        Router,
    };
    use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
    use tempfile::TempDir;
    use tower::ServiceExt;
    use tower_sessions_sqlx_store::SqliteStore;

    use crate::config::{AppConfig, SessionConfig, DEFAULT_MAX_UPLOAD_BYTES};
    use crate::models::user::Level;
    use crate::services::email_service::{EmailError, EmailService, OutboundEmail};
    use crate::services::password::hash_password;
    use crate::{routes, AppState};

    pub const MULTIPART_BOUNDARY: &str = "collegeportal-test-boundary";

    /// Create a new in-memory SQLite database for testing
    pub async fn create_test_db() -> Result<SqlitePool, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await?;

        // Run migrations
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(pool)
    }

    async fn insert_test_user(
        pool: &SqlitePool,
        email: &str,
        password: &str,
        role: &str,
    ) -> Result<i64, sqlx::Error> {
        let password_hash = hash_password(password).map_err(|e| {
            sqlx::Error::Configuration(format!("Password hashing failed: {}", e).into())
        })?;

        let result = sqlx::query(
            r#"
            INSERT INTO users (first_name, last_name, email, password_hash, role)
            VALUES ('Test', 'User', ?, ?, ?)
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .bind(role)
        .execute(pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Insert a student; returns `(user_id, student_id)`.
    pub async fn insert_test_student(
        pool: &SqlitePool,
        email: &str,
        password: &str,
        level: Level,
    ) -> Result<(i64, i64), sqlx::Error> {
        let user_id = insert_test_user(pool, email, password, "student").await?;
        let student_id = sqlx::query("INSERT INTO students (user_id, level) VALUES (?, ?)")
            .bind(user_id)
            .bind(level.as_i64())
            .execute(pool)
            .await?
            .last_insert_rowid();
        Ok((user_id, student_id))
    }

    /// Insert an admin; returns `(user_id, admin_id)`.
    pub async fn insert_test_admin(
        pool: &SqlitePool,
        email: &str,
        password: &str,
    ) -> Result<(i64, i64), sqlx::Error> {
        let user_id = insert_test_user(pool, email, password, "admin").await?;
        let admin_id = sqlx::query("INSERT INTO admins (user_id) VALUES (?)")
            .bind(user_id)
            .execute(pool)
            .await?
            .last_insert_rowid();
        Ok((user_id, admin_id))
    }

    pub async fn count_rows(pool: &SqlitePool, table: &str) -> i64 {
        sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(pool)
            .await
            .unwrap_or_else(|e| panic!("Failed to count {}: {}", table, e))
    }

    /// Mail transport that keeps what it was given. Addresses in `failing`
    /// are refused.
    #[derive(Default)]
    pub struct RecordingEmailService {
        sent: Mutex<Vec<OutboundEmail>>,
        failing: HashSet<String>,
    }

    impl RecordingEmailService {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing_for(addresses: &[&str]) -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                failing: addresses.iter().map(|a| a.to_string()).collect(),
            }
        }

        pub fn sent(&self) -> Vec<OutboundEmail> {
            self.sent
                .lock()
                .map(|sent| sent.clone())
                .unwrap_or_default()
        }
    }

    #[async_trait]
    impl EmailService for RecordingEmailService {
        async fn send_email(&self, email: &OutboundEmail) -> Result<(), EmailError> {
            if self.failing.contains(&email.to) {
                return Err(EmailError::SendFailed(format!("{} rejected", email.to)));
            }
            if let Ok(mut sent) = self.sent.lock() {
                sent.push(email.clone());
            }
            Ok(())
        }
    }

    pub fn test_config(upload_dir: &std::path::Path) -> AppConfig {
        AppConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            upload_dir: upload_dir.to_path_buf(),
            files_dir: upload_dir.to_path_buf(),
            admin_mailbox: "office@college.test".to_string(),
            allow_admin_signup: false,
            cors_origin: HeaderValue::from_static("http://localhost:3000"),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            session: SessionConfig {
                secure: false,
                http_only: true,
                same_site: tower_sessions::cookie::SameSite::Lax,
                ttl: time::Duration::hours(24),
                name: "session".to_string(),
            },
        }
    }

    /// A fully wired router over an in-memory database.
    pub struct TestApp {
        pub router: Router,
        pub pool: SqlitePool,
        pub mailer: Arc<RecordingEmailService>,
        pub upload_dir: TempDir,
    }

    impl TestApp {
        pub async fn new() -> Self {
            Self::with_options(RecordingEmailService::new(), |_| {}).await
        }

        pub async fn with_options(
            mailer: RecordingEmailService,
            configure: impl FnOnce(&mut AppConfig),
        ) -> Self {
            let pool = create_test_db().await.expect("test database");
            let upload_dir = tempfile::tempdir().expect("upload dir");
            let mut config = test_config(upload_dir.path());
            configure(&mut config);

            let session_store = SqliteStore::new(pool.clone())
                .with_table_name("sessions")
                .expect("valid session table name for tests");
            session_store
                .migrate()
                .await
                .expect("session table migration to succeed");
            let session_layer = config.session.create_layer(session_store);

            let mailer = Arc::new(mailer);
            let state = AppState::new(pool.clone(), config, mailer.clone());
            let router = routes::build_router(state, session_layer);

            TestApp {
                router,
                pool,
                mailer,
                upload_dir,
            }
        }

        pub async fn send(&self, request: Request<Body>) -> Response<Body> {
            self.router
                .clone()
                .oneshot(request)
                .await
                .expect("router is infallible")
        }

        /// Logs in and returns the `name=value` cookie pair to send back.
        pub async fn login(&self, email: &str, password: &str) -> String {
            let response = self
                .send(json_request(
                    Method::POST,
                    "/login",
                    None,
                    serde_json::json!({ "email": email, "password": password }),
                ))
                .await;
            assert!(
                response.status().is_success(),
                "login failed with {}",
                response.status()
            );
            session_cookie(&response).expect("login sets a session cookie")
        }
    }

    pub fn session_cookie(response: &Response<Body>) -> Option<String> {
        response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find(|value| value.starts_with("session="))
            .and_then(|value| value.split(';').next())
            .map(str::to_string)
    }

    fn with_cookie(
        builder: axum::http::request::Builder,
        cookie: Option<&str>,
    ) -> axum::http::request::Builder {
        match cookie {
            Some(cookie) => builder.header(header::COOKIE, cookie),
            None => builder,
        }
    }

    pub fn get_request(uri: &str, cookie: Option<&str>) -> Request<Body> {
        with_cookie(Request::builder().method(Method::GET).uri(uri), cookie)
            .body(Body::empty())
            .expect("valid request")
    }

    pub fn empty_request(method: Method, uri: &str, cookie: Option<&str>) -> Request<Body> {
        with_cookie(Request::builder().method(method).uri(uri), cookie)
            .body(Body::empty())
            .expect("valid request")
    }

    pub fn json_request(
        method: Method,
        uri: &str,
        cookie: Option<&str>,
        body: serde_json::Value,
    ) -> Request<Body> {
        with_cookie(Request::builder().method(method).uri(uri), cookie)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("valid request")
    }

    /// An attached file for `multipart_request`.
    pub struct FilePart<'a> {
        pub file_name: &'a str,
        pub content_type: &'a str,
        pub bytes: &'a [u8],
    }

    pub fn multipart_request(
        method: Method,
        uri: &str,
        cookie: Option<&str>,
        fields: &[(&str, &str)],
        image: Option<FilePart<'_>>,
    ) -> Request<Body> {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{MULTIPART_BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some(file) = image {
            body.extend_from_slice(
                format!(
                    "--{MULTIPART_BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                    file.file_name, file.content_type
                )
                .as_bytes(),
            );
            body.extend_from_slice(file.bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}--\r\n").as_bytes());

        with_cookie(Request::builder().method(method).uri(uri), cookie)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}"),
            )
            .body(Body::from(body))
            .expect("valid request")
    }

    pub async fn read_json(response: Response<Body>) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("readable body");
        serde_json::from_slice(&bytes).expect("JSON body")
    }
}

// Re-export commonly used test functions at module level for convenience
// Note: This is test-only code. Panic on error is acceptable in tests.
#[cfg(test)]
pub async fn create_test_pool() -> sqlx::SqlitePool {
    match test_helpers::create_test_db().await {
        Ok(pool) => pool,
        Err(e) => panic!("Failed to create test pool: {}", e),
    }
}
