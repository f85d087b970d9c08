//! Spreadsheet roster import.
//!
//! Rows arrive as JSON objects keyed by the spreadsheet's header row. Every
//! row is validated before anything is written, and the accepted rows are
//! inserted in a single transaction so a bad row leaves the database as it was.

use crate::models::course::CourseInput;
use crate::models::user::{Level, NewAccount, Role};
use crate::repositories::{BatchFailure, CourseRepository, RepositoryError, UserRepository};
use crate::services::account_service::{is_valid_email, normalize_email, MIN_PASSWORD_LENGTH};
use crate::services::password::hash_passwords;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::Arc;

pub type ImportRow = Map<String, Value>;

pub mod student_columns {
    pub const FIRST_NAME: &str = "First Name";
    pub const LAST_NAME: &str = "Last Name";
    pub const EMAIL: &str = "Email";
    pub const PASSWORD: &str = "Password";
    pub const LEVEL: &str = "Level";
    pub const PHONE_NUMBER: &str = "Phone Number";
    pub const GENDER: &str = "Gender";
    pub const IMAGE: &str = "Image";
}

pub mod course_columns {
    pub const NAME: &str = "Course Name";
    pub const CODE: &str = "Course Code";
    pub const LEVEL: &str = "Level";
    pub const DESCRIPTION: &str = "Course Description";
    pub const CREDIT: &str = "Credit";
}

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("No rows to import")]
    EmptyBatch,
    #[error("Row {row}: {message}")]
    Row { row: usize, message: String },
    #[error("Password hashing failed: {0}")]
    HashingError(String),
    #[error("Repository error: {0}")]
    RepositoryError(RepositoryError),
}

impl ImportError {
    fn row(row: usize, message: impl Into<String>) -> Self {
        ImportError::Row {
            row,
            message: message.into(),
        }
    }

    /// Maps a rolled-back batch onto the 1-based row that caused it.
    fn from_batch(failure: BatchFailure, duplicate_message: &str) -> Self {
        match (failure.row, failure.error) {
            (Some(index), RepositoryError::AlreadyExists) => {
                ImportError::row(index + 1, duplicate_message)
            }
            (_, error) => ImportError::RepositoryError(error),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportSummary {
    pub inserted: usize,
}

/// Renders a spreadsheet cell as text. Blank cells read as absent.
fn cell_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else {
                match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => (f as i64).to_string(),
                    Some(f) => f.to_string(),
                    None => n.to_string(),
                }
            }
        }
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

struct RowReader<'a> {
    row: usize,
    cells: &'a ImportRow,
}

impl<'a> RowReader<'a> {
    fn new(index: usize, cells: &'a ImportRow) -> Self {
        Self {
            row: index + 1,
            cells,
        }
    }

    fn error(&self, message: impl Into<String>) -> ImportError {
        ImportError::row(self.row, message)
    }

    fn optional(&self, column: &str) -> Option<String> {
        self.cells.get(column).and_then(cell_text)
    }

    fn required(&self, column: &str) -> Result<String, ImportError> {
        self.optional(column)
            .ok_or_else(|| self.error(format!("{} is required", column)))
    }

    fn optional_integer(&self, column: &str) -> Result<Option<i64>, ImportError> {
        let Some(text) = self.optional(column) else {
            return Ok(None);
        };
        text.parse::<i64>()
            .ok()
            .or_else(|| {
                text.parse::<f64>()
                    .ok()
                    .filter(|f| f.fract() == 0.0)
                    .map(|f| f as i64)
            })
            .map(Some)
            .ok_or_else(|| self.error(format!("{} must be a whole number", column)))
    }

    fn level(&self, column: &str) -> Result<Level, ImportError> {
        let value = self
            .optional_integer(column)?
            .ok_or_else(|| self.error(format!("{} is required", column)))?;
        Level::try_from(value)
            .map_err(|_| self.error(format!("{} must be between 1 and 4", column)))
    }
}

/// A validated student row still holding its plain-text password.
struct StudentRow {
    account: NewAccount,
    password: String,
}

fn read_student(index: usize, cells: &ImportRow) -> Result<StudentRow, ImportError> {
    use student_columns::*;

    let reader = RowReader::new(index, cells);
    let first_name = reader.required(FIRST_NAME)?;
    let last_name = reader.required(LAST_NAME)?;

    let email = normalize_email(&reader.required(EMAIL)?);
    if !is_valid_email(&email) {
        return Err(reader.error(format!("{} is not a valid email address", EMAIL)));
    }

    let password = reader.required(PASSWORD)?;
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(reader.error(format!(
            "{} must be at least {} characters",
            PASSWORD, MIN_PASSWORD_LENGTH
        )));
    }

    let level = reader.level(LEVEL)?;

    Ok(StudentRow {
        account: NewAccount {
            first_name,
            last_name,
            phone_num: reader.optional(PHONE_NUMBER),
            email,
            password_hash: String::new(),
            gender: reader.optional(GENDER),
            role: Role::Student,
            level: Some(level),
            image: reader.optional(IMAGE),
        },
        password,
    })
}

fn read_course(index: usize, cells: &ImportRow) -> Result<CourseInput, ImportError> {
    use course_columns::*;

    let reader = RowReader::new(index, cells);
    let name = reader.required(NAME)?;
    let code = reader.required(CODE)?;
    let level = reader.level(LEVEL)?;
    let credit = reader.optional_integer(CREDIT)?.unwrap_or(0);
    if credit < 0 {
        return Err(reader.error(format!("{} cannot be negative", CREDIT)));
    }

    Ok(CourseInput {
        name,
        code,
        description: reader.optional(DESCRIPTION).unwrap_or_default(),
        credit,
        level,
    })
}

/// Rejects the second occurrence of a key within one batch. Keys compare
/// exactly, as the `UNIQUE` columns do; emails arrive already normalized.
fn check_unique<'a>(
    keys: impl Iterator<Item = &'a str>,
    message: &str,
) -> Result<(), ImportError> {
    let mut seen = HashSet::new();
    for (index, key) in keys.enumerate() {
        if !seen.insert(key) {
            return Err(ImportError::row(index + 1, message));
        }
    }
    Ok(())
}

pub struct ImportService {
    users: Arc<dyn UserRepository>,
    courses: Arc<dyn CourseRepository>,
}

impl ImportService {
    pub fn new(users: Arc<dyn UserRepository>, courses: Arc<dyn CourseRepository>) -> Self {
        Self { users, courses }
    }

    pub async fn import_students(&self, rows: Vec<ImportRow>) -> Result<ImportSummary, ImportError> {
        if rows.is_empty() {
            return Err(ImportError::EmptyBatch);
        }

        let parsed = rows
            .iter()
            .enumerate()
            .map(|(index, cells)| read_student(index, cells))
            .collect::<Result<Vec<_>, _>>()?;
        check_unique(
            parsed.iter().map(|row| row.account.email.as_str()),
            "Email is repeated in this file",
        )?;

        let (mut accounts, passwords): (Vec<_>, Vec<_>) = parsed
            .into_iter()
            .map(|row| (row.account, row.password))
            .unzip();

        let hashes = hash_passwords(passwords)
            .await
            .map_err(|e| ImportError::HashingError(e.0))?;
        for (account, hash) in accounts.iter_mut().zip(hashes) {
            account.password_hash = hash;
        }

        let inserted = self
            .users
            .create_accounts(accounts)
            .await
            .map_err(|failure| ImportError::from_batch(failure, "Email already registered"))?;

        tracing::info!("Imported {} students", inserted);
        Ok(ImportSummary { inserted })
    }

    pub async fn import_courses(&self, rows: Vec<ImportRow>) -> Result<ImportSummary, ImportError> {
        if rows.is_empty() {
            return Err(ImportError::EmptyBatch);
        }

        let courses = rows
            .iter()
            .enumerate()
            .map(|(index, cells)| read_course(index, cells))
            .collect::<Result<Vec<_>, _>>()?;
        check_unique(
            courses.iter().map(|course| course.code.as_str()),
            "Course Code is repeated in this file",
        )?;

        let inserted = self
            .courses
            .create_batch(courses)
            .await
            .map_err(|failure| ImportError::from_batch(failure, "Course code already exists"))?;

        tracing::info!("Imported {} courses", inserted);
        Ok(ImportSummary { inserted })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::course_repository::MockCourseRepository;
    use crate::repositories::user_repository::MockUserRepository;
    use serde_json::json;

    fn row(value: Value) -> ImportRow {
        match value {
            Value::Object(map) => map,
            _ => panic!("row must be an object"),
        }
    }

    fn student(email: &str, password: Value) -> ImportRow {
        row(json!({
            "First Name": "Mona",
            "Last Name": "Adel",
            "Email": email,
            "Password": password,
            "Level": 1,
        }))
    }

    fn service(users: MockUserRepository, courses: MockCourseRepository) -> ImportService {
        ImportService::new(Arc::new(users), Arc::new(courses))
    }

    #[test]
    fn cells_accept_strings_and_numbers() {
        assert_eq!(cell_text(&json!("  x ")), Some("x".to_string()));
        assert_eq!(cell_text(&json!("   ")), None);
        assert_eq!(cell_text(&json!(12345678)), Some("12345678".to_string()));
        assert_eq!(cell_text(&json!(3.0)), Some("3".to_string()));
        assert_eq!(cell_text(&Value::Null), None);
    }

    #[test]
    fn student_row_defaults_optional_columns() {
        let parsed = read_student(0, &student("Mona@Example.com", json!(12345678))).unwrap();
        assert_eq!(parsed.account.email, "mona@example.com");
        assert_eq!(parsed.account.level, Some(Level::First));
        assert_eq!(parsed.account.phone_num, None);
        assert_eq!(parsed.password, "12345678");
    }

    #[test]
    fn course_row_reports_bad_level_with_row_number() {
        let cells = row(json!({
            "Course Name": "Networks",
            "Course Code": "CS301",
            "Level": "seven",
        }));
        let err = read_course(4, &cells).unwrap_err();
        assert_eq!(err.to_string(), "Row 5: Level must be a whole number");
    }

    #[tokio::test]
    async fn missing_password_rejects_whole_batch_before_writing() {
        let mut users = MockUserRepository::new();
        users.expect_create_accounts().times(0);

        let rows = vec![
            student("a@example.com", json!("password1")),
            student("b@example.com", json!("password2")),
            student("c@example.com", json!("")),
            student("d@example.com", json!("password4")),
            student("e@example.com", json!("password5")),
        ];

        let err = service(users, MockCourseRepository::new())
            .import_students(rows)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Row 3: Password is required");
    }

    #[tokio::test]
    async fn repeated_email_in_file_is_rejected() {
        let mut users = MockUserRepository::new();
        users.expect_create_accounts().times(0);

        let rows = vec![
            student("a@example.com", json!("password1")),
            student("A@example.com", json!("password2")),
        ];
        let err = service(users, MockCourseRepository::new())
            .import_students(rows)
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::Row { row: 2, .. }));
    }

    #[tokio::test]
    async fn course_codes_differing_in_case_are_distinct() {
        let mut courses = MockCourseRepository::new();
        courses
            .expect_create_batch()
            .withf(|inputs: &Vec<CourseInput>| {
                inputs.iter().map(|c| c.code.as_str()).eq(["cs101", "CS101"])
            })
            .times(1)
            .returning(|inputs| {
                let n = inputs.len();
                Box::pin(async move { Ok(n) })
            });

        let rows = vec![
            row(json!({ "Course Name": "Intro", "Course Code": "cs101", "Level": 1 })),
            row(json!({ "Course Name": "Intro II", "Course Code": "CS101", "Level": 1 })),
        ];
        let summary = service(MockUserRepository::new(), courses)
            .import_courses(rows)
            .await
            .unwrap();
        assert_eq!(summary, ImportSummary { inserted: 2 });
    }

    #[tokio::test]
    async fn repeated_course_code_in_file_is_rejected() {
        let mut courses = MockCourseRepository::new();
        courses.expect_create_batch().times(0);

        let rows = vec![
            row(json!({ "Course Name": "Intro", "Course Code": "CS101", "Level": 1 })),
            row(json!({ "Course Name": "Intro again", "Course Code": "CS101", "Level": 1 })),
        ];
        let err = service(MockUserRepository::new(), courses)
            .import_courses(rows)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Row 2: Course Code is repeated in this file");
    }

    #[tokio::test]
    async fn duplicate_in_database_names_failing_row() {
        let mut users = MockUserRepository::new();
        users.expect_create_accounts().times(1).returning(|accounts| {
            assert!(accounts.iter().all(|a| a.password_hash.starts_with("$argon2")));
            Box::pin(async move { Err(BatchFailure::at(1, RepositoryError::AlreadyExists)) })
        });

        let rows = vec![
            student("a@example.com", json!("password1")),
            student("b@example.com", json!("password2")),
        ];
        let err = service(users, MockCourseRepository::new())
            .import_students(rows)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Row 2: Email already registered");
    }

    #[tokio::test]
    async fn empty_batch_is_rejected() {
        let result = service(MockUserRepository::new(), MockCourseRepository::new())
            .import_courses(Vec::new())
            .await;
        assert!(matches!(result, Err(ImportError::EmptyBatch)));
    }

    #[tokio::test]
    async fn courses_are_inserted_with_defaults() {
        let mut courses = MockCourseRepository::new();
        courses
            .expect_create_batch()
            .withf(|inputs: &Vec<CourseInput>| {
                inputs.len() == 1 && inputs[0].credit == 0 && inputs[0].description.is_empty()
            })
            .times(1)
            .returning(|inputs| {
                let n = inputs.len();
                Box::pin(async move { Ok(n) })
            });

        let rows = vec![row(json!({
            "Course Name": "Calculus",
            "Course Code": "MATH101",
            "Level": "1",
        }))];
        let summary = service(MockUserRepository::new(), courses)
            .import_courses(rows)
            .await
            .unwrap();
        assert_eq!(summary, ImportSummary { inserted: 1 });
    }
}
