use crate::models::user::{
    AccountChanges, AdminProfile, Level, NewAccount, Role, StudentProfile, User,
};
use async_trait::async_trait;
use sqlx::{SqliteConnection, SqlitePool};

pub use super::{BatchFailure, RepositoryError, RepositoryResult};

const USER_COLUMNS: &str = r#"
    SELECT id, first_name, last_name, phone_num, email, password_hash,
           gender, role, image, created_at
    FROM users
"#;

const STUDENT_PROFILE_COLUMNS: &str = r#"
    SELECT u.id, s.id AS student_id, u.first_name, u.last_name, u.phone_num,
           u.email, u.gender, u.image, s.level
    FROM users u
    JOIN students s ON s.user_id = u.id
"#;

const ADMIN_PROFILE_COLUMNS: &str = r#"
    SELECT u.id, a.id AS admin_id, u.first_name, u.last_name, u.phone_num,
           u.email, u.gender, u.image
    FROM users u
    JOIN admins a ON a.user_id = u.id
"#;

#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait UserRepository: Send + Sync {
    /// Inserts the `users` row and its role row in one transaction.
    async fn create_account(&self, account: NewAccount) -> RepositoryResult<User>;
    /// Inserts every account in one transaction; nothing is kept on failure.
    async fn create_accounts(&self, accounts: Vec<NewAccount>) -> Result<usize, BatchFailure>;
    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>>;
    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<User>>;
    async fn find_student_level(&self, user_id: i64) -> RepositoryResult<Option<Level>>;
    async fn list_students(&self) -> RepositoryResult<Vec<StudentProfile>>;
    async fn find_student(&self, user_id: i64) -> RepositoryResult<Option<StudentProfile>>;
    async fn find_student_by_email(&self, email: &str)
        -> RepositoryResult<Option<StudentProfile>>;
    async fn list_admins(&self) -> RepositoryResult<Vec<AdminProfile>>;
    async fn find_admin(&self, user_id: i64) -> RepositoryResult<Option<AdminProfile>>;
    /// Updates a user of the given role. `NotFound` when no such user exists.
    async fn update_account(
        &self,
        user_id: i64,
        role: Role,
        changes: AccountChanges,
    ) -> RepositoryResult<()>;
    /// Deletes the role row and the user row together, returning the removed user.
    async fn delete_account(&self, user_id: i64, role: Role) -> RepositoryResult<User>;
    async fn update_password(&self, user_id: i64, password_hash: &str) -> RepositoryResult<()>;
}

pub struct SqliteUserRepository {
    pool: SqlitePool,
}

impl SqliteUserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

async fn insert_account(conn: &mut SqliteConnection, account: &NewAccount) -> RepositoryResult<i64> {
    let user_id = sqlx::query(
        r#"
        INSERT INTO users (first_name, last_name, phone_num, email, password_hash, gender, role, image)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&account.first_name)
    .bind(&account.last_name)
    .bind(&account.phone_num)
    .bind(&account.email)
    .bind(&account.password_hash)
    .bind(&account.gender)
    .bind(account.role)
    .bind(&account.image)
    .execute(&mut *conn)
    .await
    .map_err(RepositoryError::from_write)?
    .last_insert_rowid();

    match account.role {
        Role::Student => {
            sqlx::query("INSERT INTO students (user_id, level) VALUES (?, ?)")
                .bind(user_id)
                .bind(account.level.map(Level::as_i64))
                .execute(&mut *conn)
                .await?;
        }
        Role::Admin => {
            sqlx::query("INSERT INTO admins (user_id) VALUES (?)")
                .bind(user_id)
                .execute(&mut *conn)
                .await?;
        }
    }

    Ok(user_id)
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn create_account(&self, account: NewAccount) -> RepositoryResult<User> {
        let mut tx = self.pool.begin().await?;
        let user_id = insert_account(&mut *tx, &account).await?;
        tx.commit().await?;

        self.find_by_id(user_id)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    async fn create_accounts(&self, accounts: Vec<NewAccount>) -> Result<usize, BatchFailure> {
        let mut tx = self.pool.begin().await?;

        for (row, account) in accounts.iter().enumerate() {
            if let Err(error) = insert_account(&mut *tx, account).await {
                // Dropping the transaction rolls back the rows inserted so far
                return Err(BatchFailure::at(row, error));
            }
        }

        tx.commit().await?;
        Ok(accounts.len())
    }

    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!("{USER_COLUMNS} WHERE email = ?"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!("{USER_COLUMNS} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_student_level(&self, user_id: i64) -> RepositoryResult<Option<Level>> {
        let level = sqlx::query_scalar::<_, i64>("SELECT level FROM students WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        level
            .map(|value| {
                Level::try_from(value)
                    .map_err(|e| RepositoryError::Database(sqlx::Error::Decode(Box::new(e))))
            })
            .transpose()
    }

    async fn list_students(&self) -> RepositoryResult<Vec<StudentProfile>> {
        let students = sqlx::query_as::<_, StudentProfile>(&format!(
            "{STUDENT_PROFILE_COLUMNS} ORDER BY u.last_name, u.first_name"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(students)
    }

    async fn find_student(&self, user_id: i64) -> RepositoryResult<Option<StudentProfile>> {
        let student =
            sqlx::query_as::<_, StudentProfile>(&format!("{STUDENT_PROFILE_COLUMNS} WHERE u.id = ?"))
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(student)
    }

    async fn find_student_by_email(
        &self,
        email: &str,
    ) -> RepositoryResult<Option<StudentProfile>> {
        let student = sqlx::query_as::<_, StudentProfile>(&format!(
            "{STUDENT_PROFILE_COLUMNS} WHERE u.email = ?"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(student)
    }

    async fn list_admins(&self) -> RepositoryResult<Vec<AdminProfile>> {
        let admins = sqlx::query_as::<_, AdminProfile>(&format!(
            "{ADMIN_PROFILE_COLUMNS} ORDER BY u.last_name, u.first_name"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(admins)
    }

    async fn find_admin(&self, user_id: i64) -> RepositoryResult<Option<AdminProfile>> {
        let admin =
            sqlx::query_as::<_, AdminProfile>(&format!("{ADMIN_PROFILE_COLUMNS} WHERE u.id = ?"))
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(admin)
    }

    async fn update_account(
        &self,
        user_id: i64,
        role: Role,
        changes: AccountChanges,
    ) -> RepositoryResult<()> {
        let mut tx = self.pool.begin().await?;

        let exists = sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE id = ? AND role = ?")
            .bind(user_id)
            .bind(role)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(RepositoryError::NotFound);
        }

        sqlx::query(
            r#"
            UPDATE users
            SET first_name = ?,
                last_name = ?,
                phone_num = ?,
                email = ?,
                gender = ?,
                password_hash = COALESCE(?, password_hash),
                image = COALESCE(?, image)
            WHERE id = ?
            "#,
        )
        .bind(&changes.first_name)
        .bind(&changes.last_name)
        .bind(&changes.phone_num)
        .bind(&changes.email)
        .bind(&changes.gender)
        .bind(&changes.password_hash)
        .bind(&changes.image)
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(RepositoryError::from_write)?;

        if let (Role::Student, Some(level)) = (role, changes.level) {
            sqlx::query("UPDATE students SET level = ? WHERE user_id = ?")
                .bind(level.as_i64())
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn delete_account(&self, user_id: i64, role: Role) -> RepositoryResult<User> {
        let mut tx = self.pool.begin().await?;

        let user = sqlx::query_as::<_, User>(&format!("{USER_COLUMNS} WHERE id = ? AND role = ?"))
            .bind(user_id)
            .bind(role)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        let role_table = match role {
            Role::Student => "DELETE FROM students WHERE user_id = ?",
            Role::Admin => "DELETE FROM admins WHERE user_id = ?",
        };
        sqlx::query(role_table)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(user)
    }

    async fn update_password(&self, user_id: i64, password_hash: &str) -> RepositoryResult<()> {
        let result = sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
            .bind(password_hash)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_pool;

    fn student(email: &str) -> NewAccount {
        NewAccount {
            first_name: "Laila".to_string(),
            last_name: "Fahmy".to_string(),
            phone_num: None,
            email: email.to_string(),
            password_hash: "hash".to_string(),
            gender: None,
            role: Role::Student,
            level: Some(Level::Second),
            image: Some("photo.png".to_string()),
        }
    }

    #[tokio::test]
    async fn create_account_adds_role_row() {
        let repo = SqliteUserRepository::new(create_test_pool().await);
        let user = repo.create_account(student("laila@example.com")).await.unwrap();

        assert_eq!(repo.find_student_level(user.id).await.unwrap(), Some(Level::Second));
        let profile = repo.find_student(user.id).await.unwrap().unwrap();
        assert_eq!(profile.email, "laila@example.com");
        assert!(repo.find_admin(user.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_email_is_already_exists() {
        let repo = SqliteUserRepository::new(create_test_pool().await);
        repo.create_account(student("dup@example.com")).await.unwrap();
        assert!(matches!(
            repo.create_account(student("dup@example.com")).await,
            Err(RepositoryError::AlreadyExists)
        ));
    }

    #[tokio::test]
    async fn failed_batch_rolls_back_earlier_rows() {
        let repo = SqliteUserRepository::new(create_test_pool().await);
        repo.create_account(student("taken@example.com")).await.unwrap();

        let failure = repo
            .create_accounts(vec![
                student("one@example.com"),
                student("two@example.com"),
                student("taken@example.com"),
            ])
            .await
            .unwrap_err();

        assert_eq!(failure.row, Some(2));
        assert_eq!(repo.list_students().await.unwrap().len(), 1);
        assert!(repo.find_by_email("one@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_without_password_or_image_keeps_them() {
        let repo = SqliteUserRepository::new(create_test_pool().await);
        let user = repo.create_account(student("keep@example.com")).await.unwrap();

        repo.update_account(
            user.id,
            Role::Student,
            AccountChanges {
                first_name: "Laila".to_string(),
                last_name: "Mostafa".to_string(),
                phone_num: Some("0100".to_string()),
                email: "keep@example.com".to_string(),
                gender: None,
                level: Some(Level::Fourth),
                password_hash: None,
                image: None,
            },
        )
        .await
        .unwrap();

        let updated = repo.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(updated.last_name, "Mostafa");
        assert_eq!(updated.password_hash, "hash");
        assert_eq!(updated.image.as_deref(), Some("photo.png"));
        assert_eq!(repo.find_student_level(user.id).await.unwrap(), Some(Level::Fourth));
    }

    #[tokio::test]
    async fn delete_requires_matching_role() {
        let repo = SqliteUserRepository::new(create_test_pool().await);
        let user = repo.create_account(student("gone@example.com")).await.unwrap();

        assert!(matches!(
            repo.delete_account(user.id, Role::Admin).await,
            Err(RepositoryError::NotFound)
        ));

        let removed = repo.delete_account(user.id, Role::Student).await.unwrap();
        assert_eq!(removed.image.as_deref(), Some("photo.png"));
        assert!(repo.find_by_id(user.id).await.unwrap().is_none());
        assert!(repo.find_student_level(user.id).await.unwrap().is_none());
    }
}
