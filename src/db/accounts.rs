//! Account repository.
//!
//! Handles account creation, credential lookup for basic-auth login and the
//! login timestamp.

use super::DbError;
use crate::security::password::hash_password;
use sqlx::{SqliteConnection, SqlitePool};

/// An account, without its password hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: i64,
    pub email: String,
    pub role_id: i64,
    pub created_at: i64,
    pub last_login_at: Option<i64>,
}

/// What credential verification needs to know about an account.
#[derive(Debug, Clone)]
pub struct StoredCredential {
    pub user_id: i64,
    pub email: String,
    pub role_id: i64,
    /// Argon2 PHC string; carries the per-account salt.
    pub password_hash: String,
}

type AccountRow = (i64, String, i64, i64, Option<i64>);

fn account_from_row((id, email, role_id, created_at, last_login_at): AccountRow) -> Account {
    Account {
        id,
        email,
        role_id,
        created_at,
        last_login_at,
    }
}

/// Repository for account operations.
pub struct AccountRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> AccountRepository<'a> {
    /// Create a new account repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create an account. The password is hashed with a fresh salt.
    pub async fn create(&self, email: &str, password: &str, role_id: i64) -> Result<Account, DbError> {
        let password_hash = hash_password(password).map_err(|_| DbError::PasswordHash)?;
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            INSERT INTO accounts (email, password_hash, role_id, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(email)
        .bind(&password_hash)
        .bind(role_id)
        .bind(now)
        .execute(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e {
                if db_err.is_unique_violation() {
                    return DbError::AccountExists(email.to_string());
                }
                if db_err.is_foreign_key_violation() {
                    return DbError::RoleNotFound(role_id);
                }
            }
            DbError::from(e)
        })?;

        Ok(Account {
            id: result.last_insert_rowid(),
            email: email.to_string(),
            role_id,
            created_at: now,
            last_login_at: None,
        })
    }

    /// Find account by ID.
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Account>, DbError> {
        let mut conn = self.pool.acquire().await?;
        load_account(&mut conn, id).await
    }

    /// Find account by email (case-insensitive).
    pub async fn find_by_email(&self, email: &str) -> Result<Option<Account>, DbError> {
        let row = sqlx::query_as::<_, AccountRow>(
            r#"
            SELECT id, email, role_id, created_at, last_login_at
            FROM accounts
            WHERE email = ? COLLATE NOCASE
            "#,
        )
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(account_from_row))
    }

    /// Fetch the stored credential for an email, if the account exists.
    pub async fn find_credential(&self, email: &str) -> Result<Option<StoredCredential>, DbError> {
        let row = sqlx::query_as::<_, (i64, String, i64, String)>(
            r#"
            SELECT id, email, role_id, password_hash
            FROM accounts
            WHERE email = ? COLLATE NOCASE
            "#,
        )
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(|(user_id, email, role_id, password_hash)| StoredCredential {
            user_id,
            email,
            role_id,
            password_hash,
        }))
    }

    /// Record a successful login.
    pub async fn touch_login(&self, id: i64) -> Result<i64, DbError> {
        let now = chrono::Utc::now().timestamp();
        let result = sqlx::query("UPDATE accounts SET last_login_at = ? WHERE id = ?")
            .bind(now)
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::AccountNotFound(id));
        }
        Ok(now)
    }

    /// Replace an account's password. A new salt is generated.
    pub async fn set_password(&self, id: i64, password: &str) -> Result<(), DbError> {
        let password_hash = hash_password(password).map_err(|_| DbError::PasswordHash)?;
        let result = sqlx::query("UPDATE accounts SET password_hash = ? WHERE id = ?")
            .bind(password_hash)
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::AccountNotFound(id));
        }
        Ok(())
    }
}

/// Load an account on an existing connection (or transaction).
pub(crate) async fn load_account(
    conn: &mut SqliteConnection,
    id: i64,
) -> Result<Option<Account>, DbError> {
    let row = sqlx::query_as::<_, AccountRow>(
        r#"
        SELECT id, email, role_id, created_at, last_login_at
        FROM accounts
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(account_from_row))
}
