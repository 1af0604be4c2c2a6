//! Refresh-token records.
//!
//! One row per (account, device) holding the SHA-256 of the only refresh
//! token currently valid for that device. These functions take a connection
//! so issuance and rotation can run them inside their own transactions.

use super::DbError;
use sqlx::SqliteConnection;

/// Server-side state of one device session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshRecord {
    pub user_id: i64,
    pub device: String,
    pub token_hash: String,
    pub updated_at: i64,
}

/// Insert or overwrite the record for `(user_id, device)`.
pub async fn upsert(
    conn: &mut SqliteConnection,
    user_id: i64,
    device: &str,
    token_hash: &str,
) -> Result<(), DbError> {
    let now = chrono::Utc::now().timestamp();
    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (user_id, device, token_hash, updated_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT (user_id, device)
        DO UPDATE SET token_hash = excluded.token_hash, updated_at = excluded.updated_at
        "#,
    )
    .bind(user_id)
    .bind(device)
    .bind(token_hash)
    .bind(now)
    .execute(&mut *conn)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_foreign_key_violation()
        {
            return DbError::AccountNotFound(user_id);
        }
        DbError::from(e)
    })?;

    Ok(())
}

/// Take the write lock for `(user_id, device)` inside the caller's transaction.
///
/// SQLite has no row locks; a no-op write upgrades the transaction to a
/// writer, so concurrent rotations of the same record serialize here rather
/// than both reading the same hash.
pub async fn lock(conn: &mut SqliteConnection, user_id: i64, device: &str) -> Result<(), DbError> {
    sqlx::query("UPDATE refresh_tokens SET updated_at = updated_at WHERE user_id = ? AND device = ?")
        .bind(user_id)
        .bind(device)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Fetch the record for `(user_id, device)`.
pub async fn find(
    conn: &mut SqliteConnection,
    user_id: i64,
    device: &str,
) -> Result<Option<RefreshRecord>, DbError> {
    let row = sqlx::query_as::<_, (i64, String, String, i64)>(
        r#"
        SELECT user_id, device, token_hash, updated_at
        FROM refresh_tokens
        WHERE user_id = ? AND device = ?
        "#,
    )
    .bind(user_id)
    .bind(device)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(|(user_id, device, token_hash, updated_at)| RefreshRecord {
        user_id,
        device,
        token_hash,
        updated_at,
    }))
}

/// Replace the stored hash only if it still equals `current_hash`.
///
/// Returns `false` when another request rotated the record (or deleted it)
/// after `current_hash` was read.
pub async fn replace_if_current(
    conn: &mut SqliteConnection,
    user_id: i64,
    device: &str,
    current_hash: &str,
    new_hash: &str,
) -> Result<bool, DbError> {
    let now = chrono::Utc::now().timestamp();
    let result = sqlx::query(
        r#"
        UPDATE refresh_tokens
        SET token_hash = ?, updated_at = ?
        WHERE user_id = ? AND device = ? AND token_hash = ?
        "#,
    )
    .bind(new_hash)
    .bind(now)
    .bind(user_id)
    .bind(device)
    .bind(current_hash)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Delete the record for `(user_id, device)`, whatever hash it holds.
pub async fn revoke(conn: &mut SqliteConnection, user_id: i64, device: &str) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = ? AND device = ?")
        .bind(user_id)
        .bind(device)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Devices with a live session for an account, ordered by name.
pub async fn devices(conn: &mut SqliteConnection, user_id: i64) -> Result<Vec<String>, DbError> {
    let rows = sqlx::query_scalar::<_, String>(
        "SELECT device FROM refresh_tokens WHERE user_id = ? ORDER BY device ASC",
    )
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows)
}
