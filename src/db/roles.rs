//! Role repository.
//!
//! A role is a named set of per-resource grants. The grants of an account's
//! role are what end up encoded in its access token.

use super::DbError;
use crate::access::ResourcePermission;
use sqlx::{SqliteConnection, SqlitePool};

/// A role record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub id: i64,
    pub name: String,
}

/// Repository for role operations.
pub struct RoleRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> RoleRepository<'a> {
    /// Create a new role repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a role with no grants.
    pub async fn create(&self, name: &str) -> Result<Role, DbError> {
        let result = sqlx::query("INSERT INTO roles (name) VALUES (?)")
            .bind(name)
            .execute(self.pool)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.is_unique_violation()
                {
                    return DbError::RoleExists(name.to_string());
                }
                DbError::from(e)
            })?;

        Ok(Role {
            id: result.last_insert_rowid(),
            name: name.to_string(),
        })
    }

    /// Find a role by name.
    pub async fn find_by_name(&self, name: &str) -> Result<Option<Role>, DbError> {
        let row = sqlx::query_as::<_, (i64, String)>("SELECT id, name FROM roles WHERE name = ?")
            .bind(name)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(|(id, name)| Role { id, name }))
    }

    /// Grant (or replace) a role's access to one resource.
    pub async fn grant(&self, role_id: i64, permission: &ResourcePermission) -> Result<(), DbError> {
        sqlx::query(
            r#"
            INSERT INTO role_permissions (role_id, resource, readable, writable)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (role_id, resource)
            DO UPDATE SET readable = excluded.readable, writable = excluded.writable
            "#,
        )
        .bind(role_id)
        .bind(&permission.resource)
        .bind(permission.readable)
        .bind(permission.writable)
        .execute(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_foreign_key_violation()
            {
                return DbError::RoleNotFound(role_id);
            }
            DbError::from(e)
        })?;

        Ok(())
    }

    /// Remove a role's grant for one resource.
    pub async fn revoke(&self, role_id: i64, resource: &str) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM role_permissions WHERE role_id = ? AND resource = ?")
            .bind(role_id)
            .bind(resource)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Effective permissions of a role, ordered by resource name.
    pub async fn permissions(&self, role_id: i64) -> Result<Vec<ResourcePermission>, DbError> {
        let mut conn = self.pool.acquire().await?;
        load_permissions(&mut conn, role_id).await
    }
}

/// Load a role's grants on an existing connection (or transaction).
pub(crate) async fn load_permissions(
    conn: &mut SqliteConnection,
    role_id: i64,
) -> Result<Vec<ResourcePermission>, DbError> {
    let rows = sqlx::query_as::<_, (String, bool, bool)>(
        r#"
        SELECT resource, readable, writable
        FROM role_permissions
        WHERE role_id = ?
        ORDER BY resource ASC
        "#,
    )
    .bind(role_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(resource, readable, writable)| ResourcePermission {
            resource,
            readable,
            writable,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    #[tokio::test]
    async fn test_grants_are_ordered_by_resource() {
        let db = Database::new(":memory:").await.unwrap();
        let role = db.roles().create("editor").await.unwrap();

        db.roles()
            .grant(role.id, &ResourcePermission::read_write("users"))
            .await
            .unwrap();
        db.roles()
            .grant(role.id, &ResourcePermission::read("roles"))
            .await
            .unwrap();
        db.roles()
            .grant(role.id, &ResourcePermission::write("topics"))
            .await
            .unwrap();

        let permissions = db.roles().permissions(role.id).await.unwrap();
        let resources: Vec<_> = permissions.iter().map(|p| p.resource.as_str()).collect();
        assert_eq!(resources, vec!["roles", "topics", "users"]);
        assert!(permissions[2].readable && permissions[2].writable);
    }

    #[tokio::test]
    async fn test_grant_replaces_existing_row() {
        let db = Database::new(":memory:").await.unwrap();
        let role = db.roles().create("viewer").await.unwrap();

        db.roles()
            .grant(role.id, &ResourcePermission::read_write("users"))
            .await
            .unwrap();
        db.roles()
            .grant(role.id, &ResourcePermission::read("users"))
            .await
            .unwrap();

        let permissions = db.roles().permissions(role.id).await.unwrap();
        assert_eq!(permissions, vec![ResourcePermission::read("users")]);
    }

    #[tokio::test]
    async fn test_duplicate_role_name() {
        let db = Database::new(":memory:").await.unwrap();
        db.roles().create("admin").await.unwrap();

        let err = db.roles().create("admin").await.unwrap_err();
        assert!(matches!(err, DbError::RoleExists(name) if name == "admin"));
    }

    #[tokio::test]
    async fn test_grant_unknown_role() {
        let db = Database::new(":memory:").await.unwrap();
        let err = db
            .roles()
            .grant(42, &ResourcePermission::read("users"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::RoleNotFound(42)));
    }

    #[tokio::test]
    async fn test_revoke_grant() {
        let db = Database::new(":memory:").await.unwrap();
        let role = db.roles().create("viewer").await.unwrap();
        db.roles()
            .grant(role.id, &ResourcePermission::read("users"))
            .await
            .unwrap();

        assert!(db.roles().revoke(role.id, "users").await.unwrap());
        assert!(!db.roles().revoke(role.id, "users").await.unwrap());
        assert!(db.roles().permissions(role.id).await.unwrap().is_empty());
    }
}
