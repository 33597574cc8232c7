use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};
use tracing::{debug, info};
use uuid::Uuid;

use super::errors::RepositoryError;
use crate::database::DatabasePool;
use crate::models::user::{NewUser, ProfileChanges, UserRow};

const USER_COLUMNS: &str = "id, full_name, email, image, password_hash, created_at, updated_at";

fn map_user(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        full_name: row.get(1)?,
        email: row.get(2)?,
        image: row.get(3)?,
        password_hash: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn select_user(
    conn: &rusqlite::Connection,
    column: &str,
    value: &str,
) -> Result<Option<UserRow>, RepositoryError> {
    let sql = format!("SELECT {} FROM users WHERE {} = ?1", USER_COLUMNS, column);
    Ok(conn.query_row(&sql, [value], map_user).optional()?)
}

/// Repository for user accounts
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: DatabasePool,
}

impl UserRepository {
    /// Create a new repository
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    /// Insert a user; fails with `Conflict` when the email is taken
    pub async fn create(&self, new_user: NewUser) -> Result<UserRow, RepositoryError> {
        let id = Uuid::new_v4().to_string();
        debug!("Creating user {}", id);

        self.pool
            .run(move |conn| {
                let now = Utc::now().to_rfc3339();
                conn.execute(
                    "INSERT INTO users (id, full_name, email, image, password_hash, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                    params![
                        id,
                        new_user.full_name,
                        new_user.email,
                        new_user.image,
                        new_user.password_hash,
                        now
                    ],
                )
                .map_err(|e| RepositoryError::from_write(e, "Email already registered"))?;

                select_user(conn, "id", &id)?
                    .ok_or_else(|| RepositoryError::NotFound(format!("User {}", id)))
            })
            .await
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<UserRow>, RepositoryError> {
        let id = id.to_string();
        self.pool.run(move |conn| select_user(conn, "id", &id)).await
    }

    /// Look up a user by (already normalised) email
    pub async fn find_by_email(&self, email: &str) -> Result<Option<UserRow>, RepositoryError> {
        let email = email.to_string();
        self.pool.run(move |conn| select_user(conn, "email", &email)).await
    }

    /// Apply a partial profile update, returning the updated row or `None` for an unknown id
    pub async fn update_profile(
        &self,
        id: &str,
        changes: ProfileChanges,
    ) -> Result<Option<UserRow>, RepositoryError> {
        let id = id.to_string();
        self.pool
            .run(move |conn| {
                let updated = conn
                    .execute(
                        "UPDATE users
                         SET full_name = COALESCE(?2, full_name),
                             email = COALESCE(?3, email),
                             image = COALESCE(?4, image),
                             updated_at = ?5
                         WHERE id = ?1",
                        params![
                            id,
                            changes.full_name,
                            changes.email,
                            changes.image,
                            Utc::now().to_rfc3339()
                        ],
                    )
                    .map_err(|e| RepositoryError::from_write(e, "Email already in use"))?;

                if updated == 0 {
                    return Ok(None);
                }
                select_user(conn, "id", &id)
            })
            .await
    }

    /// Replace the stored password hash; returns false for an unknown id
    pub async fn update_password(&self, id: &str, password_hash: String) -> Result<bool, RepositoryError> {
        let id = id.to_string();
        self.pool
            .run(move |conn| {
                let updated = conn.execute(
                    "UPDATE users SET password_hash = ?2, updated_at = ?3 WHERE id = ?1",
                    params![id, password_hash, Utc::now().to_rfc3339()],
                )?;
                Ok(updated > 0)
            })
            .await
    }

    /// Delete a user. Section rows go with it through `ON DELETE CASCADE`.
    pub async fn delete(&self, id: &str) -> Result<bool, RepositoryError> {
        let id = id.to_string();
        self.pool
            .run(move |conn| {
                let deleted = conn.execute("DELETE FROM users WHERE id = ?1", [&id])?;
                if deleted > 0 {
                    info!("Deleted user {}", id);
                }
                Ok(deleted > 0)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            full_name: "Grace Hopper".to_string(),
            email: email.to_string(),
            image: None,
            password_hash: "hash".to_string(),
        }
    }

    fn repository() -> UserRepository {
        UserRepository::new(DatabasePool::in_memory().unwrap())
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let repo = repository();
        let created = repo.create(new_user("grace@example.com")).await.unwrap();

        let by_id = repo.find_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(by_id, created);

        let by_email = repo.find_by_email("grace@example.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, created.id);

        assert!(repo.find_by_email("nobody@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_is_conflict() {
        let repo = repository();
        repo.create(new_user("grace@example.com")).await.unwrap();

        let err = repo.create(new_user("grace@example.com")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_update_profile_keeps_missing_fields() {
        let repo = repository();
        let created = repo.create(new_user("grace@example.com")).await.unwrap();

        let updated = repo
            .update_profile(
                &created.id,
                ProfileChanges {
                    image: Some("https://img.example.com/grace.png".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.full_name, "Grace Hopper");
        assert_eq!(updated.email, "grace@example.com");
        assert_eq!(updated.image.as_deref(), Some("https://img.example.com/grace.png"));
        assert!(updated.updated_at >= created.updated_at);
    }

    #[tokio::test]
    async fn test_update_profile_email_conflict() {
        let repo = repository();
        repo.create(new_user("first@example.com")).await.unwrap();
        let second = repo.create(new_user("second@example.com")).await.unwrap();

        let err = repo
            .update_profile(
                &second.id,
                ProfileChanges {
                    email: Some("first@example.com".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_update_password_and_delete() {
        let repo = repository();
        let created = repo.create(new_user("grace@example.com")).await.unwrap();

        assert!(repo.update_password(&created.id, "new-hash".to_string()).await.unwrap());
        let reloaded = repo.find_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(reloaded.password_hash, "new-hash");

        assert!(repo.delete(&created.id).await.unwrap());
        assert!(!repo.delete(&created.id).await.unwrap());
        assert!(repo.find_by_id(&created.id).await.unwrap().is_none());
        assert!(!repo.update_password(&created.id, "x".to_string()).await.unwrap());
    }
}
