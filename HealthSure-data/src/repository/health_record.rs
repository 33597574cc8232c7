use chrono::Utc;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, OptionalExtension, TransactionBehavior};
use tracing::{debug, warn};
use uuid::Uuid;

use super::errors::RepositoryError;
use crate::database::DatabasePool;
use crate::models::health_record::{
    BasicInfoRow, HealthRecordRows, HealthStatusRow, LabResultRow, MedicalHistoryRow, NoteRow,
    SectionRow, StoredSection, TreatmentInfoRow,
};

fn select_section<T: SectionRow>(
    conn: &Connection,
    user_id: &str,
) -> Result<Option<StoredSection<T>>, RepositoryError> {
    let columns = T::COLUMNS.join(", ");
    let sql = format!(
        "SELECT id, user_id, {}, created_at, updated_at FROM {} WHERE user_id = ?1",
        columns,
        T::TABLE
    );
    let timestamps = 2 + T::COLUMNS.len();

    let section = conn
        .query_row(&sql, [user_id], |row| {
            Ok(StoredSection {
                id: row.get(0)?,
                user_id: row.get(1)?,
                data: T::from_row(row, 2)?,
                created_at: row.get(timestamps)?,
                updated_at: row.get(timestamps + 1)?,
            })
        })
        .optional()?;

    Ok(section)
}

fn user_exists(conn: &Connection, user_id: &str) -> Result<bool, RepositoryError> {
    Ok(conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1)",
        [user_id],
        |row| row.get::<_, bool>(0),
    )?)
}

fn update_sql<T: SectionRow>() -> String {
    let assignments: Vec<String> = T::COLUMNS
        .iter()
        .enumerate()
        .map(|(i, column)| format!("{} = ?{}", column, i + 1))
        .collect();
    let n = T::COLUMNS.len();
    format!(
        "UPDATE {} SET {}, updated_at = ?{} WHERE user_id = ?{}",
        T::TABLE,
        assignments.join(", "),
        n + 1,
        n + 2
    )
}

fn insert_sql<T: SectionRow>() -> String {
    let n = T::COLUMNS.len() + 4;
    let placeholders: Vec<String> = (1..=n).map(|i| format!("?{}", i)).collect();
    format!(
        "INSERT INTO {} (id, user_id, {}, created_at, updated_at) VALUES ({})",
        T::TABLE,
        T::COLUMNS.join(", "),
        placeholders.join(", ")
    )
}

/// Repository for the one-per-user health record sections
#[derive(Debug, Clone)]
pub struct HealthRecordRepository {
    pool: DatabasePool,
}

impl HealthRecordRepository {
    /// Create a new repository
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    /// Update the user's section if it exists, otherwise create it.
    ///
    /// Runs as a single write transaction: the owning user is checked, the section is
    /// looked up by `user_id`, then updated or inserted and read back. Any failure drops
    /// the transaction, which rolls it back. The returned flag is `true` when a new row
    /// was created.
    pub async fn upsert<T: SectionRow>(
        &self,
        user_id: &str,
        data: T,
    ) -> Result<(StoredSection<T>, bool), RepositoryError> {
        let user_id = user_id.to_string();

        self.pool
            .run(move |conn| {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

                if !user_exists(&tx, &user_id)? {
                    warn!("Rolling back {} upsert: user {} not found", T::TABLE, user_id);
                    return Err(RepositoryError::NotFound("User".to_string()));
                }

                let existing: Option<String> = tx
                    .query_row(
                        &format!("SELECT id FROM {} WHERE user_id = ?1", T::TABLE),
                        [&user_id],
                        |row| row.get(0),
                    )
                    .optional()?;

                let now = Value::Text(Utc::now().to_rfc3339());
                let created = existing.is_none();

                if created {
                    let mut values = vec![
                        Value::Text(Uuid::new_v4().to_string()),
                        Value::Text(user_id.clone()),
                    ];
                    values.extend(data.to_values());
                    values.push(now.clone());
                    values.push(now);
                    tx.execute(&insert_sql::<T>(), params_from_iter(values.iter()))
                        .map_err(|e| RepositoryError::from_write(e, T::TABLE))?;
                    debug!("Created {} row for user {}", T::TABLE, user_id);
                } else {
                    let mut values = data.to_values();
                    values.push(now);
                    values.push(Value::Text(user_id.clone()));
                    tx.execute(&update_sql::<T>(), params_from_iter(values.iter()))?;
                    debug!("Updated {} row for user {}", T::TABLE, user_id);
                }

                let stored = select_section::<T>(&tx, &user_id)?
                    .ok_or_else(|| RepositoryError::NotFound(T::TABLE.to_string()))?;

                tx.commit()?;
                Ok((stored, created))
            })
            .await
    }

    /// Fetch one section for a user
    pub async fn find<T: SectionRow>(
        &self,
        user_id: &str,
    ) -> Result<Option<StoredSection<T>>, RepositoryError> {
        let user_id = user_id.to_string();
        self.pool
            .run(move |conn| select_section::<T>(conn, &user_id))
            .await
    }

    /// Fetch every section for a user over a single connection
    pub async fn find_all(&self, user_id: &str) -> Result<HealthRecordRows, RepositoryError> {
        let user_id = user_id.to_string();
        self.pool
            .run(move |conn| {
                Ok(HealthRecordRows {
                    basic_info: select_section::<BasicInfoRow>(conn, &user_id)?,
                    health_status: select_section::<HealthStatusRow>(conn, &user_id)?,
                    medical_history: select_section::<MedicalHistoryRow>(conn, &user_id)?,
                    treatment_info: select_section::<TreatmentInfoRow>(conn, &user_id)?,
                    lab_result: select_section::<LabResultRow>(conn, &user_id)?,
                    note: select_section::<NoteRow>(conn, &user_id)?,
                })
            })
            .await
    }
}
