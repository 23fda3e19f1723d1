use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use checklist_core::{ChecklistError, ChecklistResult, TableName, Task, TaskScope, TaskSection};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};

use super::{ChecklistStore, UserRecord};
use crate::queries::Queries;

pub struct PostgresStore {
    pub pool: PgPool,
}

impl PostgresStore {
    /// Build a pool without connecting. An unreachable server shows up as
    /// failed queries later instead of failing startup.
    pub fn connect_lazy(database_url: &str, api_key: &str) -> Result<Self, sqlx::Error> {
        let options = PgConnectOptions::from_str(database_url)?.password(api_key);
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(5))
            .connect_lazy_with(options);

        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn read_error(err: sqlx::Error) -> ChecklistError {
    ChecklistError::QueryFailed(err.to_string())
}

fn write_error(err: sqlx::Error) -> ChecklistError {
    ChecklistError::PersistFailed(err.to_string())
}

fn parse_section(row: &PgRow) -> Result<TaskSection, sqlx::Error> {
    Ok(TaskSection {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        order_index: row.try_get("order_index")?,
    })
}

fn parse_task(row: &PgRow) -> Result<Task, sqlx::Error> {
    Ok(Task {
        id: row.try_get("id")?,
        section_id: row.try_get("section_id")?,
        title: row.try_get("title")?,
        completed: row.try_get::<Option<bool>, _>("completed")?.unwrap_or(false),
        order_index: row.try_get("order_index")?,
    })
}

fn parse_user(row: &PgRow) -> Result<UserRecord, sqlx::Error> {
    let created_at: Option<DateTime<Utc>> = row.try_get("created_at")?;
    let updated_at: Option<DateTime<Utc>> = row.try_get("updated_at")?;
    let created_at = created_at.unwrap_or_else(Utc::now);

    Ok(UserRecord {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        password_hash: row.try_get("password_hash")?,
        created_at,
        updated_at: updated_at.unwrap_or(created_at),
    })
}

#[async_trait]
impl ChecklistStore for PostgresStore {
    async fn probe(&self, table: TableName) -> ChecklistResult<()> {
        sqlx::query(Queries::probe(table))
            .fetch_optional(&self.pool)
            .await
            .map_err(read_error)?;
        Ok(())
    }

    async fn list_sections(&self) -> ChecklistResult<Vec<TaskSection>> {
        let rows = sqlx::query(Queries::LIST_SECTIONS)
            .fetch_all(&self.pool)
            .await
            .map_err(read_error)?;

        rows.iter()
            .map(parse_section)
            .collect::<Result<Vec<_>, _>>()
            .map_err(read_error)
    }

    async fn list_tasks(&self, scope: TaskScope) -> ChecklistResult<Vec<Task>> {
        let query = match scope {
            TaskScope::Shared => sqlx::query(Queries::LIST_SHARED_TASKS),
            TaskScope::Owner(user_id) => sqlx::query(Queries::LIST_USER_TASKS).bind(user_id),
        };
        let rows = query.fetch_all(&self.pool).await.map_err(read_error)?;

        rows.iter()
            .map(parse_task)
            .collect::<Result<Vec<_>, _>>()
            .map_err(read_error)
    }

    async fn has_sections(&self) -> ChecklistResult<bool> {
        let row = sqlx::query(Queries::PROBE_TASK_SECTIONS)
            .fetch_optional(&self.pool)
            .await
            .map_err(read_error)?;
        Ok(row.is_some())
    }

    async fn count_tasks(&self, scope: TaskScope) -> ChecklistResult<i64> {
        let query = match scope {
            TaskScope::Shared => sqlx::query_scalar::<_, i64>(Queries::COUNT_SHARED_TASKS),
            TaskScope::Owner(user_id) => {
                sqlx::query_scalar::<_, i64>(Queries::COUNT_USER_TASKS).bind(user_id)
            }
        };
        query.fetch_one(&self.pool).await.map_err(read_error)
    }

    async fn set_completed(&self, task_id: &str, completed: bool) -> ChecklistResult<u64> {
        let result = sqlx::query(Queries::SET_COMPLETED)
            .bind(task_id)
            .bind(completed)
            .execute(&self.pool)
            .await
            .map_err(write_error)?;

        Ok(result.rows_affected())
    }

    async fn upsert_seed(
        &self,
        sections: &[TaskSection],
        tasks: &[Task],
        owner: Option<i64>,
    ) -> ChecklistResult<()> {
        let mut tx = self.pool.begin().await.map_err(write_error)?;

        for section in sections {
            sqlx::query(Queries::UPSERT_SECTION)
                .bind(&section.id)
                .bind(&section.title)
                .bind(section.order_index)
                .execute(&mut *tx)
                .await
                .map_err(write_error)?;
        }

        for task in tasks {
            sqlx::query(Queries::UPSERT_TASK)
                .bind(&task.id)
                .bind(&task.section_id)
                .bind(owner)
                .bind(&task.title)
                .bind(task.completed)
                .bind(task.order_index)
                .execute(&mut *tx)
                .await
                .map_err(write_error)?;
        }

        tx.commit().await.map_err(write_error)
    }

    async fn insert_tasks(&self, tasks: &[Task], owner: Option<i64>) -> ChecklistResult<()> {
        let mut tx = self.pool.begin().await.map_err(write_error)?;

        for task in tasks {
            sqlx::query(Queries::INSERT_TASK)
                .bind(&task.id)
                .bind(&task.section_id)
                .bind(owner)
                .bind(&task.title)
                .bind(task.completed)
                .bind(task.order_index)
                .execute(&mut *tx)
                .await
                .map_err(write_error)?;
        }

        tx.commit().await.map_err(write_error)
    }

    async fn find_user(&self, username: &str) -> ChecklistResult<Option<UserRecord>> {
        let row = sqlx::query(Queries::FIND_USER_BY_USERNAME)
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(read_error)?;

        row.as_ref().map(parse_user).transpose().map_err(read_error)
    }

    async fn insert_user(&self, username: &str, password_hash: &str) -> ChecklistResult<UserRecord> {
        let row = sqlx::query(Queries::CREATE_USER)
            .bind(username)
            .bind(password_hash)
            .fetch_one(&self.pool)
            .await
            .map_err(|err| match err {
                sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                    ChecklistError::DuplicateUsername
                }
                other => write_error(other),
            })?;

        parse_user(&row).map_err(read_error)
    }
}
