use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};

use crate::error::AppError;
use crate::models::{
    NewTodo, NewUser, Todo, TodoFilter, TodoPriority, TodoStatistics, TodoStatus, User,
    UserStatus,
};
use crate::repository::{HealthCheck, TodoRepository, UserRepository};

const USER_COLUMNS: &str =
    "id, username, email, password_hash, avatar_url, status, created_at, updated_at";

const TODO_COLUMNS: &str = "id, user_id, title, description, status, priority, due_date, \
     completed_at, created_at, updated_at";

/// PostgreSQL-backed store. Schema lives in `migrations/`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HealthCheck for PgStore {
    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: i64,
    username: String,
    email: String,
    password_hash: String,
    avatar_url: Option<String>,
    status: i16,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let status = UserStatus::from_id(row.status).ok_or_else(|| {
            AppError::Database(format!("user {} has unknown status {}", row.id, row.status))
        })?;
        Ok(User {
            id: row.id,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            avatar_url: row.avatar_url,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct TodoRow {
    id: i64,
    user_id: i64,
    title: String,
    description: Option<String>,
    status: i16,
    priority: i16,
    due_date: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TodoRow> for Todo {
    type Error = AppError;

    fn try_from(row: TodoRow) -> Result<Self, Self::Error> {
        let status = TodoStatus::from_id(row.status).ok_or_else(|| {
            AppError::Database(format!("todo {} has unknown status {}", row.id, row.status))
        })?;
        let priority = TodoPriority::from_id(row.priority).ok_or_else(|| {
            AppError::Database(format!("todo {} has unknown priority {}", row.id, row.priority))
        })?;
        Ok(Todo {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            description: row.description,
            status,
            priority,
            due_date: row.due_date,
            completed_at: row.completed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Translates unique violations on the users table into `Conflict`.
fn map_user_error(error: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_error) = &error {
        if db_error.is_unique_violation() {
            return match db_error.constraint() {
                Some("users_username_key") => AppError::Conflict("username already exists".into()),
                Some("users_email_key") => AppError::Conflict("email already exists".into()),
                _ => AppError::Conflict("user already exists".into()),
            };
        }
    }
    error.into()
}

/// Escapes `LIKE` wildcards so the keyword is matched literally.
fn escape_like(keyword: &str) -> String {
    let mut escaped = String::with_capacity(keyword.len());
    for c in keyword.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, owner_id: i64, filter: &TodoFilter) {
    builder
        .push(" WHERE deleted_at IS NULL AND user_id = ")
        .push_bind(owner_id);

    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status.id());
    }
    if let Some(priority) = filter.priority {
        builder.push(" AND priority = ").push_bind(priority.id());
    }
    if let Some(keyword) = &filter.keyword {
        let pattern = format!("%{}%", escape_like(keyword));
        builder
            .push(" AND (title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

fn to_count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or_default()
}

#[async_trait]
impl UserRepository for PgStore {
    async fn create(&self, user: NewUser) -> Result<User, AppError> {
        let sql = format!(
            "INSERT INTO users (username, email, password_hash) VALUES ($1, $2, $3) RETURNING {}",
            USER_COLUMNS
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .fetch_one(&self.pool)
            .await
            .map_err(map_user_error)?;

        row.try_into()
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {} FROM users WHERE username = $1", USER_COLUMNS);
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn update(&self, user: &User) -> Result<User, AppError> {
        let sql = format!(
            "UPDATE users SET email = $1, avatar_url = $2, password_hash = $3, status = $4, \
             updated_at = $5 WHERE id = $6 RETURNING {}",
            USER_COLUMNS
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(&user.email)
            .bind(&user.avatar_url)
            .bind(&user.password_hash)
            .bind(user.status.id())
            .bind(user.updated_at)
            .bind(user.id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_user_error)?
            .ok_or_else(|| AppError::NotFound("user not found".into()))?;

        row.try_into()
    }
}

#[async_trait]
impl TodoRepository for PgStore {
    async fn create(&self, todo: NewTodo) -> Result<Todo, AppError> {
        let sql = format!(
            "INSERT INTO todos (user_id, title, description, status, priority, due_date, \
             completed_at, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8) RETURNING {}",
            TODO_COLUMNS
        );
        let row = sqlx::query_as::<_, TodoRow>(&sql)
            .bind(todo.user_id)
            .bind(&todo.title)
            .bind(&todo.description)
            .bind(todo.status.id())
            .bind(todo.priority.id())
            .bind(todo.due_date)
            .bind(todo.completed_at)
            .bind(todo.created_at)
            .fetch_one(&self.pool)
            .await?;

        row.try_into()
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Todo>, AppError> {
        let sql = format!(
            "SELECT {} FROM todos WHERE id = $1 AND deleted_at IS NULL",
            TODO_COLUMNS
        );
        sqlx::query_as::<_, TodoRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Todo::try_from)
            .transpose()
    }

    async fn list_by_owner(
        &self,
        owner_id: i64,
        filter: &TodoFilter,
    ) -> Result<(Vec<Todo>, u64), AppError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM todos");
        push_filter(&mut count, owner_id, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut page = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM todos", TODO_COLUMNS));
        push_filter(&mut page, owner_id, filter);
        page.push(" ORDER BY due_date ASC NULLS LAST, priority DESC, created_at DESC LIMIT ")
            .push_bind(i64::from(filter.page_size))
            .push(" OFFSET ")
            .push_bind(i64::try_from(filter.offset()).unwrap_or(i64::MAX));

        let todos = page
            .build_query_as::<TodoRow>()
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Todo::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((todos, to_count(total)))
    }

    async fn update(&self, todo: &Todo) -> Result<Todo, AppError> {
        let sql = format!(
            "UPDATE todos SET title = $1, description = $2, status = $3, priority = $4, \
             due_date = $5, completed_at = $6, updated_at = $7 \
             WHERE id = $8 AND deleted_at IS NULL RETURNING {}",
            TODO_COLUMNS
        );
        let row = sqlx::query_as::<_, TodoRow>(&sql)
            .bind(&todo.title)
            .bind(&todo.description)
            .bind(todo.status.id())
            .bind(todo.priority.id())
            .bind(todo.due_date)
            .bind(todo.completed_at)
            .bind(todo.updated_at)
            .bind(todo.id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("todo not found".into()))?;

        row.try_into()
    }

    async fn soft_delete(&self, id: i64, owner_id: i64) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE todos SET deleted_at = $1, updated_at = $1 \
             WHERE id = $2 AND user_id = $3 AND deleted_at IS NULL",
        )
        .bind(Utc::now())
        .bind(id)
        .bind(owner_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn batch_update_status(
        &self,
        owner_id: i64,
        ids: &[i64],
        status: TodoStatus,
        now: DateTime<Utc>,
    ) -> Result<u64, AppError> {
        // Same completion rule as a single update, evaluated per row.
        let result = sqlx::query(
            "UPDATE todos SET status = $1, \
             completed_at = CASE WHEN $2 THEN COALESCE(completed_at, $3) ELSE NULL END, \
             updated_at = $3 \
             WHERE user_id = $4 AND id = ANY($5) AND deleted_at IS NULL",
        )
        .bind(status.id())
        .bind(status == TodoStatus::Completed)
        .bind(now)
        .bind(owner_id)
        .bind(ids)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn statistics(&self, owner_id: i64) -> Result<TodoStatistics, AppError> {
        let rows: Vec<(i16, i64)> = sqlx::query_as(
            "SELECT status, COUNT(*) FROM todos \
             WHERE user_id = $1 AND deleted_at IS NULL GROUP BY status",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        let mut stats = TodoStatistics::default();
        for (status, count) in rows {
            let count = to_count(count);
            stats.total_count += count;
            match TodoStatus::from_id(status) {
                Some(TodoStatus::Pending) => stats.pending_count += count,
                Some(TodoStatus::InProgress) => stats.in_progress_count += count,
                Some(TodoStatus::Completed) => stats.completed_count += count,
                None => log::warn!("ignoring {} todos with unknown status {}", count, status),
            }
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("milk"), "milk");
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }

    #[test]
    fn test_unknown_status_row_is_rejected() {
        let now = Utc::now();
        let row = TodoRow {
            id: 1,
            user_id: 1,
            title: "t".into(),
            description: None,
            status: 9,
            priority: 1,
            due_date: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        };
        assert!(Todo::try_from(row).is_err());
    }
}
