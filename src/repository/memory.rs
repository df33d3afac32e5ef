use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::error::AppError;
use crate::models::{
    completion_timestamp, NewTodo, NewUser, Todo, TodoFilter, TodoStatistics, TodoStatus, User,
    UserStatus,
};
use crate::repository::{HealthCheck, TodoRepository, UserRepository};

#[derive(Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    todos: BTreeMap<i64, StoredTodo>,
    next_user_id: i64,
    next_todo_id: i64,
    offline: bool,
}

struct StoredTodo {
    todo: Todo,
    deleted_at: Option<DateTime<Utc>>,
}

impl StoredTodo {
    fn live(&self) -> Option<&Todo> {
        self.deleted_at.is_none().then_some(&self.todo)
    }
}

/// In-process store with the same observable behavior as `PgStore`.
///
/// Ids start at 1 and are never reused. Every operation holds the lock for its
/// whole duration, so uniqueness checks and inserts are atomic.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a user disabled. There is no API for this; it exists for tests and
    /// administrative tooling.
    pub async fn set_user_status(&self, id: i64, status: UserStatus) -> bool {
        let mut tables = self.tables.write().await;
        match tables.users.get_mut(&id) {
            Some(user) => {
                user.status = status;
                true
            }
            None => false,
        }
    }

    /// Makes `ping` fail until called again with `false`.
    pub async fn set_offline(&self, offline: bool) {
        self.tables.write().await.offline = offline;
    }
}

#[async_trait]
impl HealthCheck for MemoryStore {
    async fn ping(&self) -> Result<(), AppError> {
        if self.tables.read().await.offline {
            return Err(AppError::Database("memory store is offline".into()));
        }
        Ok(())
    }
}

fn matches_filter(todo: &Todo, filter: &TodoFilter) -> bool {
    if filter.status.is_some_and(|s| s != todo.status) {
        return false;
    }
    if filter.priority.is_some_and(|p| p != todo.priority) {
        return false;
    }
    match &filter.keyword {
        Some(keyword) => {
            let keyword = keyword.to_lowercase();
            todo.title.to_lowercase().contains(&keyword)
                || todo
                    .description
                    .as_ref()
                    .is_some_and(|d| d.to_lowercase().contains(&keyword))
        }
        None => true,
    }
}

/// Due date ascending with undated last, then priority descending, then newest first.
fn list_order(a: &Todo, b: &Todo) -> std::cmp::Ordering {
    let due = match (a.due_date, b.due_date) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    };
    due.then_with(|| b.priority.id().cmp(&a.priority.id()))
        .then_with(|| b.created_at.cmp(&a.created_at))
        .then_with(|| b.id.cmp(&a.id))
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create(&self, user: NewUser) -> Result<User, AppError> {
        let mut tables = self.tables.write().await;

        if tables.users.values().any(|u| u.username == user.username) {
            return Err(AppError::Conflict("username already exists".into()));
        }
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(AppError::Conflict("email already exists".into()));
        }

        tables.next_user_id += 1;
        let now = Utc::now();
        let created = User {
            id: tables.next_user_id,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            avatar_url: None,
            status: UserStatus::Active,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn update(&self, user: &User) -> Result<User, AppError> {
        let mut tables = self.tables.write().await;

        if tables
            .users
            .values()
            .any(|u| u.id != user.id && u.email == user.email)
        {
            return Err(AppError::Conflict("email already exists".into()));
        }

        let stored = tables
            .users
            .get_mut(&user.id)
            .ok_or_else(|| AppError::NotFound("user not found".into()))?;
        stored.email = user.email.clone();
        stored.avatar_url = user.avatar_url.clone();
        stored.password_hash = user.password_hash.clone();
        stored.status = user.status;
        stored.updated_at = user.updated_at;
        Ok(stored.clone())
    }
}

#[async_trait]
impl TodoRepository for MemoryStore {
    async fn create(&self, todo: NewTodo) -> Result<Todo, AppError> {
        let mut tables = self.tables.write().await;
        tables.next_todo_id += 1;

        let created = Todo {
            id: tables.next_todo_id,
            user_id: todo.user_id,
            title: todo.title,
            description: todo.description,
            status: todo.status,
            priority: todo.priority,
            due_date: todo.due_date,
            completed_at: todo.completed_at,
            created_at: todo.created_at,
            updated_at: todo.created_at,
        };
        tables.todos.insert(
            created.id,
            StoredTodo {
                todo: created.clone(),
                deleted_at: None,
            },
        );
        Ok(created)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Todo>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.todos.get(&id).and_then(StoredTodo::live).cloned())
    }

    async fn list_by_owner(
        &self,
        owner_id: i64,
        filter: &TodoFilter,
    ) -> Result<(Vec<Todo>, u64), AppError> {
        let tables = self.tables.read().await;

        let mut matching: Vec<&Todo> = tables
            .todos
            .values()
            .filter_map(StoredTodo::live)
            .filter(|t| t.user_id == owner_id && matches_filter(t, filter))
            .collect();
        matching.sort_by(|a, b| list_order(a, b));

        let total = matching.len() as u64;
        let offset = usize::try_from(filter.offset()).unwrap_or(usize::MAX);
        let page = matching
            .into_iter()
            .skip(offset)
            .take(filter.page_size as usize)
            .cloned()
            .collect();

        Ok((page, total))
    }

    async fn update(&self, todo: &Todo) -> Result<Todo, AppError> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .todos
            .get_mut(&todo.id)
            .filter(|s| s.deleted_at.is_none())
            .ok_or_else(|| AppError::NotFound("todo not found".into()))?;

        // Owner is fixed at creation.
        let owner = stored.todo.user_id;
        stored.todo = Todo {
            user_id: owner,
            ..todo.clone()
        };
        Ok(stored.todo.clone())
    }

    async fn soft_delete(&self, id: i64, owner_id: i64) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        match tables.todos.get_mut(&id) {
            Some(stored) if stored.deleted_at.is_none() && stored.todo.user_id == owner_id => {
                let now = Utc::now();
                stored.deleted_at = Some(now);
                stored.todo.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn batch_update_status(
        &self,
        owner_id: i64,
        ids: &[i64],
        status: TodoStatus,
        now: DateTime<Utc>,
    ) -> Result<u64, AppError> {
        let mut tables = self.tables.write().await;
        let mut updated = 0;

        for stored in tables.todos.values_mut() {
            if stored.deleted_at.is_some()
                || stored.todo.user_id != owner_id
                || !ids.contains(&stored.todo.id)
            {
                continue;
            }
            let todo = &mut stored.todo;
            todo.completed_at = completion_timestamp(status, todo.completed_at, now);
            todo.status = status;
            todo.updated_at = now;
            updated += 1;
        }

        Ok(updated)
    }

    async fn statistics(&self, owner_id: i64) -> Result<TodoStatistics, AppError> {
        let tables = self.tables.read().await;
        let mut stats = TodoStatistics::default();
        for todo in tables
            .todos
            .values()
            .filter_map(StoredTodo::live)
            .filter(|t| t.user_id == owner_id)
        {
            stats.record(todo.status);
        }
        Ok(stats)
    }
}
