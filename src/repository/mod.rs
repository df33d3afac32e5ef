//! Persistence traits the services are written against.
//!
//! `PgStore` is the production implementation; `MemoryStore` keeps the same
//! semantics in process and backs the integration tests.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::AppError;
use crate::models::{NewTodo, NewUser, Todo, TodoFilter, TodoStatistics, TodoStatus, User};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Backing-store reachability, reported by `/ready`.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn ping(&self) -> Result<(), AppError>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `Conflict` when the username or email is already taken.
    async fn create(&self, user: NewUser) -> Result<User, AppError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError>;

    /// Persists email, avatar, password hash and status. Fails with `Conflict` on a
    /// taken email.
    async fn update(&self, user: &User) -> Result<User, AppError>;
}

#[async_trait]
pub trait TodoRepository: Send + Sync {
    async fn create(&self, todo: NewTodo) -> Result<Todo, AppError>;

    /// Looks a todo up regardless of owner. Soft-deleted rows are `None`.
    async fn find_by_id(&self, id: i64) -> Result<Option<Todo>, AppError>;

    /// One page of the owner's todos plus the total number of matching rows.
    async fn list_by_owner(
        &self,
        owner_id: i64,
        filter: &TodoFilter,
    ) -> Result<(Vec<Todo>, u64), AppError>;

    async fn update(&self, todo: &Todo) -> Result<Todo, AppError>;

    /// Returns false when no live todo with this id belongs to `owner_id`.
    async fn soft_delete(&self, id: i64, owner_id: i64) -> Result<bool, AppError>;

    /// Sets `status` on every id in `ids` that belongs to `owner_id`; other ids are
    /// ignored. Returns the number of rows changed.
    async fn batch_update_status(
        &self,
        owner_id: i64,
        ids: &[i64],
        status: TodoStatus,
        now: DateTime<Utc>,
    ) -> Result<u64, AppError>;

    async fn statistics(&self, owner_id: i64) -> Result<TodoStatistics, AppError>;
}
