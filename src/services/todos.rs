use std::sync::Arc;

use chrono::Utc;

use crate::auth::{ensure_owner, AuthenticatedUser};
use crate::error::AppError;
use crate::models::{
    BatchUpdateResult, BatchUpdateStatusRequest, CreateTodoRequest, NewTodo, Pagination, Todo,
    TodoListResponse, TodoQuery, TodoResponse, TodoStatistics, TodoStatus, UpdateTodoRequest,
};
use crate::repository::TodoRepository;

/// Todo operations on behalf of an authenticated user.
///
/// Every id-addressed operation loads the todo and runs it through
/// `ensure_owner` before reading or mutating it. Status changes go through
/// `Todo::set_status` so `completed_at` always tracks `Completed`.
pub struct TodoService {
    todos: Arc<dyn TodoRepository>,
}

impl TodoService {
    pub fn new(todos: Arc<dyn TodoRepository>) -> Self {
        Self { todos }
    }

    async fn owned(&self, user: &AuthenticatedUser, id: i64) -> Result<Todo, AppError> {
        let todo = self.todos.find_by_id(id).await?;
        ensure_owner(user, todo, "todo")
    }

    pub async fn create(
        &self,
        user: &AuthenticatedUser,
        input: CreateTodoRequest,
    ) -> Result<TodoResponse, AppError> {
        let now = Utc::now();
        let todo = self.todos.create(NewTodo::new(input, user.id(), now)).await?;
        log::info!("user {} created todo {}", user.id(), todo.id);
        Ok(TodoResponse::from_todo(todo, now))
    }

    pub async fn get(&self, user: &AuthenticatedUser, id: i64) -> Result<TodoResponse, AppError> {
        let todo = self.owned(user, id).await?;
        Ok(TodoResponse::from_todo(todo, Utc::now()))
    }

    pub async fn list(
        &self,
        user: &AuthenticatedUser,
        query: TodoQuery,
    ) -> Result<TodoListResponse, AppError> {
        let filter = query.into_filter();
        let (todos, total) = self.todos.list_by_owner(user.id(), &filter).await?;
        let statistics = self.todos.statistics(user.id()).await?;

        let now = Utc::now();
        Ok(TodoListResponse {
            todos: todos
                .into_iter()
                .map(|todo| TodoResponse::from_todo(todo, now))
                .collect(),
            pagination: Pagination::new(&filter, total),
            statistics,
        })
    }

    pub async fn update(
        &self,
        user: &AuthenticatedUser,
        id: i64,
        input: UpdateTodoRequest,
    ) -> Result<TodoResponse, AppError> {
        let mut todo = self.owned(user, id).await?;
        let now = Utc::now();
        todo.apply_update(input, now);

        let todo = self.todos.update(&todo).await?;
        Ok(TodoResponse::from_todo(todo, now))
    }

    pub async fn delete(&self, user: &AuthenticatedUser, id: i64) -> Result<(), AppError> {
        self.owned(user, id).await?;

        // Gone between the ownership check and the delete.
        if !self.todos.soft_delete(id, user.id()).await? {
            return Err(AppError::NotFound("todo not found".into()));
        }

        log::info!("user {} deleted todo {}", user.id(), id);
        Ok(())
    }

    pub async fn update_status(
        &self,
        user: &AuthenticatedUser,
        id: i64,
        status: TodoStatus,
    ) -> Result<TodoResponse, AppError> {
        let mut todo = self.owned(user, id).await?;
        let now = Utc::now();
        todo.set_status(status, now);

        let todo = self.todos.update(&todo).await?;
        Ok(TodoResponse::from_todo(todo, now))
    }

    /// Applies `status` to the requested ids the caller owns. Ids that are missing,
    /// deleted or owned by someone else are skipped without error.
    pub async fn batch_update_status(
        &self,
        user: &AuthenticatedUser,
        input: BatchUpdateStatusRequest,
    ) -> Result<BatchUpdateResult, AppError> {
        let mut ids = input.todo_ids;
        ids.sort_unstable();
        ids.dedup();

        let updated = self
            .todos
            .batch_update_status(user.id(), &ids, input.status, Utc::now())
            .await?;

        log::info!(
            "user {} batch-updated {} of {} todos to {}",
            user.id(),
            updated,
            ids.len(),
            input.status.text()
        );
        Ok(BatchUpdateResult { updated })
    }

    pub async fn statistics(&self, user: &AuthenticatedUser) -> Result<TodoStatistics, AppError> {
        self.todos.statistics(user.id()).await
    }
}
