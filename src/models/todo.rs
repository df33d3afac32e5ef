use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Status of a todo. Travels as its integer discriminant on the wire and in storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(i16)]
pub enum TodoStatus {
    #[default]
    Pending = 0,
    InProgress = 1,
    Completed = 2,
}

impl TodoStatus {
    pub const fn id(self) -> i16 {
        self as i16
    }

    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            0 => Some(Self::Pending),
            1 => Some(Self::InProgress),
            2 => Some(Self::Completed),
            _ => None,
        }
    }

    pub const fn text(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }
}

impl TryFrom<u8> for TodoStatus {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_id(i16::from(value))
            .ok_or_else(|| format!("invalid status {}, expected 0, 1 or 2", value))
    }
}

impl From<TodoStatus> for u8 {
    fn from(status: TodoStatus) -> u8 {
        status as u8
    }
}

/// Priority of a todo, `Low = 1` through `Urgent = 4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(i16)]
pub enum TodoPriority {
    #[default]
    Low = 1,
    Medium = 2,
    High = 3,
    Urgent = 4,
}

impl TodoPriority {
    pub const fn id(self) -> i16 {
        self as i16
    }

    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            1 => Some(Self::Low),
            2 => Some(Self::Medium),
            3 => Some(Self::High),
            4 => Some(Self::Urgent),
            _ => None,
        }
    }

    pub const fn text(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }
}

impl TryFrom<u8> for TodoPriority {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_id(i16::from(value))
            .ok_or_else(|| format!("invalid priority {}, expected 1 to 4", value))
    }
}

impl From<TodoPriority> for u8 {
    fn from(priority: TodoPriority) -> u8 {
        priority as u8
    }
}

/// Completion timestamp a todo should carry after moving to `next`.
///
/// Entering `Completed` stamps `now`, staying `Completed` keeps the original stamp,
/// and any other status clears it. Every status-changing path goes through here,
/// which keeps `completed_at.is_some() == (status == Completed)`.
pub fn completion_timestamp(
    next: TodoStatus,
    previous: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    match next {
        TodoStatus::Completed => Some(previous.unwrap_or(now)),
        TodoStatus::Pending | TodoStatus::InProgress => None,
    }
}

/// A todo as held by the persistence layer. Soft-deleted rows never surface here.
#[derive(Debug, Clone, PartialEq)]
pub struct Todo {
    pub id: i64,
    /// Owning identity. Set at creation and never reassigned.
    pub user_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub status: TodoStatus,
    pub priority: TodoPriority,
    pub due_date: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Todo {
    /// Moves the todo to `status`, keeping `completed_at` consistent with it.
    pub fn set_status(&mut self, status: TodoStatus, now: DateTime<Utc>) {
        self.completed_at = completion_timestamp(status, self.completed_at, now);
        self.status = status;
        self.updated_at = now;
    }

    /// True iff a due date exists, the todo is not completed, and the due date has passed.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        match self.due_date {
            Some(due) => self.status != TodoStatus::Completed && due < now,
            None => false,
        }
    }

    /// Applies the present fields of an update request.
    pub fn apply_update(&mut self, update: UpdateTodoRequest, now: DateTime<Utc>) {
        if let Some(title) = update.title {
            self.title = title.trim().to_string();
        }
        if let Some(description) = update.description {
            self.description = non_empty(description);
        }
        if let Some(priority) = update.priority {
            self.priority = priority;
        }
        if let Some(due_date) = update.due_date {
            self.due_date = Some(due_date);
        }
        if let Some(status) = update.status {
            self.set_status(status, now);
        }
        self.updated_at = now;
    }
}

/// Insert payload for a todo; the store assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTodo {
    pub user_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub status: TodoStatus,
    pub priority: TodoPriority,
    pub due_date: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl NewTodo {
    pub fn new(input: CreateTodoRequest, owner_id: i64, now: DateTime<Utc>) -> Self {
        let status = input.status.unwrap_or_default();
        Self {
            user_id: owner_id,
            title: input.title.trim().to_string(),
            description: input.description.and_then(non_empty),
            status,
            priority: input.priority.unwrap_or_default(),
            due_date: input.due_date,
            completed_at: completion_timestamp(status, None, now),
            created_at: now,
        }
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

/// Body of `POST /api/todos`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateTodoRequest {
    /// Must be between 1 and 200 characters and not only whitespace.
    #[validate(length(min = 1, max = 200), custom = "not_blank")]
    pub title: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    /// Defaults to `Pending`.
    pub status: Option<TodoStatus>,
    /// Defaults to `Low`.
    pub priority: Option<TodoPriority>,
    pub due_date: Option<DateTime<Utc>>,
}

/// Body of `PUT /api/todos/{id}`. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateTodoRequest {
    #[validate(length(min = 1, max = 200), custom = "not_blank")]
    pub title: Option<String>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    pub status: Option<TodoStatus>,
    pub priority: Option<TodoPriority>,
    pub due_date: Option<DateTime<Utc>>,
}

/// Body of `PUT /api/todos/{id}/status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: TodoStatus,
}

/// Body of `PUT /api/todos/batch/status`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BatchUpdateStatusRequest {
    /// Between 1 and 500 ids.
    #[validate(length(min = 1, max = 500))]
    pub todo_ids: Vec<i64>,
    pub status: TodoStatus,
}

/// Result of a batch update: how many owned rows were changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchUpdateResult {
    pub updated: u64,
}

/// Query string of `GET /api/todos`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct TodoQuery {
    #[validate(range(min = 1))]
    pub page: Option<u32>,
    #[validate(range(min = 1, max = 100))]
    pub page_size: Option<u32>,
    pub status: Option<TodoStatus>,
    pub priority: Option<TodoPriority>,
    pub keyword: Option<String>,
}

impl TodoQuery {
    pub fn into_filter(self) -> TodoFilter {
        TodoFilter {
            page: self.page.unwrap_or(1),
            page_size: self.page_size.unwrap_or(10),
            status: self.status,
            priority: self.priority,
            keyword: self
                .keyword
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty()),
        }
    }
}

/// Normalised list filter handed to the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoFilter {
    pub page: u32,
    pub page_size: u32,
    pub status: Option<TodoStatus>,
    pub priority: Option<TodoPriority>,
    /// Case-insensitive substring matched against title and description.
    pub keyword: Option<String>,
}

impl TodoFilter {
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size)
    }
}

impl Default for TodoFilter {
    fn default() -> Self {
        TodoQuery::default().into_filter()
    }
}

/// Per-status counts over an owner's non-deleted todos.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoStatistics {
    pub total_count: u64,
    pub pending_count: u64,
    pub in_progress_count: u64,
    pub completed_count: u64,
}

impl TodoStatistics {
    pub fn record(&mut self, status: TodoStatus) {
        self.total_count += 1;
        match status {
            TodoStatus::Pending => self.pending_count += 1,
            TodoStatus::InProgress => self.in_progress_count += 1,
            TodoStatus::Completed => self.completed_count += 1,
        }
    }
}

/// A todo as returned by the API, with derived fields filled in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TodoResponse {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub status: TodoStatus,
    pub status_text: String,
    pub priority: TodoPriority,
    pub priority_text: String,
    pub due_date: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Recomputed on every read, never stored.
    pub is_overdue: bool,
}

impl TodoResponse {
    pub fn from_todo(todo: Todo, now: DateTime<Utc>) -> Self {
        let is_overdue = todo.is_overdue(now);
        Self {
            id: todo.id,
            user_id: todo.user_id,
            title: todo.title,
            description: todo.description,
            status: todo.status,
            status_text: todo.status.text().to_string(),
            priority: todo.priority,
            priority_text: todo.priority.text().to_string(),
            due_date: todo.due_date,
            completed_at: todo.completed_at,
            created_at: todo.created_at,
            updated_at: todo.updated_at,
            is_overdue,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
    pub total_pages: u64,
}

impl Pagination {
    pub fn new(filter: &TodoFilter, total: u64) -> Self {
        let page_size = u64::from(filter.page_size.max(1));
        Self {
            page: filter.page,
            page_size: filter.page_size,
            total,
            total_pages: total.div_ceil(page_size),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TodoListResponse {
    pub todos: Vec<TodoResponse>,
    pub pagination: Pagination,
    pub statistics: TodoStatistics,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    fn sample_todo(now: DateTime<Utc>) -> Todo {
        Todo {
            id: 1,
            user_id: 7,
            title: "buy milk".into(),
            description: None,
            status: TodoStatus::Pending,
            priority: TodoPriority::Low,
            due_date: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_status_transitions_keep_completed_at_in_sync() {
        let start = Utc::now();
        let mut todo = sample_todo(start);

        for (i, status) in [
            TodoStatus::InProgress,
            TodoStatus::Completed,
            TodoStatus::Pending,
            TodoStatus::Completed,
            TodoStatus::InProgress,
        ]
        .into_iter()
        .enumerate()
        {
            todo.set_status(status, start + Duration::seconds(i as i64));
            assert_eq!(todo.status, status);
            assert_eq!(todo.completed_at.is_some(), status == TodoStatus::Completed);
        }
    }

    #[test]
    fn test_repeat_completion_keeps_first_stamp() {
        let start = Utc::now();
        let mut todo = sample_todo(start);

        todo.set_status(TodoStatus::Completed, start);
        let first = todo.completed_at;
        todo.set_status(TodoStatus::Completed, start + Duration::minutes(5));

        assert_eq!(todo.completed_at, first);
        assert_eq!(todo.status, TodoStatus::Completed);
    }

    #[test]
    fn test_is_overdue() {
        let now = Utc::now();
        let mut todo = sample_todo(now);
        assert!(!todo.is_overdue(now));

        todo.due_date = Some(now - Duration::seconds(1));
        assert!(todo.is_overdue(now));

        todo.due_date = Some(now);
        assert!(!todo.is_overdue(now), "due exactly now is not yet overdue");

        todo.due_date = Some(now - Duration::days(3));
        todo.set_status(TodoStatus::Completed, now);
        assert!(!todo.is_overdue(now));
    }

    #[test]
    fn test_new_todo_defaults_and_completed_creation() {
        let now = Utc::now();
        let input = CreateTodoRequest {
            title: "  buy milk ".into(),
            description: Some("".into()),
            status: None,
            priority: None,
            due_date: None,
        };
        let todo = NewTodo::new(input, 3, now);
        assert_eq!(todo.title, "buy milk");
        assert_eq!(todo.description, None);
        assert_eq!(todo.status, TodoStatus::Pending);
        assert_eq!(todo.priority, TodoPriority::Low);
        assert_eq!(todo.completed_at, None);

        let input = CreateTodoRequest {
            title: "done already".into(),
            description: None,
            status: Some(TodoStatus::Completed),
            priority: Some(TodoPriority::Urgent),
            due_date: None,
        };
        let todo = NewTodo::new(input, 3, now);
        assert_eq!(todo.completed_at, Some(now));
    }

    #[test]
    fn test_apply_update_only_touches_present_fields() {
        let now = Utc::now();
        let mut todo = sample_todo(now);
        todo.description = Some("2 liters".into());

        let later = now + Duration::seconds(30);
        todo.apply_update(
            UpdateTodoRequest {
                priority: Some(TodoPriority::High),
                status: Some(TodoStatus::Completed),
                ..Default::default()
            },
            later,
        );

        assert_eq!(todo.title, "buy milk");
        assert_eq!(todo.description.as_deref(), Some("2 liters"));
        assert_eq!(todo.priority, TodoPriority::High);
        assert_eq!(todo.completed_at, Some(later));
        assert_eq!(todo.updated_at, later);
    }

    #[test]
    fn test_wire_format_uses_integers() {
        let status: TodoStatus = serde_json::from_str("2").unwrap();
        assert_eq!(status, TodoStatus::Completed);
        assert_eq!(serde_json::to_string(&TodoPriority::Urgent).unwrap(), "4");
        assert!(serde_json::from_str::<TodoStatus>("3").is_err());
        assert!(serde_json::from_str::<TodoPriority>("0").is_err());
    }

    #[test]
    fn test_request_validation() {
        let blank = CreateTodoRequest {
            title: "   ".into(),
            description: None,
            status: None,
            priority: None,
            due_date: None,
        };
        assert!(blank.validate().is_err());

        let too_long = UpdateTodoRequest {
            title: Some("a".repeat(201)),
            ..Default::default()
        };
        assert!(too_long.validate().is_err());

        let empty_batch = BatchUpdateStatusRequest {
            todo_ids: vec![],
            status: TodoStatus::Completed,
        };
        assert!(empty_batch.validate().is_err());

        let bad_page = TodoQuery {
            page_size: Some(101),
            ..Default::default()
        };
        assert!(bad_page.validate().is_err());
    }

    #[test]
    fn test_filter_and_pagination() {
        let filter = TodoQuery {
            page: Some(3),
            page_size: Some(20),
            keyword: Some("  ".into()),
            ..Default::default()
        }
        .into_filter();
        assert_eq!(filter.offset(), 40);
        assert_eq!(filter.keyword, None);

        let pagination = Pagination::new(&filter, 41);
        assert_eq!(pagination.total_pages, 3);
        assert_eq!(Pagination::new(&filter, 0).total_pages, 0);
    }
}
