pub mod todo;
pub mod user;

pub use todo::{
    completion_timestamp, BatchUpdateResult, BatchUpdateStatusRequest, CreateTodoRequest,
    NewTodo, Pagination, Todo, TodoFilter, TodoListResponse, TodoPriority, TodoQuery,
    TodoResponse, TodoStatistics, TodoStatus, UpdateStatusRequest, UpdateTodoRequest,
};
pub use user::{
    ChangePasswordRequest, NewUser, UpdateProfileRequest, User, UserResponse, UserStatus,
};
