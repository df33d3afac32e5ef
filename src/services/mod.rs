pub mod auth;
pub mod todos;
pub mod users;

use std::sync::Arc;

use actix_web::web;

use crate::auth::{PasswordHasher, TokenEngine};
use crate::config::AppInfo;
use crate::error::AppError;
use crate::repository::{HealthCheck, TodoRepository, UserRepository};

pub use auth::AuthService;
pub use todos::TodoService;
pub use users::UserService;

/// Everything the handlers and the auth gate pull out of app data.
///
/// Built once at startup and cloned into each worker's `App`.
#[derive(Clone)]
pub struct Services {
    pub auth: web::Data<AuthService>,
    pub users: web::Data<UserService>,
    pub todos: web::Data<TodoService>,
    pub tokens: web::Data<TokenEngine>,
    pub info: web::Data<AppInfo>,
    pub health: web::Data<dyn HealthCheck>,
}

impl Services {
    pub fn new(
        users: Arc<dyn UserRepository>,
        todos: Arc<dyn TodoRepository>,
        health: Arc<dyn HealthCheck>,
        tokens: TokenEngine,
        hasher: PasswordHasher,
    ) -> Self {
        let tokens = Arc::new(tokens);
        Self {
            auth: web::Data::new(AuthService::new(users.clone(), tokens.clone(), hasher)),
            users: web::Data::new(UserService::new(users, hasher)),
            todos: web::Data::new(TodoService::new(todos)),
            tokens: web::Data::from(tokens),
            info: web::Data::new(AppInfo::default()),
            health: web::Data::from(health),
        }
    }

    /// Service identity reported by `/health`.
    pub fn with_info(mut self, info: AppInfo) -> Self {
        self.info = web::Data::new(info);
        self
    }

    /// Registers shared state and maps body, query and path extraction failures to
    /// validation errors so they use the standard envelope.
    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(self.auth.clone())
            .app_data(self.users.clone())
            .app_data(self.todos.clone())
            .app_data(self.tokens.clone())
            .app_data(self.info.clone())
            .app_data(self.health.clone())
            .app_data(web::JsonConfig::default().error_handler(|err, _req| {
                AppError::Validation(err.to_string()).into()
            }))
            .app_data(web::QueryConfig::default().error_handler(|err, _req| {
                AppError::Validation(err.to_string()).into()
            }))
            .app_data(web::PathConfig::default().error_handler(|err, _req| {
                AppError::Validation(err.to_string()).into()
            }));
    }
}
