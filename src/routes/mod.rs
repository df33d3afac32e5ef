pub mod auth;
pub mod health;
pub mod todos;
pub mod users;

use actix_web::web;

use crate::auth::AuthMiddleware;

/// Mounts every route. Everything under `/api/users` and `/api/todos` sits behind
/// the bearer-token gate; `/health`, `/ready` and `/api/auth` are public.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(health::health).service(health::ready).service(
        web::scope("/api")
            .service(
                web::scope("/auth")
                    .service(auth::register)
                    .service(auth::login)
                    .service(auth::refresh),
            )
            .service(
                web::scope("/users")
                    .wrap(AuthMiddleware)
                    .service(users::me)
                    .service(users::update_me)
                    .service(users::change_password),
            )
            .service(
                web::scope("/todos")
                    .wrap(AuthMiddleware)
                    .service(todos::list_todos)
                    .service(todos::create_todo)
                    // Literal segments before `/{id}`.
                    .service(todos::statistics)
                    .service(todos::batch_update_status)
                    .service(todos::get_todo)
                    .service(todos::update_todo)
                    .service(todos::delete_todo)
                    .service(todos::update_todo_status),
            ),
    );
}
