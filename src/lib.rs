#![doc = "The `todo_api` library crate."]
#![doc = ""]
#![doc = "Domain models, token-based authentication, ownership checks, persistence,"]
#![doc = "services, routing and error handling for the todo API. The binary (`main.rs`)"]
#![doc = "wires these together against PostgreSQL; the integration tests wire them"]
#![doc = "against the in-memory store."]

pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod response;
pub mod routes;
pub mod services;

pub use crate::error::AppError;
pub use crate::services::Services;
