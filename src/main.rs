use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware::Logger, App, HttpServer};
use sqlx::postgres::PgPoolOptions;

use todo_api::{
    auth::{PasswordHasher, TokenEngine},
    config::Config,
    repository::PgStore,
    routes, Services,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let default_level = if config.is_release() { "info" } else { "debug" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let tokens = match TokenEngine::new(&config.jwt) {
        Ok(tokens) => tokens,
        Err(e) => {
            log::error!("refusing to start: {}", e);
            std::process::exit(1);
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

    let store = Arc::new(PgStore::new(pool));
    let services = Services::new(
        store.clone(),
        store.clone(),
        store,
        tokens,
        PasswordHasher::new(config.bcrypt_cost),
    )
    .with_info(config.app.clone());

    log::info!(
        "starting {} {} ({}) at {}",
        config.app.name,
        config.app.version,
        config.app.environment,
        config.server_url()
    );

    HttpServer::new(move || {
        let services = services.clone();
        App::new()
            .wrap(Logger::default())
            .wrap(Cors::permissive())
            .configure(move |cfg| services.configure(cfg))
            .configure(routes::config)
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .run()
    .await
}
