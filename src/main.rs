use actix_web::{web, HttpServer};
use log::{error, info, warn};
use schoolhub_backend::config::Config;
use schoolhub_backend::store::PgStore;
use schoolhub_backend::{create_app, init_db, AppState};
use std::sync::Arc;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = dotenv::dotenv() {
        warn!("No .env file loaded: {}", e);
    }

    let config = Config::from_env().map_err(|e| {
        error!("Configuration error: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;

    // Initialize database
    let db_pool = init_db(&config.database_url).await.map_err(|e| {
        error!("Failed to initialize database: {}", e);
        std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("Failed to initialize database: {}", e),
        )
    })?;

    info!("Database initialized successfully");

    let app_state = web::Data::new(AppState::new(
        Arc::new(PgStore::new(db_pool)),
        config.jwt_secret.clone(),
    ));

    info!(
        "Starting server at http://{}:{}",
        config.bind_address, config.port
    );

    HttpServer::new(move || create_app(app_state.clone()))
        .bind((config.bind_address.as_str(), config.port))?
        .run()
        .await
}
