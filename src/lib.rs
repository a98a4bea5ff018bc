pub mod config;
pub mod error;
pub mod homeworks;
pub mod models;
pub mod notification_builders;
pub mod notifications;
pub mod roles;
pub mod store;
pub mod users;
pub mod visibility;

use actix_cors::Cors;
use actix_web::{middleware, web, App};
use sqlx::postgres::PgPool;
use std::sync::Arc;

use crate::error::ApiError;
use crate::store::{HomeworkStore, NotificationStore};

#[derive(Clone)]
pub struct AppState {
    pub jwt_secret: String,
    pub homeworks: Arc<dyn HomeworkStore>,
    pub notifications: Arc<dyn NotificationStore>,
}

impl AppState {
    /// Uses one store for both homework and notification data.
    pub fn new<S>(store: Arc<S>, jwt_secret: String) -> Self
    where
        S: HomeworkStore + NotificationStore + 'static,
    {
        Self {
            jwt_secret,
            homeworks: store.clone(),
            notifications: store,
        }
    }
}

pub fn create_app(app_state: web::Data<AppState>) -> App<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Response = actix_web::dev::ServiceResponse<impl actix_web::body::MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(app_state)
        .app_data(
            web::JsonConfig::default()
                .limit(1024 * 1024)
                .error_handler(|err, _req| ApiError::Validation(err.to_string()).into()),
        )
        .app_data(
            web::QueryConfig::default()
                .error_handler(|err, _req| ApiError::Validation(err.to_string()).into()),
        )
        .app_data(
            web::PathConfig::default()
                .error_handler(|err, _req| ApiError::Validation(err.to_string()).into()),
        )
        .wrap(
            Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header()
                .max_age(3600),
        )
        .wrap(middleware::Logger::default())
        .configure(homeworks::init_routes)
        .configure(notifications::configure)
}

pub async fn init_db(database_url: &str) -> Result<PgPool, sqlx::Error> {
    let pool = PgPool::connect(database_url).await?;

    // Run migrations
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await?;

    Ok(pool)
}
