mod config;
mod db;
mod dtos;
mod error;
mod handler;
mod middleware;
mod models;
mod routes;
mod service;

use std::sync::Arc;

use axum::http::{header::{ACCEPT, CONTENT_TYPE}, HeaderName, HeaderValue, Method};
use config::Config;
use dotenv::dotenv;
use routes::create_router;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::db::db::{DBClient, JobStore};
use crate::middleware::PRINCIPAL_HEADER;
use service::{
    application_service::ApplicationService,
    application_workflow::ApplicationWorkflow,
    expiration_sweeper::{start_handover_expiry_job, ExpirationSweeper},
    job_state_machine::JobStateMachine,
    notification_service::{NotificationService, NotificationSink},
};

#[derive(Clone)]
pub struct AppState {
    pub state_machine: JobStateMachine,
    pub workflow: ApplicationWorkflow,
    pub sweeper: Arc<ExpirationSweeper>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn JobStore>,
        notifier: Arc<dyn NotificationSink>,
        handover_window: chrono::Duration,
    ) -> Self {
        let state_machine = JobStateMachine::new(store.clone(), handover_window);
        let applications = ApplicationService::new(store);
        let workflow = ApplicationWorkflow::new(
            applications,
            state_machine.clone(),
            notifier.clone(),
        );
        let sweeper = Arc::new(ExpirationSweeper::new(state_machine.clone(), notifier));

        Self {
            state_machine,
            workflow,
            sweeper,
        }
    }
}

#[tokio::main]
async fn main() {
    dotenv().ok();

    let config = Config::init();

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .init();

    for var in &config.ignored_vars {
        tracing::warn!("Ignoring invalid {}, using default", var);
    }

    let pool = match PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await
    {
        Ok(pool) => {
            tracing::info!("✅ Connection to the database is successful!");
            pool
        }
        Err(err) => {
            tracing::error!("🔥 Failed to connect to the database: {:?}", err);
            std::process::exit(1);
        }
    };

    let db_client = Arc::new(DBClient::new(pool));
    if let Err(err) = db_client.migrate().await {
        tracing::error!("🔥 Failed to run database migrations: {:?}", err);
        std::process::exit(1);
    }

    let notifier = Arc::new(NotificationService::new(db_client.clone()));
    let app_state = Arc::new(AppState::new(
        db_client.clone(),
        notifier,
        config.handover_window(),
    ));

    let allowed_origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {}", origin);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_headers([ACCEPT, CONTENT_TYPE, HeaderName::from_static(PRINCIPAL_HEADER)])
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE]);

    let app = create_router(app_state.clone()).layer(cors);

    match config.sweep_interval() {
        Some(every) => {
            tracing::info!(
                "Handover window {} days, sweeping every {}s",
                config.handover_window_days,
                every.as_secs()
            );
            tokio::spawn(start_handover_expiry_job(app_state.sweeper.clone(), every));
        }
        None => tracing::info!("Periodic handover sweep disabled"),
    }

    let listener = match tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("🔥 Failed to bind port {}: {:?}", config.port, err);
            std::process::exit(1);
        }
    };

    tracing::info!("🚀 Server is running on http://localhost:{}", config.port);

    if let Err(err) = axum::serve(listener, app).await {
        tracing::error!("🔥 Server error: {:?}", err);
    }
}
