// src/main.rs

use std::{net::SocketAddr, sync::Arc};

use interview_backend::config::{Config, NOTIFICATION_QUEUE_CAPACITY};
use interview_backend::notify::{NotificationQueue, RetryPolicy, SendGridMailer};
use interview_backend::routes;
use interview_backend::state::AppState;
use interview_backend::store::{InMemorySessionStore, SessionStore, SqliteSessionStore};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load configuration from environment (.env included)
    let config = Config::from_env();

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    warn_on_missing_config(&config);

    let sessions: Arc<dyn SessionStore> = match &config.database_url {
        Some(url) => {
            let store = SqliteSessionStore::connect(url)
                .await
                .expect("Failed to open session database");
            tracing::info!("Session store: sqlite ({})", url);
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; sessions are kept in memory and lost on restart");
            Arc::new(InMemorySessionStore::new())
        }
    };

    let notifier = match (&config.sendgrid_api_key, &config.sendgrid_from) {
        (Some(key), Some(from)) => match SendGridMailer::new(key, from) {
            Ok(mailer) => NotificationQueue::spawn(
                Arc::new(mailer),
                NOTIFICATION_QUEUE_CAPACITY,
                RetryPolicy::default(),
            ),
            Err(e) => {
                tracing::error!("Failed to build mail client, notifications disabled: {}", e);
                NotificationQueue::disabled()
            }
        },
        _ => {
            tracing::warn!("SENDGRID_API_KEY/SENDGRID_FROM not set; emails will not be sent");
            NotificationQueue::disabled()
        }
    };

    for dir in [&config.recordings_path, &config.results_path] {
        tokio::fs::create_dir_all(dir)
            .await
            .expect("Failed to create storage directory");
    }

    let port = config.port;
    let state = AppState::new(config, sessions, notifier);

    // Create the Axum application router
    let app = routes::create_router(state);

    // Bind to the listening address
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listening address");

    // Start the server
    axum::serve(listener, app).await.expect("Server error");
}

fn warn_on_missing_config(config: &Config) {
    if config.jwt_secret.is_none() {
        tracing::warn!("JWT_SECRET not set; link generation and submissions will fail");
    }
    if config.app_url.is_none() {
        tracing::warn!("APP_URL not set; link generation will fail");
    }
    if config.recruiter_email.is_none() {
        tracing::warn!("RECRUITER_EMAIL not set; results will not be emailed");
    }
    if config.admin_api_key.is_none() {
        tracing::warn!("ADMIN_API_KEY not set; admin routes are open");
    }
}
