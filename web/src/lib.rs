//! HTTP and WebSocket surface of the bookswap platform.
//!
//! Controllers translate requests into domain calls; the `ws` module
//! terminates the two live-channel kinds (chat directory, per-chat message
//! view). All error translation to HTTP status codes happens in `error`.

use domain::events::EventPublisher;
use sea_orm::DatabaseConnection;
use service::config::Config;
use std::sync::Arc;

pub(crate) mod controller;
pub mod error;
pub(crate) mod extractors;
pub(crate) mod middleware;
pub(crate) mod params;
pub mod router;
pub(crate) mod ws;

pub use error::{Error, Result};

/// Binds the configured interface/port and serves the router until the
/// process is told to stop.
pub async fn init_server(app_state: AppState) -> std::io::Result<()> {
    let interface = app_state
        .config
        .interface
        .clone()
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let address = format!("{}:{}", interface, app_state.config.port);

    let router = router::define_routes(app_state);

    let listener = tokio::net::TcpListener::bind(&address).await?;
    log::info!("Server starting... listening for connections on http://{address}");

    axum::serve(listener, router).await
}

/// Web-level application state: the service-layer infrastructure plus the
/// push manager and the event publisher the controllers publish through.
#[derive(Clone)]
pub struct AppState {
    pub database_connection: Arc<DatabaseConnection>,
    pub config: Config,
    pub push_manager: Arc<push::Manager>,
    pub event_publisher: Arc<EventPublisher>,
}

impl AppState {
    pub fn new(
        service_state: service::AppState,
        push_manager: Arc<push::Manager>,
        event_publisher: Arc<EventPublisher>,
    ) -> Self {
        Self {
            database_connection: service_state.database_connection,
            config: service_state.config,
            push_manager,
            event_publisher,
        }
    }

    pub fn db_conn_ref(&self) -> &DatabaseConnection {
        self.database_connection.as_ref()
    }
}
