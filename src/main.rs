use events::EventPublisher;
use log::{error, info};
use push::fanout::FanoutHandler;
use service::{config::Config, logging::Logger};
use std::sync::Arc;

#[tokio::main]
async fn main() {
    let config = Config::new();
    Logger::init_logger(&config as &Config);

    info!(
        "Starting bookswap platform [{}] ...",
        config.runtime_env()
    );

    let db = match service::init_database(&config).await {
        Ok(db) => Arc::new(db),
        Err(e) => {
            error!("Failed to establish database connection: {e}");
            std::process::exit(1);
        }
    };

    let service_state = service::AppState::new(config, &db);

    // One registry instance owned by the connection-handling layer; its
    // lifecycle is the process's lifecycle.
    let push_manager = Arc::new(push::Manager::new());

    let event_publisher = Arc::new(EventPublisher::new().with_handler(Arc::new(
        FanoutHandler::new(Arc::clone(&push_manager), Arc::clone(&db)),
    )));

    let app_state = web::AppState::new(service_state, push_manager, event_publisher);

    if let Err(e) = web::init_server(app_state).await {
        error!("Server failed: {e}");
        std::process::exit(1);
    }
}
