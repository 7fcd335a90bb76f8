use crate::{
    controller::health_check_controller, middleware::auth::require_auth, ws, AppState,
};
use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};
use log::*;
use tower_http::cors::CorsLayer;

use crate::controller::{chat_controller, exchange_controller, message_controller};

use utoipa::{
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_rapidoc::RapiDoc;

// This is the global definition of our OpenAPI spec. To be a part
// of the rendered spec, a path and schema must be listed here.
#[derive(OpenApi)]
#[openapi(
        info(
            title = "Bookswap Platform API"
        ),
        paths(
            chat_controller::create,
            chat_controller::read,
            message_controller::create,
            message_controller::index,
            exchange_controller::read,
            exchange_controller::update_status,
            exchange_controller::confirm,
            exchange_controller::cancel,
            health_check_controller::health_check,
        ),
        components(
            schemas(
                domain::books::Model,
                domain::chats::Model,
                domain::exchanges::Model,
                domain::messages::Model,
                domain::users::Model,
                domain::exchange_status::ExchangeStatus,
                crate::params::chat::CreateParams,
                crate::params::message::SendParams,
                crate::params::exchange::TransitionParams,
            )
        ),
        modifiers(&SecurityAddon),
        tags(
            (name = "bookswap", description = "Bookswap peer-to-peer exchange API")
        )
    )]
struct ApiDoc;

struct SecurityAddon;

// Every mutating endpoint presents a bearer token minted by the identity
// collaborator; this registers that scheme for the OpenAPI UI.
impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            )
        }
    }
}

pub fn define_routes(app_state: AppState) -> Router {
    let cors = cors_layer(&app_state);

    Router::new()
        .merge(chat_routes(app_state.clone()))
        .merge(message_routes(app_state.clone()))
        .merge(exchange_routes(app_state.clone()))
        .merge(health_routes())
        .merge(ws_routes(app_state))
        .merge(RapiDoc::with_openapi("/api-docs/openapi2.json", ApiDoc::openapi()).path("/rapidoc"))
        .layer(cors)
}

fn chat_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/chats", post(chat_controller::create))
        .route("/chats/:id", get(chat_controller::read))
        .route_layer(from_fn_with_state(app_state.clone(), require_auth))
        .with_state(app_state)
}

fn message_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/chats/:id/messages", post(message_controller::create))
        .route("/chats/:id/messages", get(message_controller::index))
        .route_layer(from_fn_with_state(app_state.clone(), require_auth))
        .with_state(app_state)
}

fn exchange_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/chats/:id/exchange", get(exchange_controller::read))
        .route("/chats/:id/exchange", put(exchange_controller::update_status))
        .route(
            "/chats/:id/exchange/confirm",
            post(exchange_controller::confirm),
        )
        .route(
            "/chats/:id/exchange/cancel",
            post(exchange_controller::cancel),
        )
        .route_layer(from_fn_with_state(app_state.clone(), require_auth))
        .with_state(app_state)
}

fn health_routes() -> Router {
    Router::new().route("/health", get(health_check_controller::health_check))
}

// The live channels authenticate in-protocol (close frame with a reason on
// a bad credential) rather than via the middleware, so a browser client
// gets a deterministic close instead of a failed upgrade.
fn ws_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/ws/chats", get(ws::chat_list::chat_list_handler))
        .route(
            "/ws/chats/:chat_id/messages",
            get(ws::chat_messages::chat_messages_handler),
        )
        .with_state(app_state)
}

fn cors_layer(app_state: &AppState) -> CorsLayer {
    let origins: Vec<HeaderValue> = app_state
        .config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Skipping unparseable CORS origin {origin:?}");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-version"),
        ])
        .allow_credentials(true)
}
