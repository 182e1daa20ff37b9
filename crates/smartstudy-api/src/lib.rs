// SmartStudy API
//
// HTTP surface for the assistant pipeline and direct event/task access.
// The binary in main.rs wires configuration, stores and the model driver;
// everything route-related is built here so tests can exercise the full router.

pub mod assistant;
pub mod auth;
pub mod common;
pub mod config;
pub mod events;
pub mod state;
pub mod tasks;

use axum::{
    extract::State,
    http::{header, HeaderValue, Method},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use common::{ApiError, DeleteResponse, ErrorResponse};
pub use config::ServerConfig;
pub use state::AppState;

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        assistant::assist,
        events::list_events,
        events::create_event,
        events::update_event,
        events::delete_event,
        tasks::list_tasks,
        tasks::create_task,
        tasks::update_task,
        tasks::delete_task,
    ),
    components(schemas(
        assistant::AssistantRequest,
        assistant::AssistantResponse,
        common::ErrorResponse,
        common::DeleteResponse,
    )),
    tags(
        (name = "assistant", description = "Natural-language calendar and task assistant"),
        (name = "events", description = "Calendar event management"),
        (name = "tasks", description = "Task management")
    ),
    info(
        title = "SmartStudy API",
        version = "0.1.0",
        description = "Turns chat messages into calendar event and task operations",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    )
)]
pub struct ApiDoc;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    auth_mode: &'static str,
    storage: &'static str,
    model: String,
}

/// State for health endpoint
#[derive(Clone)]
pub struct HealthState {
    pub auth_mode: &'static str,
    pub storage: &'static str,
    pub model: String,
}

async fn health(State(state): State<HealthState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        auth_mode: state.auth_mode,
        storage: state.storage,
        model: state.model,
    })
}

/// Full application router: health, prefixed API routes, Swagger UI, CORS, tracing
pub fn build_router(
    state: AppState,
    health_state: HealthState,
    api_prefix: &str,
    cors_origins: Vec<HeaderValue>,
) -> Router {
    let api_routes = assistant::routes(state.clone())
        .merge(events::routes(state.clone()))
        .merge(tasks::routes(state));

    let app = Router::new()
        .route("/health", get(health).with_state(health_state))
        .merge(build_router_with_prefix(api_routes, api_prefix))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()));

    // Add CORS layer only if origins are configured
    let app = if cors_origins.is_empty() {
        app
    } else {
        app.layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(cors_origins))
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([
                    header::CONTENT_TYPE,
                    header::AUTHORIZATION,
                    header::ACCEPT,
                    header::ORIGIN,
                ])
                .allow_credentials(true),
        )
    };

    app.layer(TraceLayer::new_for_http())
}

/// Nest API routes under a prefix when one is configured
pub fn build_router_with_prefix<S: Clone + Send + Sync + 'static>(
    api_routes: Router<S>,
    api_prefix: &str,
) -> Router<S> {
    if api_prefix.is_empty() {
        api_routes
    } else {
        Router::new().nest(api_prefix, api_routes)
    }
}
