//! HTTP server for the browser widget.
//!
//! Serves the static widget files, relays questions to the chat webhook and
//! exposes the Weaviate searches as tool endpoints for the workflow.

use airdee_core::{
    render_message_html, AirdeeError, Config, SearchQuery, ServerSettings, VectorSearchClient,
    WebhookClient,
};
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

/// File served for `/logo.png` and `/favicon.ico`.
const LOGO_FILE: &str = "emglogo.png";

#[derive(Clone)]
pub struct ServerState {
    webhook: WebhookClient,
    /// `None` when no Weaviate URL is configured.
    vector: Option<VectorSearchClient>,
}

impl ServerState {
    pub fn new(webhook: WebhookClient, vector: Option<VectorSearchClient>) -> Self {
        Self { webhook, vector }
    }

    pub fn from_config(config: &Config) -> Self {
        let vector = match VectorSearchClient::new(config.vector.clone()) {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!(error = %e, "vector search disabled");
                None
            }
        };
        Self::new(WebhookClient::new(&config.webhook_url), vector)
    }
}

pub fn router(state: ServerState, settings: &ServerSettings) -> Router {
    let public_dir = &settings.public_dir;
    let logo = public_dir.join(LOGO_FILE);

    Router::new()
        .route("/health", get(health))
        .route("/ask", post(ask))
        .route("/render", post(render))
        .route("/tool/vector.search", post(vector_search))
        .route("/tool/weaviate.search", post(weaviate_search))
        .route("/debug/auth", get(debug_auth))
        .route("/debug/graphql", get(debug_graphql))
        .route_service("/logo.png", ServeFile::new(&logo))
        .route_service("/favicon.ico", ServeFile::new(&logo))
        .fallback_service(ServeDir::new(public_dir))
        .layer(cors_layer(&settings.allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// `*` allows any origin, anything else is a comma separated origin list.
fn cors_layer(allowed_origins: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static("x-api-key")]);

    if allowed_origins.trim() == "*" {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(origins)
}

pub async fn serve(config: &Config) -> anyhow::Result<()> {
    let state = ServerState::from_config(config);
    let app = router(state, &config.server);
    let addr = config.server.bind_addr();

    tracing::info!(
        %addr,
        public_dir = %config.server.public_dir.display(),
        webhook = %config.webhook_url,
        "serving chat widget"
    );

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health(State(state): State<ServerState>) -> Json<Value> {
    let weaviate_ready = match state.vector.as_ref() {
        Some(client) => client.is_ready().await,
        None => false,
    };
    Json(json!({ "status": "ok", "weaviate_ready": weaviate_ready }))
}

/// Relay a JSON payload to the webhook and pass its answer back unchanged.
async fn ask(State(state): State<ServerState>, body: Bytes) -> Response {
    let payload: Value = if body.is_empty() {
        json!({})
    } else {
        match serde_json::from_slice(&body) {
            Ok(payload) => payload,
            Err(_) => return (StatusCode::BAD_REQUEST, "Invalid JSON").into_response(),
        }
    };

    let started = Instant::now();
    let result = state.webhook.forward(&payload).await;
    let elapsed_ms = started.elapsed().as_millis() as u64;

    match result {
        Ok(reply) => {
            tracing::info!(status = reply.status, elapsed_ms, endpoint = state.webhook.endpoint(), "relayed question");
            let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::BAD_GATEWAY);
            let content_type = reply
                .content_type
                .unwrap_or_else(|| "application/json".to_string());
            (status, [(header::CONTENT_TYPE, content_type)], reply.body).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, elapsed_ms, "webhook unreachable");
            (
                StatusCode::BAD_GATEWAY,
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                format!("Upstream error: {e}"),
            )
                .into_response()
        }
    }
}

/// Render assistant text to the HTML fragment the widget shows.
async fn render(body: String) -> Html<String> {
    Html(render_message_html(&body))
}

/// `{"vector": [...]}` in, `{"items": [...]}` out.
async fn vector_search(State(state): State<ServerState>, body: Bytes) -> Response {
    let Some(client) = state.vector.as_ref() else {
        return error_response(StatusCode::SERVICE_UNAVAILABLE, "vector search is not configured");
    };

    let payload: Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, &format!("Invalid JSON: {e}")),
    };
    let vector = payload.get("vector").unwrap_or(&Value::Null);

    match client.query_value(vector).await {
        Ok(items) => Json(json!({ "items": items })).into_response(),
        Err(AirdeeError::InvalidInput(msg)) => error_response(StatusCode::BAD_REQUEST, &msg),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    }
}

/// Keyword and filter search: `{"class", "fulltext", "filters", "sort", "limit", "select"}`
/// in, `{"items": [...]}` out.
async fn weaviate_search(State(state): State<ServerState>, body: Bytes) -> Response {
    let Some(client) = state.vector.as_ref() else {
        return error_response(StatusCode::SERVICE_UNAVAILABLE, "vector search is not configured");
    };

    let query: SearchQuery = if body.is_empty() {
        SearchQuery::default()
    } else {
        match serde_json::from_slice(&body) {
            Ok(query) => query,
            Err(e) => return error_response(StatusCode::BAD_REQUEST, &format!("Invalid JSON: {e}")),
        }
    };

    match client.search(&query).await {
        Ok(items) => Json(json!({ "items": items })).into_response(),
        Err(AirdeeError::InvalidInput(msg)) => error_response(StatusCode::BAD_REQUEST, &msg),
        Err(e) => {
            tracing::error!(error = %e, "search failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &format!("Search failed: {e}"))
        }
    }
}

/// Where GraphQL requests go and whether they carry an API key.
async fn debug_auth(State(state): State<ServerState>) -> Response {
    let Some(client) = state.vector.as_ref() else {
        return error_response(StatusCode::SERVICE_UNAVAILABLE, "vector search is not configured");
    };
    Json(json!({ "url": client.graphql_url(), "auth_type": client.auth_type() })).into_response()
}

/// One-record GraphQL round-trip, reported whatever Weaviate answers.
async fn debug_graphql(State(state): State<ServerState>) -> Response {
    let Some(client) = state.vector.as_ref() else {
        return error_response(StatusCode::SERVICE_UNAVAILABLE, "vector search is not configured");
    };
    match client.probe_graphql().await {
        Ok(probe) => Json(probe).into_response(),
        Err(e) => error_response(StatusCode::BAD_GATEWAY, &e.to_string()),
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}
