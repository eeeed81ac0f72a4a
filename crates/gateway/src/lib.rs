//! HTTP gateway for Ragline.
//!
//! A thin axum surface over the [`Orchestrator`]: a service banner, health
//! and statistics endpoints, and the message endpoint. All state lives in
//! the orchestrator's injected collaborators; the gateway holds nothing of
//! its own beyond a start timestamp.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::extract::rejection::JsonRejection;
use axum::{
    Router,
    extract::State,
    http::{Method, StatusCode, header},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use ragline_agent::{AgentRequest, Orchestrator};
use ragline_config::GatewayConfig;
use ragline_core::error::AgentError;
use ragline_core::message::SessionId;
use ragline_memory::ModeCounts;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub orchestrator: Arc<Orchestrator>,
    pub started_at: DateTime<Utc>,
}

impl GatewayState {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            orchestrator,
            started_at: Utc::now(),
        }
    }
}

type SharedState = Arc<GatewayState>;

/// Build the router with all gateway routes and middleware.
///
/// Layers applied:
/// - CORS allowing any origin for `GET`/`POST` JSON requests
/// - Request body size limit (1 MB)
/// - HTTP trace logging
pub fn build_router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .route("/agent/message", post(message_handler))
        .with_state(state)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Bind and serve until the process is stopped.
pub async fn start(
    orchestrator: Arc<Orchestrator>,
    config: &GatewayConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.host, config.port);
    let state = Arc::new(GatewayState::new(orchestrator.clone()));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(
        addr = %addr,
        chunks = orchestrator.index().len().await,
        tools = ?orchestrator.tools().names(),
        "Gateway listening"
    );
    axum::serve(listener, app).await?;
    Ok(())
}

// --- Handlers ---

async fn root_handler() -> Json<serde_json::Value> {
    Json(json!({
        "message": "Ragline agent server is running",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "POST /agent/message": "Send a message to the agent",
            "GET /health": "Health check",
            "GET /stats": "Index, session and tool statistics",
        }
    }))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: DateTime<Utc>,
    uptime_secs: i64,
    services: HealthServices,
}

#[derive(Serialize)]
struct HealthServices {
    /// `ready` once at least one chunk is indexed, `initializing` before.
    index: &'static str,
    sessions: usize,
    tools: usize,
}

async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    let orch = &state.orchestrator;
    let now = Utc::now();
    Json(HealthResponse {
        status: "healthy",
        timestamp: now,
        uptime_secs: (now - state.started_at).num_seconds(),
        services: HealthServices {
            index: if orch.index().is_empty().await {
                "initializing"
            } else {
                "ready"
            },
            sessions: orch.sessions().session_count().await,
            tools: orch.tools().len(),
        },
    })
}

#[derive(Serialize)]
struct StatsResponse {
    chunks: usize,
    sessions: usize,
    plugins: Vec<String>,
    embedding_modes: ModeCounts,
    generator: String,
}

async fn stats_handler(State(state): State<SharedState>) -> Json<StatsResponse> {
    let orch = &state.orchestrator;
    Json(StatsResponse {
        chunks: orch.index().len().await,
        sessions: orch.sessions().session_count().await,
        plugins: orch.tools().names().into_iter().map(String::from).collect(),
        embedding_modes: orch.index().mode_counts().await,
        generator: orch.generator_name().to_string(),
    })
}

async fn message_handler(
    State(state): State<SharedState>,
    payload: Result<Json<AgentRequest>, JsonRejection>,
) -> Response {
    let mut request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!(error = %rejection, "Rejected message body");
            return error_response(StatusCode::BAD_REQUEST, &rejection.body_text());
        }
    };

    if request.message.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Message is required");
    }
    let session_id = request.session_id.get_or_insert_with(SessionId::new).clone();

    match state.orchestrator.process(request).await {
        Ok(response) => Json(response).into_response(),
        Err(AgentError::EmptyMessage) => {
            error_response(StatusCode::BAD_REQUEST, "Message is required")
        }
        Err(e) => {
            warn!(session_id = %session_id, error = %e, "Message processing failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use ragline_agent::OrchestratorSettings;
    use ragline_core::error::ProviderError;
    use ragline_core::provider::Provider;
    use ragline_core::tool::ToolRegistry;
    use ragline_memory::{SemanticIndex, SessionStore};
    use ragline_tools::{IntentRouter, MathTool, WeatherTool};
    use tower::ServiceExt;

    struct EchoProvider;

    #[async_trait::async_trait]
    impl Provider for EchoProvider {
        fn name(&self) -> &str {
            "echo"
        }

        async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
            Ok(prompt.to_string())
        }
    }

    struct DownProvider;

    #[async_trait::async_trait]
    impl Provider for DownProvider {
        fn name(&self) -> &str {
            "down"
        }

        async fn generate(&self, _prompt: &str) -> Result<String, ProviderError> {
            Err(ProviderError::Network("unreachable".into()))
        }
    }

    fn test_state(generator: Arc<dyn Provider>) -> SharedState {
        let mut tools = ToolRegistry::new();
        tools.register(Arc::new(MathTool));
        tools.register(Arc::new(WeatherTool::offline()));
        let orchestrator = Orchestrator::new(
            Arc::new(SemanticIndex::new(128, None)),
            Arc::new(SessionStore::new(100)),
            Arc::new(tools),
            IntentRouter::with_defaults().unwrap(),
            generator,
            OrchestratorSettings::default(),
        );
        Arc::new(GatewayState::new(Arc::new(orchestrator)))
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_message(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/agent/message")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn root_lists_endpoints() {
        let app = build_router(test_state(Arc::new(EchoProvider)));
        let req = Request::builder().uri("/").body(Body::empty()).unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert!(json["endpoints"]["POST /agent/message"].is_string());
    }

    #[tokio::test]
    async fn health_reports_empty_index_as_initializing() {
        let app = build_router(test_state(Arc::new(EchoProvider)));
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["services"]["index"], "initializing");
        assert_eq!(json["services"]["tools"], 2);
    }

    #[tokio::test]
    async fn stats_after_indexing() {
        let state = test_state(Arc::new(EchoProvider));
        state
            .orchestrator
            .index()
            .add_chunk("Some indexed text about gardens.", "garden.md", None)
            .await
            .unwrap();
        let app = build_router(state);
        let req = Request::builder().uri("/stats").body(Body::empty()).unwrap();
        let json = body_json(app.oneshot(req).await.unwrap()).await;
        assert_eq!(json["chunks"], 1);
        assert_eq!(json["plugins"], json!(["math", "weather"]));
        assert_eq!(json["embedding_modes"]["fallback"], 1);
        assert_eq!(json["generator"], "echo");
    }

    #[tokio::test]
    async fn message_round_trip_keeps_session() {
        let app = build_router(test_state(Arc::new(EchoProvider)));
        let response = app
            .oneshot(post_message(r#"{"message":"what is 3 * 4","session_id":"abc"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["session_id"], "abc");
        assert_eq!(json["plugins_used"], json!(["math"]));
        assert_eq!(json["retrieval_mode"], "fallback");
        assert!(json["reply"].as_str().unwrap().ends_with("Assistant:"));
    }

    #[tokio::test]
    async fn missing_session_id_is_generated() {
        let app = build_router(test_state(Arc::new(EchoProvider)));
        let json = body_json(app.oneshot(post_message(r#"{"message":"hi"}"#)).await.unwrap()).await;
        assert!(!json["session_id"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_message_is_bad_request() {
        for body in [r#"{}"#, r#"{"message":"   "}"#] {
            let app = build_router(test_state(Arc::new(EchoProvider)));
            let response = app.oneshot(post_message(body)).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(body_json(response).await, json!({ "error": "Message is required" }));
        }
    }

    #[tokio::test]
    async fn generation_failure_is_internal_error() {
        let app = build_router(test_state(Arc::new(DownProvider)));
        let response = app.oneshot(post_message(r#"{"message":"hello"}"#)).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await, json!({ "error": "Internal server error" }));
    }
}
