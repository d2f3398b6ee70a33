use crate::api::errors::InternalErrorMarker;
use crate::api::handlers::{auth, health, insights, records, storage};
use crate::bridges::LedgerClient;
use crate::config::GatewayConfig;
use crate::storage::{BlobStore, LighthouseStorage};
use anyhow::Result;
use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::{header, HeaderValue, Method, StatusCode, Uri},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use log::{error, warn};
use std::any::Any;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Every route the gateway serves, as advertised by the 404 fallback and
/// printed at startup
pub const ENDPOINTS: &[(&str, &str, &str)] = &[
    ("GET", "/health", "Service and dependency status"),
    ("POST", "/upload", "Upload a file (multipart field 'file')"),
    ("POST", "/auth/challenge", "Issue a wallet sign-in challenge"),
    ("POST", "/auth/verify", "Verify a signed challenge"),
    ("POST", "/farmers/register", "Register a farmer"),
    ("POST", "/crops/register", "Register a crop with predictions"),
    ("POST", "/supply-chain/create", "Create a supply-chain record"),
    ("POST", "/supply-chain/update/:id", "Append a supply-chain event"),
    ("POST", "/ai/predict-yield", "Predict yield, quality and price"),
    ("GET", "/market/intelligence", "Regional market prices"),
    ("GET", "/analytics/farmer/:id", "Farmer analytics summary"),
    ("GET", "/search", "Search crops and regions (?q=&type=)"),
    ("POST", "/migrate/bulk", "Upload up to 20 files at once"),
    ("GET", "/retrieve/:contentId", "Blob metadata and access URL"),
    ("GET", "/lighthouse/stats", "Storage account usage"),
    ("GET", "/network/info", "Chain network and ledger interface"),
];

/// Shared handler state. Everything in here is immutable or internally
/// synchronised; requests never coordinate through it.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub store: Arc<dyn BlobStore>,
    pub ledger: Arc<LedgerClient>,
}

impl AppState {
    pub fn new(config: GatewayConfig, store: Arc<dyn BlobStore>) -> Result<Self> {
        let ledger = LedgerClient::new(config.chain.clone())?;
        Ok(Self {
            config: Arc::new(config),
            store,
            ledger: Arc::new(ledger),
        })
    }
}

async fn endpoint_not_found(uri: Uri) -> Response {
    let endpoints: Vec<String> = ENDPOINTS
        .iter()
        .map(|(method, path, _)| format!("{} {}", method, path))
        .collect();

    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({
            "success": false,
            "error": "Endpoint not found",
            "details": {
                "path": uri.path(),
                "availableEndpoints": endpoints,
            },
        })),
    )
        .into_response()
}

/// Outside development mode, 500s produced from internal failures lose
/// their details before leaving the process
async fn redact_internal_errors(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let response = next.run(request).await;
    if state.config.is_development() || response.extensions().get::<InternalErrorMarker>().is_none() {
        return response;
    }

    (
        response.status(),
        Json(serde_json::json!({
            "success": false,
            "error": "Internal server error",
            "details": null,
        })),
    )
        .into_response()
}

fn panic_response(development: bool, panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    error!("Handler panicked: {}", message);

    let details = if development {
        serde_json::Value::String(message)
    } else {
        serde_json::Value::Null
    };

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({
            "success": false,
            "error": "Internal server error",
            "details": details,
        })),
    )
        .into_response()
}

fn cors_layer(frontend_url: &str) -> CorsLayer {
    let origin = match HeaderValue::from_str(frontend_url.trim_end_matches('/')) {
        Ok(value) => AllowOrigin::exact(value),
        Err(e) => {
            warn!("Ignoring unusable FRONTEND_URL {:?}: {}", frontend_url, e);
            AllowOrigin::list(Vec::<HeaderValue>::new())
        }
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

// API Router
pub fn create_router(state: AppState) -> Router {
    let development = state.config.is_development();
    let body_limit = state.config.max_upload_bytes;
    let cors = cors_layer(&state.config.frontend_url);

    Router::new()
        // Health and info endpoints
        .route("/health", get(health::health_check))
        .route("/network/info", get(health::network_info))
        // Uploads and storage
        .route("/upload", post(storage::upload_file))
        .route("/migrate/bulk", post(storage::migrate_bulk))
        .route("/retrieve/:content_id", get(storage::retrieve))
        .route("/lighthouse/stats", get(storage::lighthouse_stats))
        // Wallet authentication
        .route("/auth/challenge", post(auth::challenge))
        .route("/auth/verify", post(auth::verify))
        // Domain records
        .route("/farmers/register", post(records::register_farmer))
        .route("/crops/register", post(records::register_crop))
        .route("/supply-chain/create", post(records::create_supply_chain))
        .route("/supply-chain/update/:id", post(records::update_supply_chain))
        // Heuristic insights
        .route("/ai/predict-yield", post(insights::predict_yield))
        .route("/market/intelligence", get(insights::market_intelligence))
        .route("/analytics/farmer/:id", get(insights::farmer_analytics))
        .route("/search", get(insights::search))
        .fallback(endpoint_not_found)
        .layer(middleware::from_fn_with_state(state.clone(), redact_internal_errors))
        .layer(CatchPanicLayer::custom(move |panic| panic_response(development, panic)))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(state)
}

// Server startup
pub async fn start_server(config: GatewayConfig) -> Result<()> {
    let port = config.port;
    println!("🚀 Starting AgriChain Gateway on port {}", port);

    if !config.has_storage_credential() {
        warn!("LIGHTHOUSE_API_KEY is not set; uploads will fail until it is configured");
    }

    let store: Arc<dyn BlobStore> = Arc::new(LighthouseStorage::new(config.storage.clone())?);
    let network = config.chain.network.name();
    let state = AppState::new(config, store)?;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    println!("✅ AgriChain Gateway listening on http://0.0.0.0:{} ({})", port, network);
    println!("📚 API Endpoints:");
    for (method, path, description) in ENDPOINTS {
        println!("  {:<5} {:<26} - {}", method, path, description);
    }

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_panic_details_only_in_development() {
        let dev = panic_response(true, Box::new("boom".to_string()));
        assert_eq!(dev.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(dev).await["details"], "boom");

        let prod = panic_response(false, Box::new("boom"));
        let body = body_json(prod).await;
        assert!(body["details"].is_null());
        assert_eq!(body["error"], "Internal server error");
    }

    #[test]
    fn test_endpoint_directory_is_unique() {
        let mut seen: Vec<String> = ENDPOINTS.iter().map(|(m, p, _)| format!("{} {}", m, p)).collect();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), ENDPOINTS.len());
    }
}
