//! `spillway serve` -- HTTP/WebSocket API server for dam analysis.
//!
//! Exposes the analysis pipeline as an async service using `axum` +
//! `tokio`. Plain HTTP answers the stored-data queries; the WebSocket
//! endpoint streams the five-stage analysis as it runs.
//!
//! Endpoints:
//! - GET /health                   - Server status
//! - GET /history                  - Ten most recent searches
//! - GET /water-level-difference   - Compare stored levels between two dates
//! - GET /ws                       - WebSocket: start analyses, receive events
//!
//! All plain-HTTP responses use Content-Type: application/json.
//!
//! External collaborators (geocoding and imagery analysis) come from
//! `--geocode-url`/`--oracle-url` flags or their environment fallbacks;
//! without either, the server runs self-contained on builtin demo data.

mod handlers;
mod ws;

use std::path::PathBuf;
use std::sync::Arc;

use axum::http::{Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};

use spillway_core::DamRegistry;
use spillway_oracle::{
    AnalysisOracle, Geocoder, HttpAnalysisOracle, HttpGeocoder, StaticGeocoder, StaticOracle,
};
use spillway_storage::{MemoryStore, SearchStore};

use self::handlers::{
    handle_health, handle_history, handle_not_found, handle_water_level_difference,
};
use self::ws::handle_ws_upgrade;

/// Environment fallback for `--oracle-url`.
const ORACLE_URL_ENV: &str = "SPILLWAY_ORACLE_URL";

/// Environment fallback for `--geocode-url`.
const GEOCODE_URL_ENV: &str = "SPILLWAY_GEOCODE_URL";

/// Shared state handed to every handler and analysis session.
pub(crate) struct AppState {
    pub geocoder: Arc<dyn Geocoder>,
    pub oracle: Arc<dyn AnalysisOracle>,
    pub store: Arc<dyn SearchStore>,
    pub registry: DamRegistry,
}

/// Construct a JSON error response with the given status code and message.
fn json_error(status: StatusCode, message: &str) -> impl IntoResponse {
    (status, Json(serde_json::json!({"error": message})))
}

/// Start the HTTP server on the given port.
///
/// When TLS cert/key paths are provided, the server listens over HTTPS
/// using `axum-server` with rustls. Otherwise it uses plain HTTP.
///
/// Security:
/// - CORS: Permissive (`Any` origin) for local dev; tighten for production.
/// - No auth: the API serves public reservoir data.
pub async fn start_server(
    port: u16,
    registry_path: Option<PathBuf>,
    oracle_url: Option<String>,
    geocode_url: Option<String>,
    _tls_cert: Option<PathBuf>,
    _tls_key: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let registry = match &registry_path {
        Some(path) => {
            let registry = DamRegistry::load(path)?;
            eprintln!("Loaded registry: {} dams (from {})", registry.len(), path.display());
            registry
        }
        None => DamRegistry::builtin(),
    };

    let geocode_url = geocode_url.or_else(|| std::env::var(GEOCODE_URL_ENV).ok());
    let geocoder: Arc<dyn Geocoder> = match geocode_url {
        Some(url) => Arc::new(HttpGeocoder::new(&url).with_region_hint("India")),
        None => {
            eprintln!("No geocoding service configured; using builtin demo places");
            Arc::new(StaticGeocoder::demo())
        }
    };

    let oracle_url = oracle_url.or_else(|| std::env::var(ORACLE_URL_ENV).ok());
    let oracle: Arc<dyn AnalysisOracle> = match oracle_url {
        Some(url) => Arc::new(HttpAnalysisOracle::new(&url)),
        None => {
            eprintln!("No analysis service configured; using builtin demo reservoir");
            Arc::new(StaticOracle::demo())
        }
    };

    let state = Arc::new(AppState {
        geocoder,
        oracle,
        store: Arc::new(MemoryStore::new()),
        registry,
    });

    // CORS: permissive for local dev
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(handle_health))
        .route("/history", get(handle_history))
        .route("/water-level-difference", get(handle_water_level_difference))
        .route("/ws", get(handle_ws_upgrade))
        .fallback(handle_not_found)
        .layer(cors)
        .with_state(state);

    let addr = format!("0.0.0.0:{}", port);

    // TLS support via axum-server + rustls (requires `tls` feature)
    #[cfg(feature = "tls")]
    if let (Some(cert_path), Some(key_path)) = (&_tls_cert, &_tls_key) {
        let config =
            axum_server::tls_rustls::RustlsConfig::from_pem_file(cert_path, key_path).await?;
        let socket_addr: std::net::SocketAddr = addr.parse()?;
        eprintln!("Spillway listening on https://0.0.0.0:{}", port);
        axum_server::bind_rustls(socket_addr, config)
            .serve(app.into_make_service())
            .await?;
        return Ok(());
    }

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    eprintln!("Spillway listening on http://0.0.0.0:{}", port);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    eprintln!("\nServer shut down.");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install Ctrl+C handler");
    eprintln!("\nReceived shutdown signal...");
}
