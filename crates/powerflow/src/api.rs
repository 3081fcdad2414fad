use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Html;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Json;
use axum::Router;
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;

use crate::render::Document;

/// Response for the /v1/ping endpoint
#[derive(Serialize)]
struct PingResponse {
    status: String,
}

/// Response for the /v1/info endpoint
#[derive(Serialize)]
struct InfoResponse {
    version: String,
    hostname: String,
}

/// Shared application state
struct AppState {
    version: &'static str,
    document: watch::Receiver<Document>,
}

/// Handler for GET /v1/ping
#[tracing::instrument]
async fn ping() -> impl IntoResponse {
    tracing::debug!("Handling /v1/ping request");
    (
        StatusCode::OK,
        Json(PingResponse {
            status: "ok".to_string(),
        }),
    )
}

/// Handler for GET /v1/info
#[tracing::instrument(skip(state))]
async fn info(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    tracing::debug!("Handling /v1/info request");

    let hostname = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string());

    (
        StatusCode::OK,
        Json(InfoResponse {
            version: state.version.to_string(),
            hostname,
        }),
    )
}

/// Handler for GET /v1/document
#[tracing::instrument(skip(state))]
async fn document(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.document.borrow().snapshot();
    (StatusCode::OK, Json(snapshot))
}

/// Handler for GET /
#[tracing::instrument(skip(state))]
async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let body = state.document.borrow().to_html();
    Html(body)
}

/// Create the API router with all endpoints
fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/v1/ping", get(ping))
        .route("/v1/info", get(info))
        .route("/v1/document", get(document))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the display HTTP API
///
/// Serves the most recently presented document until `shutdown_rx` fires.
///
/// # Arguments
/// * `listen` - The IP address to listen on (e.g., "127.0.0.1")
/// * `port` - The port to listen on (e.g., 8565)
/// * `document` - Receiver for presented document snapshots
/// * `shutdown_rx` - A oneshot receiver that will trigger graceful shutdown
pub async fn serve(
    listen: String,
    port: u16,
    document: watch::Receiver<Document>,
    shutdown_rx: tokio::sync::oneshot::Receiver<()>,
) -> anyhow::Result<()> {
    let version = env!("CARGO_PKG_VERSION");

    let state = Arc::new(AppState { version, document });
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", listen, port).parse()?;
    tracing::info!("Starting display API on {}", addr);

    let listener = TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown_rx.await.ok();
            tracing::info!("Display API shutting down gracefully");
        })
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;
    use crate::render::Element;
    use crate::render::PublishedDocument;
    use crate::render::Surface;

    fn router(document: watch::Receiver<Document>) -> Router {
        create_router(Arc::new(AppState {
            version: "test",
            document,
        }))
    }

    async fn get_body(app: Router, uri: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_ping() {
        let (_surface, rx) = PublishedDocument::new(Document::power_flow());
        let (status, body) = get_body(router(rx), "/v1/ping").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"status":"ok"}"#);
    }

    #[tokio::test]
    async fn test_info_reports_version() {
        let (_surface, rx) = PublishedDocument::new(Document::power_flow());
        let (status, body) = get_body(router(rx), "/v1/info").await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["version"], "test");
        assert!(json["hostname"].is_string());
    }

    #[tokio::test]
    async fn test_document_reflects_presented_state() {
        let (mut surface, rx) = PublishedDocument::new(Document::power_flow());
        surface
            .query_selector("#pv")
            .unwrap()
            .set_attribute("style", "--percentage: 42.00");
        surface.present();

        let (status, body) = get_body(router(rx.clone()), "/v1/document").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("--percentage: 42.00"));

        let (status, html) = get_body(router(rx), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains(r#"<div id="pv" class="bar pv" style="--percentage: 42.00">"#));
    }
}
