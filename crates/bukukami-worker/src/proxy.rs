//! Local reverse proxy that puts the worker in front of any HTTP client.
//!
//! Requests under the API prefix are rewritten onto the story service,
//! everything else onto the static origin. Every request goes through the
//! worker's fetch dispatch, so it gets the same caching policy as in-process
//! traffic.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode, Uri};
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use bukukami_shared::http::{Body, HttpRequest, HttpResponse, Method, Transport};
use bukukami_shared::TransportError;
use tower_http::trace::TraceLayer;
use tracing::info;
use url::Url;

use crate::config::WorkerConfig;
use crate::error::WorkerError;
use crate::spawn::WorkerHandle;

/// Headers that describe a single hop and are not forwarded.
const HOP_BY_HOP: &[&str] = &[
    "host",
    "connection",
    "keep-alive",
    "transfer-encoding",
    "content-length",
    "upgrade",
    "proxy-connection",
];

#[derive(Clone)]
pub struct ProxyState {
    pub handle: WorkerHandle,
    pub config: Arc<WorkerConfig>,
}

pub fn build_router(state: ProxyState) -> Router {
    Router::new()
        .route("/_worker/health", get(health_check))
        .fallback(forward)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Map a proxy URI onto the upstream URL it stands for.
pub fn rewrite(config: &WorkerConfig, uri: &Uri) -> Result<Url, TransportError> {
    let path = uri.path();
    let prefix = config.api_prefix.as_str();

    let (base, rest) = match path.strip_prefix(prefix) {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => (&config.api_base_url, rest),
        _ => (&config.static_origin, path),
    };

    let mut target = format!("{}{}", base.as_str().trim_end_matches('/'), rest);
    if rest.is_empty() {
        target.push('/');
    }
    if let Some(query) = uri.query() {
        target.push('?');
        target.push_str(query);
    }

    Url::parse(&target).map_err(|e| TransportError::InvalidRequest(format!("{target}: {e}")))
}

async fn forward(
    State(state): State<ProxyState>,
    method: axum::http::Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, WorkerError> {
    let url = rewrite(&state.config, &uri)?;
    let method: Method = method.as_str().parse()?;

    let mut request = HttpRequest::new(method, url);
    for (name, value) in headers.iter() {
        if HOP_BY_HOP.contains(&name.as_str()) {
            continue;
        }
        if let Ok(value) = value.to_str() {
            request = request.header(name.as_str(), value);
        }
    }
    if !body.is_empty() {
        request.body = Body::Bytes(body);
    }

    let response = state.handle.send(request).await?;
    Ok(into_axum(response))
}

fn into_axum(response: HttpResponse) -> Response {
    let mut out = Response::new(axum::body::Body::from(response.body));
    *out.status_mut() = StatusCode::from_u16(response.status).unwrap_or(StatusCode::BAD_GATEWAY);

    for (name, value) in &response.headers {
        if HOP_BY_HOP.contains(&name.to_ascii_lowercase().as_str()) {
            continue;
        }
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            out.headers_mut().append(name, value);
        }
    }
    out
}

pub async fn serve(state: ProxyState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting worker proxy");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
