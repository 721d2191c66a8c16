//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo; each connection is served on its own task
//! and each event is processed to completion within it.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::header::{
    HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN,
};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::config::Args;
use crate::logging::AuditLogger;
use crate::orchestrator::RecommendationOrchestrator;
use crate::routes;
use crate::types::TrellisError;

type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub orchestrator: Arc<RecommendationOrchestrator>,
    pub audit: AuditLogger,
    pub started_at: Instant,
    /// Plan store backend name reported by /health
    pub store_backend: &'static str,
}

impl AppState {
    pub fn new(
        args: Args,
        orchestrator: Arc<RecommendationOrchestrator>,
        audit: AuditLogger,
        store_backend: &'static str,
    ) -> Self {
        Self {
            args,
            orchestrator,
            audit,
            started_at: Instant::now(),
            store_backend,
        }
    }
}

/// Accept connections until the process exits
pub async fn run(state: Arc<AppState>) -> Result<(), TrellisError> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "Trellis listening on {} as node {}",
        state.args.listen, state.args.node_id
    );

    if state.args.dev_mode {
        warn!("Development mode enabled - collaborators may be local stand-ins");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .preserve_header_case(true)
                        .title_case_headers(true)
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<BoxBody>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    debug!("[{}] {} {}", addr, method, path);

    if method == Method::OPTIONS {
        return Ok(to_boxed(preflight_response()));
    }

    let response = match (method, path.as_str()) {
        (Method::POST, "/events") | (Method::POST, "/webhook") => {
            routes::handle_event(Arc::clone(&state), req).await
        }

        (Method::GET, "/health") | (Method::GET, "/healthz") => {
            routes::health_check(Arc::clone(&state)).await
        }

        (Method::GET, "/version") => routes::version_info(),

        (Method::GET, "/events") | (Method::GET, "/webhook") => {
            method_not_allowed_response("POST")
        }

        _ => not_found_response(&path),
    };

    Ok(to_boxed(response))
}

fn to_boxed(response: Response<Full<Bytes>>) -> Response<BoxBody> {
    response.map(|body| body.map_err(|never| match never {}).boxed())
}

/// CORS preflight response
fn preflight_response() -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::new()));
    let headers = response.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    response
}

fn not_found_response(path: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "error": "NotFoundError",
        "message": format!("No route for {}", path),
        "hint": "POST events to /events or /webhook"
    });
    routes::json_response(StatusCode::NOT_FOUND, body.to_string())
}

fn method_not_allowed_response(allowed: &'static str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "error": "MethodNotAllowed",
        "message": format!("Use {}", allowed),
    });
    let mut response = routes::json_response(StatusCode::METHOD_NOT_ALLOWED, body.to_string());
    response
        .headers_mut()
        .insert(hyper::header::ALLOW, HeaderValue::from_static(allowed));
    response
}
