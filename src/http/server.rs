//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with the single catch-all gateway handler
//! - Wire up middleware (request ID, tracing, timeout, body limit)
//! - Bind server to listener, stop on the shutdown broadcast
//! - Dispatch each request to a static file or to the legacy application
//!
//! # Design Decisions
//! - Legacy runs are blocking and go to `spawn_blocking`, gated by a
//!   semaphore of `max_workers` permits held for the whole run
//! - The permit moves into the blocking task, so a request abandoned by the
//!   timeout still counts against the pool until the run ends
//! - Files with a script extension are never served as bytes

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, HeaderValue, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, Semaphore};
use tower::limit::GlobalConcurrencyLimitLayer;
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    set_header::SetResponseHeaderLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{ApplicationConfig, GatewayConfig};
use crate::http::request::InboundRequest;
use crate::http::response::OutboundResponse;
use crate::legacy::{EnvironmentTranslator, LegacyApplication, TranslateError};
use crate::locator::{self, ResolvedResource, ResourceLocator};
use crate::observability::metrics;

const X_REQUEST_ID: &str = "x-request-id";
const SERVER_HEADER: &str = concat!("legacy-gateway/", env!("CARGO_PKG_VERSION"));

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub translator: Arc<EnvironmentTranslator>,
    pub locator: Arc<dyn ResourceLocator>,
    pub application: Arc<ApplicationConfig>,
    pub workers: Arc<Semaphore>,
    pub max_body_size: usize,
}

/// HTTP server hosting one legacy application.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: GatewayConfig, application: Arc<dyn LegacyApplication>) -> Self {
        let state = AppState {
            translator: Arc::new(EnvironmentTranslator::new(application, &config.application)),
            locator: locator::from_kind(config.application.locator),
            application: Arc::new(config.application.clone()),
            workers: Arc::new(Semaphore::new(config.application.max_workers)),
            max_body_size: config.security.max_body_size,
        };

        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        let middleware = ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                let request_id = request
                    .headers()
                    .get(X_REQUEST_ID)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("unknown");
                tracing::info_span!(
                    "request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetResponseHeaderLayer::if_not_present(
                header::SERVER,
                HeaderValue::from_static(SERVER_HEADER),
            ))
            .layer(GlobalConcurrencyLimitLayer::new(config.listener.max_connections))
            .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)));

        Router::new()
            .route("/{*path}", any(gateway_handler))
            .route("/", any(gateway_handler))
            .with_state(state)
            .layer(middleware)
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            document_root = %self.config.application.document_root.display(),
            locator = ?self.config.application.locator,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Draining in-flight requests");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Catch-all handler: static file, or the legacy application.
async fn gateway_handler(
    State(state): State<AppState>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let start_time = Instant::now();
    let method = request.method().to_string();

    let mut inbound = match InboundRequest::from_http(request, remote, &state.application, state.max_body_size).await {
        Ok(inbound) => inbound,
        Err(err) => {
            tracing::warn!(error = %err, "Rejected request");
            let response = err.into_response();
            metrics::record_request(&method, response.status().as_u16(), "error", start_time);
            return response;
        }
    };

    let (kind, response) = match state.locator.locate(&mut inbound) {
        Ok(resource) if !state.application.is_script(resource.extension()) => {
            ("static", serve_file(&resource).await)
        }
        Ok(resource) => {
            tracing::debug!(script = %resource.path.display(), "Script resolved");
            ("legacy", run_legacy(&state, inbound).await)
        }
        Err(err) if state.application.front_controller => {
            tracing::debug!(error = %err, "Falling back to front controller");
            ("legacy", run_legacy(&state, inbound).await)
        }
        Err(err) => ("error", err.into_response()),
    };

    tracing::debug!(
        kind,
        status = response.status().as_u16(),
        elapsed_ms = start_time.elapsed().as_millis() as u64,
        "Request completed"
    );
    metrics::record_request(&method, response.status().as_u16(), kind, start_time);
    response
}

async fn serve_file(resource: &ResolvedResource) -> Response {
    match tokio::fs::read(&resource.path).await {
        Ok(content) => OutboundResponse::from_file(&resource.path, content).into_response(),
        Err(err) => {
            tracing::warn!(path = %resource.path.display(), error = %err, "Failed to read static file");
            (StatusCode::FORBIDDEN, "Forbidden").into_response()
        }
    }
}

async fn run_legacy(state: &AppState, inbound: InboundRequest) -> Response {
    match execute_blocking(state, inbound).await {
        Ok(response) => response.into_response(),
        Err(err) => err.into_response(),
    }
}

async fn execute_blocking(state: &AppState, inbound: InboundRequest) -> Result<OutboundResponse, TranslateError> {
    let permit = state
        .workers
        .clone()
        .acquire_owned()
        .await
        .map_err(|e| TranslateError::Worker(e.to_string()))?;
    let translator = state.translator.clone();

    tokio::task::spawn_blocking(move || {
        let _permit = permit;
        let mut response = OutboundResponse::new();
        if inbound.is_post() {
            translator.do_post(&inbound, &mut response)?;
        } else {
            translator.do_get(&inbound, &mut response)?;
        }
        Ok(response)
    })
    .await
    .map_err(|e| TranslateError::Worker(e.to_string()))?
}
