//! HTTP server setup and request dispatch.
//!
//! # Responsibilities
//! - Create Axum Router with the dispatch handler
//! - Wire up middleware (tracing, timeout, request ID)
//! - Bind server to listener
//! - Dispatch requests: zone → module → resource
//! - Publish new configuration snapshots as they are built
//! - Observability (metrics, correlation IDs)

use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::State,
    http::{header, request::Parts, Request},
    response::Response,
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::HostConfig;
use crate::error::WiringError;
use crate::http::request::{request_id, MakeRequestUuidV4, X_REQUEST_ID};
use crate::http::{resource, response};
use crate::lifecycle::startup;
use crate::modules::Application;
use crate::observability::metrics;
use crate::routing::request::cookie_value;
use crate::routing::RequestContext;

/// Quiet period after a change notification before rebuilding, so a burst of
/// file events produces one configuration pass.
const RELOAD_DEBOUNCE: Duration = Duration::from_millis(200);

/// Where the host stands with its modules.
#[derive(Debug, Clone)]
pub enum HostState {
    /// The first configuration pass hasn't finished.
    Initializing,
    Ready(Arc<Application>),
    /// The last configuration pass failed.
    Failed(Arc<WiringError>),
}

/// Everything a request needs, swapped as one unit on reconfiguration.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub config: Arc<HostConfig>,
    pub state: HostState,
}

impl Snapshot {
    pub fn new(config: HostConfig, state: HostState) -> Self {
        Self {
            config: Arc::new(config),
            state,
        }
    }

    pub fn application(&self) -> Option<&Arc<Application>> {
        match &self.state {
            HostState::Ready(app) => Some(app),
            _ => None,
        }
    }
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub snapshot: Arc<ArcSwap<Snapshot>>,
}

/// HTTP server for the module host.
pub struct HostServer {
    router: Router,
    config: HostConfig,
    snapshot: Arc<ArcSwap<Snapshot>>,
}

impl HostServer {
    /// Create a server that answers "initializing" until [`run`](Self::run)
    /// completes the first configuration pass.
    pub fn new(config: HostConfig) -> Self {
        let snapshot = Arc::new(ArcSwap::from_pointee(Snapshot::new(
            config.clone(),
            HostState::Initializing,
        )));
        let state = AppState {
            snapshot: snapshot.clone(),
        };
        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            snapshot,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &HostConfig, state: AppState) -> Router {
        let id_header = header::HeaderName::from_static(X_REQUEST_ID);

        Router::new()
            .route("/{*path}", any(dispatch))
            .route("/", any(dispatch))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::new(id_header.clone()))
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id(request),
                )
            }))
            .layer(SetRequestIdLayer::new(id_header, MakeRequestUuidV4))
    }

    /// The router, for serving in-process (tests, embedding).
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Shared handle to the published snapshot.
    pub fn snapshot(&self) -> Arc<ArcSwap<Snapshot>> {
        self.snapshot.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Run the first configuration pass, then serve until `shutdown` fires.
    ///
    /// Every configuration received on `config_updates` triggers a new pass;
    /// its result replaces the published snapshot atomically.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<HostConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, name = %self.config.name, "HTTP server starting");

        let snapshot = self.snapshot.clone();
        let initial = self.config.clone();
        let reloader = tokio::spawn(async move {
            startup::reconfigure(&snapshot, initial).await;

            while let Some(mut config) = config_updates.recv().await {
                tokio::time::sleep(RELOAD_DEBOUNCE).await;
                while let Ok(newer) = config_updates.try_recv() {
                    config = newer;
                }
                tracing::info!("Configuration change detected, rewiring modules");
                startup::reconfigure(&snapshot, config).await;
            }
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        reloader.abort();
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Main dispatch handler.
/// Resolves the zone and owning module, then serves the module resource.
async fn dispatch(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let snapshot = state.snapshot.load_full();
    let (parts, _body) = request.into_parts();
    let method = parts.method.to_string();

    let (module, mut response) = match &snapshot.state {
        HostState::Initializing => (None, response::initializing_page()),
        HostState::Failed(error) => (None, response::error_page(error)),
        HostState::Ready(app) => serve(app, &snapshot.config, &parts).await,
    };
    set_routing_cookie(&snapshot.config, &parts, &mut response);

    let module = module.unwrap_or_else(|| "none".to_string());
    metrics::record_request(&method, response.status().as_u16(), &module, start_time);
    response
}

async fn serve(app: &Arc<Application>, config: &HostConfig, parts: &Parts) -> (Option<String>, Response) {
    let request = match RequestContext::from_parts(parts, &config.context_path) {
        Ok(request) => request,
        Err(e) => {
            tracing::debug!(path = %parts.uri.path(), error = %e, "Request path is not UTF-8 once decoded");
            return (None, response::not_found(parts.uri.path()));
        }
    };
    let zone = app.mounter().get_zone(&request);

    let Some(module) = app.module_for(&request.path, zone) else {
        tracing::warn!(path = %request.path, "No module owns the path");
        return (None, response::not_found(&request.path));
    };

    let relative = module.relative_path(&request.path);
    tracing::debug!(
        path = %request.path,
        zone = ?zone.map(|z| z.name()),
        module = %module.name(),
        relative = %relative,
        "Dispatching request"
    );

    let base_url = request.true_context_path(false);
    let response = resource::process(app.clone(), module.name(), relative, &base_url, &config.modules.marker).await;

    (Some(module.name().to_string()), response)
}

/// Add `host=.<name>` unless the request already carries it, whatever state
/// the host is in.
fn set_routing_cookie(config: &HostConfig, parts: &Parts, res: &mut Response) {
    if !config.routing_cookie.enabled {
        return;
    }
    let present = parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|cookies| cookie_value(cookies, response::ROUTING_COOKIE).is_some());
    if present {
        return;
    }
    if let Some(cookie) = response::routing_cookie(&config.name, config.routing_cookie.max_age_secs) {
        res.headers_mut().append(header::SET_COOKIE, cookie);
    }
}
