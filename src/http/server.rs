//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with every portal route
//! - Wire up middleware (tracing, timeout, request ID, metrics)
//! - Run the accept loop with graceful shutdown
//! - Start the session sweeper background task
//!
//! # Design Decisions
//! - One shared [`ApiGateway`] (connection pool) for every session; the
//!   per-browser upstream identity travels in the session record instead
//! - Shutdown is broadcast-based so the sweeper and the accept loop stop
//!   from the same trigger

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{MatchedPath, Request};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::PortalConfig;
use crate::gateway::ApiGateway;
use crate::http::{api, auth, portal};
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::session::SessionStore;

/// Application state injected into handlers and extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<PortalConfig>,
    pub gateway: ApiGateway,
    pub sessions: Arc<SessionStore>,
}

/// HTTP server for the portal.
pub struct PortalServer {
    router: Router,
    sessions: Arc<SessionStore>,
}

impl PortalServer {
    /// Create a new server from a validated configuration.
    pub fn new(config: PortalConfig) -> Result<Self, reqwest::Error> {
        let gateway = ApiGateway::new(&config.api)?;
        let sessions = Arc::new(SessionStore::new(&config.session));

        let state = AppState {
            config: Arc::new(config.clone()),
            gateway,
            sessions: sessions.clone(),
        };

        let router = Self::build_router(&config, state);
        Ok(Self { router, sessions })
    }

    /// Build the Axum router with all routes and middleware layers.
    fn build_router(config: &PortalConfig, state: AppState) -> Router {
        Router::new()
            // Protected pages
            .route("/", get(portal::dashboard))
            .route("/profile", get(portal::profile))
            .route(
                "/historial-clinico",
                get(portal::historial_form).post(portal::historial_submit),
            )
            .route("/consulta-citas", get(portal::consulta_citas))
            .route("/mis-citas", get(portal::mis_citas))
            // Authentication flows
            .route("/auth/login", get(auth::login_form).post(auth::login_submit))
            .route("/auth/logout", get(auth::logout).post(auth::logout))
            .route(
                "/auth/forgot-password",
                get(auth::forgot_password_form).post(auth::forgot_password_submit),
            )
            .route(
                "/auth/change-password",
                get(auth::change_password_form).post(auth::change_password_submit),
            )
            .route(
                "/auth/change-password-logged",
                get(auth::change_password_logged_form).post(auth::change_password_logged_submit),
            )
            // JSON endpoints for the page scripts
            .route(
                "/api/doctores-especialidad/{id_especialidad}",
                get(api::doctores_por_especialidad),
            )
            .route("/api/detalle-cita/{id_cita}", get(api::detalle_cita))
            .route("/api/citas/consulta-general", get(api::consulta_general_citas))
            .route("/api/mis-citas", get(api::mis_citas_medico))
            .with_state(state)
            // route_layer so MatchedPath is populated for the metrics label
            .route_layer(middleware::from_fn(track_requests))
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.listener.request_timeout_secs,
            )))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server until the shutdown coordinator fires.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        spawn_session_sweeper(self.sessions.clone(), shutdown.subscribe());

        let mut rx = shutdown.subscribe();
        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = rx.recv().await;
                tracing::info!("shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Record request metrics keyed by the matched route template, so path
/// parameters do not explode label cardinality.
async fn track_requests(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    let response = next.run(request).await;

    metrics::record_http_request(&method, &route, response.status().as_u16(), start.elapsed());
    response
}

/// Periodically evict expired sessions until shutdown.
fn spawn_session_sweeper(
    sessions: Arc<SessionStore>,
    mut shutdown: tokio::sync::broadcast::Receiver<()>,
) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(sessions.sweep_interval());
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let evicted = sessions.sweep();
                    if evicted > 0 {
                        tracing::debug!(evicted, "expired sessions swept");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::debug!("session sweeper stopping");
                    break;
                }
            }
        }
    });
}
