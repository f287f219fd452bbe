//! HTTP server.
//!
//! Built on Hyper and Tokio. Every connection is served over HTTP/1.1;
//! requests under `/_waypoint/` go to the [`ControlApi`], everything else
//! runs through the live middleware chain and then the page handler.
//!
//! ```rust,ignore
//! use waypoint_config::WaypointConfig;
//! use waypoint_server::Server;
//!
//! let server = Server::new(WaypointConfig::default());
//! server.run().await?;
//! ```

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::{TcpListener, TcpStream};

use waypoint_config::WaypointConfig;
use waypoint_core::ApiError;
use waypoint_middleware::{
    MiddlewareChain, MiddlewareContext, PolicyMiddleware, PolicyPipeline, PolicySettings, Request,
    RequestIdMiddleware, Response, ResponseExt, Session,
};

use crate::control::{control_path, ControlApi};
use crate::error::{ServerError, ServerResult};
use crate::health::HealthCheck;
use crate::pages;
use crate::shutdown::{ConnectionTracker, ShutdownSignal};

/// The Waypoint HTTP server.
pub struct Server {
    config: WaypointConfig,
    session: Arc<Session>,
    chain: MiddlewareChain,
    control: ControlApi,
    request_timeout: Duration,
}

impl Server {
    /// Builds the pipeline, session, middleware chain and control API from
    /// `config`.
    #[must_use]
    pub fn new(config: WaypointConfig) -> Self {
        let settings = PolicySettings {
            rate_limit: config.policy.rate_limit,
            blocked_countries: config.policy.blocked_countries.clone(),
        };
        let pipeline = PolicyPipeline::new(config.routes.clone(), settings);
        let session = Arc::new(
            Session::new(pipeline)
                .with_maintenance(config.policy.maintenance_mode)
                .with_country(&config.policy.default_country),
        );

        let policy = PolicyMiddleware::new(Arc::clone(&session))
            .with_default_country(&config.policy.default_country)
            .with_cookie_max_age(config.policy.request_cookie_max_age_secs);
        let chain = MiddlewareChain::builder()
            .with(RequestIdMiddleware)
            .with(policy)
            .build();

        let health = HealthCheck::new(config.telemetry.service_name.clone(), crate::VERSION);
        let control = ControlApi::new(Arc::clone(&session), health);
        let request_timeout = Duration::from_millis(config.server.request_timeout_ms);

        Self {
            config,
            session,
            chain,
            control,
            request_timeout,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &WaypointConfig {
        &self.config
    }

    /// Returns the shared session.
    #[must_use]
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Runs until SIGTERM or SIGINT.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be parsed or bound.
    pub async fn run(self) -> ServerResult<()> {
        let shutdown = ShutdownSignal::with_os_signals();
        self.run_with_shutdown(shutdown).await
    }

    /// Binds the configured address and runs until `shutdown` fires.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be parsed or bound.
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> ServerResult<()> {
        let addr: SocketAddr = self.config.server.http_addr.parse().map_err(|e| {
            ServerError::Bind(format!("Invalid address '{}': {e}", self.config.server.http_addr))
        })?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind(format!("Failed to bind to {addr}: {e}")))?;

        self.serve(listener, shutdown).await
    }

    /// Accepts connections on `listener` until `shutdown` fires, then waits
    /// up to the configured timeout for open connections to finish.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener address cannot be read.
    pub async fn serve(self, listener: TcpListener, shutdown: ShutdownSignal) -> ServerResult<()> {
        let local_addr = listener.local_addr()?;
        tracing::info!(addr = %local_addr, "Server listening");

        let server = Arc::new(self);
        let tracker = ConnectionTracker::new();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, remote_addr)) => {
                            let server = Arc::clone(&server);
                            let token = tracker.acquire();
                            let shutdown = shutdown.clone();

                            tokio::spawn(async move {
                                if let Err(e) = server.handle_connection(stream, remote_addr, shutdown).await {
                                    tracing::error!(remote = %remote_addr, error = %e, "Connection error");
                                }
                                drop(token);
                            });
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to accept connection");
                        }
                    }
                }

                () = shutdown.recv() => {
                    tracing::info!("Shutdown signal received, stopping server");
                    break;
                }
            }
        }

        let shutdown_timeout = Duration::from_secs(server.config.server.shutdown_timeout_secs);
        tracing::info!(
            timeout_secs = shutdown_timeout.as_secs(),
            active = tracker.active_connections(),
            "Waiting for connections to close"
        );

        tokio::select! {
            () = tracker.wait_for_shutdown() => {
                tracing::info!("All connections closed");
            }
            () = tokio::time::sleep(shutdown_timeout) => {
                tracing::warn!(
                    active = tracker.active_connections(),
                    "Shutdown timeout reached"
                );
            }
        }

        tracing::info!("Server stopped");
        Ok(())
    }

    async fn handle_connection(
        self: &Arc<Self>,
        stream: TcpStream,
        remote_addr: SocketAddr,
        shutdown: ShutdownSignal,
    ) -> Result<(), hyper::Error> {
        let io = TokioIo::new(stream);
        let server = Arc::clone(self);

        let service = service_fn(move |req: http::Request<Incoming>| {
            let server = Arc::clone(&server);
            async move { server.handle_incoming(req).await }
        });

        let conn = http1::Builder::new().serve_connection(io, service);

        tokio::select! {
            result = conn => result,
            () = shutdown.recv() => {
                tracing::debug!(remote = %remote_addr, "Connection closed due to shutdown");
                Ok(())
            }
        }
    }

    async fn handle_incoming(
        self: &Arc<Self>,
        req: http::Request<Incoming>,
    ) -> Result<Response, Infallible> {
        let (parts, body) = req.into_parts();

        let body = match tokio::time::timeout(self.request_timeout, body.collect()).await {
            Ok(Ok(collected)) => collected.to_bytes(),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Failed to read request body");
                return Ok(Response::api_error(&ApiError::validation(format!(
                    "failed to read request body: {e}"
                ))));
            }
            Err(_) => {
                tracing::warn!("Request body collection timed out");
                return Ok(Response::text(
                    StatusCode::REQUEST_TIMEOUT,
                    "Request body collection timed out",
                ));
            }
        };

        let request = Request::from_parts(parts, Full::new(body));
        let method = request.method().clone();
        let path = request.uri().path().to_string();

        match tokio::time::timeout(self.request_timeout, self.handle(request)).await {
            Ok(response) => Ok(response),
            Err(_) => {
                tracing::warn!(method = %method, path = %path, "Request timed out");
                Ok(Response::api_error(&ApiError::server("request timed out")))
            }
        }
    }

    /// Handles a request whose body has been collected.
    pub async fn handle(&self, request: Request) -> Response {
        let path = request.uri().path().to_string();
        tracing::debug!(method = %request.method(), path = %path, "Request");

        if let Some(endpoint) = control_path(&path) {
            let (parts, body) = request.into_parts();
            let body = match body.collect().await {
                Ok(collected) => collected.to_bytes(),
                Err(never) => match never {},
            };
            return self.control.handle(&parts.method, endpoint, &body);
        }

        let mut ctx = MiddlewareContext::new();
        self.chain
            .process(&mut ctx, request, |_ctx, req| {
                let response = pages::render_page(req.uri().path());
                Box::pin(async move { response })
            })
            .await
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("http_addr", &self.config.server.http_addr)
            .field("chain", &self.chain)
            .finish_non_exhaustive()
    }
}
