//! Server assembly: store + registry + relay + router lifecycle.

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use orderstream_core::{OrderStore, StoreConfig};

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::metrics::RelayMetrics;
use crate::registry::SessionRegistry;
use crate::relay::{ChangeRelay, RelayState};
use crate::routes::{api_router, AppState};
use crate::ws;

/// An OrderStream server: explicitly constructed and owned, with an
/// explicit serve lifecycle.
///
/// `serve` runs until shutdown or until the change relay fails; relay
/// failure returns [`ServerError::RelayFailed`] so the hosting process
/// can exit and restart, forcing every client to re-bootstrap.
pub struct Server {
    config: ServerConfig,
    store: Arc<OrderStore>,
    registry: Arc<SessionRegistry>,
    metrics: Arc<RelayMetrics>,
}

impl Server {
    /// Creates a server with a fresh store from the given configuration.
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        let store = Arc::new(OrderStore::new(StoreConfig {
            feed_capacity: config.feed_capacity,
        }));
        let metrics = Arc::new(RelayMetrics::new());
        let registry = Arc::new(SessionRegistry::new(
            config.session_buffer,
            Arc::clone(&metrics),
        ));
        Self {
            config,
            store,
            registry,
            metrics,
        }
    }

    /// The underlying change source.
    #[must_use]
    pub fn store(&self) -> Arc<OrderStore> {
        Arc::clone(&self.store)
    }

    /// Builds the full router: CRUD routes, `/ws` live channel, CORS and
    /// request tracing.
    #[must_use]
    pub fn router(&self) -> Router {
        let state = AppState {
            store: Arc::clone(&self.store),
            registry: Arc::clone(&self.registry),
            metrics: Arc::clone(&self.metrics),
        };

        api_router(state.clone())
            .merge(Router::new().route("/ws", get(ws::ws_handler)).with_state(state))
            .layer(self.cors_layer())
            .layer(TraceLayer::new_for_http())
    }

    fn cors_layer(&self) -> CorsLayer {
        let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
        match self
            .config
            .allowed_origin
            .as_deref()
            .map(str::parse::<HeaderValue>)
        {
            Some(Ok(origin)) => cors.allow_origin(origin),
            Some(Err(_)) => {
                warn!(
                    origin = ?self.config.allowed_origin,
                    "invalid allowed origin, falling back to any"
                );
                cors.allow_origin(Any)
            }
            None => cors.allow_origin(Any),
        }
    }

    /// Binds the configured address and serves until shutdown or relay
    /// failure.
    ///
    /// # Errors
    ///
    /// I/O errors from bind/serve, or [`ServerError::RelayFailed`] when
    /// the change feed dies.
    pub async fn serve(self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        self.serve_on(listener).await
    }

    /// Serves on an already-bound listener (useful for ephemeral ports).
    ///
    /// # Errors
    ///
    /// Same conditions as [`serve`](Self::serve).
    pub async fn serve_on(self, listener: TcpListener) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        info!(bind = %addr, "orderstream server listening");

        let mut relay = ChangeRelay::spawn(self.store.subscribe(), Arc::clone(&self.registry));
        let app = self.router();
        let serve = async move { axum::serve(listener, app).await };

        tokio::select! {
            result = serve => {
                relay.shutdown();
                result?;
                Ok(())
            }
            state = relay.wait() => {
                if state == RelayState::Failed {
                    Err(ServerError::RelayFailed)
                } else {
                    Ok(())
                }
            }
        }
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("bind_addr", &self.config.bind_addr)
            .field("orders", &self.store.len())
            .field("sessions", &self.registry.session_count())
            .finish_non_exhaustive()
    }
}
