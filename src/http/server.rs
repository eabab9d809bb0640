//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router: admin API plus the placeholder application
//! - Wire up middleware (request ID, tracing, timeout, admission)
//! - Start background tasks (throttle sweeper, status sync, config store)
//! - Serve until shutdown

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{middleware, routing::any, Router};
use tokio::net::TcpListener;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admin::{setup_admin_router, AdminState};
use crate::config::schema::GuardConfig;
use crate::events::ConfigStoreListener;
use crate::http::middleware::{admission_middleware, GuardState};
use crate::lifecycle::{assemble, Components, Shutdown, StartupError};
use crate::observability::tracing::request_span;
use crate::rules::BanStore;

/// HTTP host for the admission pipeline.
pub struct HttpServer {
    router: Router,
    config: GuardConfig,
    config_path: Option<PathBuf>,
    components: Components,
}

impl HttpServer {
    pub fn new(config: GuardConfig, store: Arc<dyn BanStore>) -> Result<Self, StartupError> {
        let components = assemble(&config, store)?;
        let router = Self::build_router(&config, &components);
        Ok(Self {
            router,
            config,
            config_path: None,
            components,
        })
    }

    /// File the config store listener writes submitted settings to.
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    #[allow(deprecated)]
    fn build_router(config: &GuardConfig, components: &Components) -> Router {
        let guard = GuardState::new(components.pipeline.clone(), config);

        let mut router = Router::new()
            .route("/", any(application_handler))
            .route("/{*path}", any(application_handler));
        if config.admin.enabled {
            router = router.merge(setup_admin_router(AdminState::new(
                &config.admin.api_key,
                components,
            )));
        }

        router
            .layer(middleware::from_fn_with_state(guard, admission_middleware))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http().make_span_with(request_span))
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The fully layered router. Needs `ConnectInfo<SocketAddr>` for client IPs.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn components(&self) -> &Components {
        &self.components
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        tokio::spawn(self.components.throttle.clone().run_sweeper(
            Duration::from_secs(self.config.throttle.purge_interval_secs),
            shutdown.subscribe(),
        ));

        tokio::spawn(self.components.repository.clone().run_status_sync(
            Duration::from_secs(self.config.store.sync_interval_secs),
            shutdown.subscribe(),
        ));

        if self.config.admin.enabled {
            let listener = ConfigStoreListener::new(self.config_path.clone(), self.config.clone());
            tokio::spawn(listener.run(
                self.components.bus.subscribe_security_form(),
                shutdown.subscribe(),
            ));
        }

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(Shutdown::wait(shutdown.subscribe()))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Stand-in for the protected application.
async fn application_handler() -> &'static str {
    "OK"
}
