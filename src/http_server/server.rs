//! # HTTP Server

use std::net::SocketAddr;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use super::config::HttpServerConfig;
use super::routes::{status_routes, SharedHooks};
use crate::observability::{Event, Logger};

pub struct HttpServer {
    config: HttpServerConfig,
    router: Router,
}

impl HttpServer {
    pub fn new(config: HttpServerConfig, hooks: SharedHooks) -> Self {
        let router = Self::build_router(&config, hooks);
        Self { config, router }
    }

    fn build_router(config: &HttpServerConfig, hooks: SharedHooks) -> Router {
        let origins = if config.cors_origins.is_empty() {
            AllowOrigin::any()
        } else {
            let parsed: Vec<_> = config
                .cors_origins
                .iter()
                .filter_map(|s| s.parse().ok())
                .collect();
            AllowOrigin::list(parsed)
        };

        let cors = CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any);

        status_routes(hooks).layer(cors)
    }

    pub fn socket_addr(&self) -> String {
        self.config.socket_addr()
    }

    /// Get the router (for testing)
    pub fn router(self) -> Router {
        self.router
    }

    pub async fn start(self) -> Result<(), std::io::Error> {
        let addr: SocketAddr = self
            .config
            .socket_addr()
            .parse()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

        let listener = TcpListener::bind(addr).await?;
        let bound = listener.local_addr()?.to_string();
        Logger::info(Event::Serving, &[("addr", bound.as_str())]);

        axum::serve(listener, self.router).await
    }
}
