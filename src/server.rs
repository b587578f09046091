//! HTTP surface.

use crate::fetch::HttpFetcher;
use crate::handler::OgService;
use crate::raster::SharedPage;
use crate::template::check_assets;
use crate::{Error, Result, ServiceConfig};
use axum::extract::{RawQuery, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use log::{error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

/// Route serving preview images
pub const OG_ROUTE: &str = "/api/og";

/// Build the router over an existing service.
pub fn router(service: Arc<OgService>) -> Router {
    Router::new()
        .route(OG_ROUTE, get(og_handler))
        .route("/healthz", get(health_handler))
        .with_state(service)
}

/// First `path` value of a raw query string, percent-decoded.
pub fn path_param(query: &str) -> Option<String> {
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "path")
        .map(|(_, value)| value.into_owned())
}

async fn og_handler(State(service): State<Arc<OgService>>, RawQuery(query): RawQuery) -> Response {
    let path = query.as_deref().and_then(path_param);
    let started = Instant::now();

    match service.generate(path.as_deref()).await {
        Ok(output) => {
            info!(
                "rendered {} as {} ({} bytes in {:?})",
                path.as_deref().unwrap_or_default(),
                output.content_type(),
                output.body_len(),
                started.elapsed()
            );
            output.into_response()
        }
        Err(err) => {
            match &err {
                Error::InvalidPath(_) | Error::UpstreamNotFound => {
                    warn!("request for {:?} rejected: {}", path, err)
                }
                _ => error!("request for {:?} failed: {}", path, err),
            }
            err.into_response()
        }
    }
}

async fn health_handler() -> &'static str {
    "ok"
}

/// Serve until Ctrl-C, then shut the browser down.
pub async fn serve(config: ServiceConfig, addr: SocketAddr) -> Result<()> {
    let fetcher = Arc::new(HttpFetcher::new(&config)?);
    let page = Arc::new(SharedPage::new(&config));
    let upstream = config.upstream_base.clone();
    let service = Arc::new(OgService::new(config, fetcher, page.clone()));
    check_assets(service.assets().dir());

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::InitializationError(format!("Failed to bind {}: {}", addr, e)))?;
    info!("serving previews of {} on http://{}{}", upstream, addr, OG_ROUTE);

    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| Error::Other(format!("Server error: {}", e)))?;

    page.close().await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_param_decodes_value() {
        assert_eq!(
            path_param("path=%2Fdocs%2Finstallation").as_deref(),
            Some("/docs/installation")
        );
        assert_eq!(path_param("a=1&path=/docs&path=/other").as_deref(), Some("/docs"));
        assert_eq!(path_param("other=1"), None);
        assert_eq!(path_param(""), None);
    }
}
