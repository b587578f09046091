//! Request pipeline: validate, fetch, extract, render, rasterize.

use crate::extract::extract_metadata;
use crate::fetch::Fetcher;
use crate::raster::Rasterizer;
use crate::template::{render_html, AssetCache};
use crate::{Error, RasterImage, RenderedDocument, Result, ServiceConfig, CACHE_CONTROL};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use log::{debug, warn};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;

/// What a successful request produces
#[derive(Debug, Clone)]
pub enum OgOutput {
    /// The rasterized card
    Image(RasterImage),
    /// The card HTML, returned instead of an image in debug mode
    Html(RenderedDocument),
}

impl OgOutput {
    pub fn content_type(&self) -> &'static str {
        match self {
            OgOutput::Image(img) => img.mime_type,
            OgOutput::Html(_) => "text/html",
        }
    }

    pub fn body_len(&self) -> usize {
        match self {
            OgOutput::Image(img) => img.bytes.len(),
            OgOutput::Html(doc) => doc.html.len(),
        }
    }

    /// Raw body bytes, as written to disk or to the wire.
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            OgOutput::Image(img) => img.bytes,
            OgOutput::Html(doc) => doc.html.into_bytes(),
        }
    }
}

/// Strong ETag for image bytes.
pub fn etag_for(bytes: &[u8]) -> String {
    format!("\"{}\"", hex::encode(Sha256::digest(bytes)))
}

impl IntoResponse for OgOutput {
    fn into_response(self) -> Response {
        match self {
            OgOutput::Image(img) => {
                let etag = etag_for(&img.bytes);
                (
                    StatusCode::OK,
                    [
                        (header::CONTENT_TYPE, img.mime_type.to_string()),
                        (header::CACHE_CONTROL, CACHE_CONTROL.to_string()),
                        (header::ETAG, etag),
                    ],
                    img.bytes,
                )
                    .into_response()
            }
            OgOutput::Html(doc) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/html")],
                doc.html,
            )
                .into_response(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, [(header::CONTENT_TYPE, "text/plain")], self.public_body()).into_response()
    }
}

/// Accept only paths that start with `/`.
pub fn validate_path(path: Option<&str>) -> Result<&str> {
    match path {
        Some(p) if p.starts_with('/') => Ok(p),
        Some(p) => Err(Error::InvalidPath(p.to_string())),
        None => Err(Error::InvalidPath(String::new())),
    }
}

/// Long-lived service context shared by all requests
pub struct OgService {
    config: ServiceConfig,
    fetcher: Arc<dyn Fetcher>,
    rasterizer: Arc<dyn Rasterizer>,
    assets: AssetCache,
}

impl OgService {
    pub fn new(config: ServiceConfig, fetcher: Arc<dyn Fetcher>, rasterizer: Arc<dyn Rasterizer>) -> Self {
        let assets = AssetCache::new(config.assets_dir.clone());
        Self {
            config,
            fetcher,
            rasterizer,
            assets,
        }
    }

    /// Replace the asset cache, e.g. with a preloaded one.
    pub fn with_assets(mut self, assets: AssetCache) -> Self {
        self.assets = assets;
        self
    }

    pub fn assets(&self) -> &AssetCache {
        &self.assets
    }

    /// Run the whole pipeline for one requested path.
    ///
    /// Every failure is terminal for the request; nothing is retried.
    /// Rasterization, including a first browser launch, is bounded by
    /// `render_timeout_ms`.
    pub async fn generate(&self, path: Option<&str>) -> Result<OgOutput> {
        let path = validate_path(path)?;

        let upstream = self.fetcher.fetch(path).await?;
        debug!("upstream answered {} for {}", upstream.status, path);
        match upstream.status {
            404 => return Err(Error::UpstreamNotFound),
            200 => {}
            other => return Err(Error::UpstreamStatus(other)),
        }
        if upstream.body.is_empty() {
            return Err(Error::EmptyBody);
        }

        // Parsing a full docs page is CPU work; keep it off the reactor
        let site_name = self.config.site_name.clone();
        let body = upstream.body;
        let meta = tokio::task::spawn_blocking(move || extract_metadata(&body, &site_name))
            .await
            .map_err(|e| Error::Other(format!("Metadata extraction task failed: {}", e)))??;
        let assets = self.assets.get().await?;
        let doc = render_html(&meta, assets, self.config.viewport);

        if self.config.html_debug {
            return Ok(OgOutput::Html(doc));
        }

        let image = self.rasterize(&doc).await?;
        Ok(OgOutput::Image(image))
    }

    async fn rasterize(&self, doc: &RenderedDocument) -> Result<RasterImage> {
        let limit = self.config.render_timeout_ms;
        tokio::time::timeout(Duration::from_millis(limit), self.rasterizer.rasterize(doc))
            .await
            .map_err(|_| {
                warn!("rasterization exceeded {}ms", limit);
                Error::Timeout(limit)
            })?
    }
}
