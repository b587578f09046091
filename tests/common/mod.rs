//! Shared fakes for pipeline tests

#![allow(dead_code)]

use async_trait::async_trait;
use ogshot::fetch::Fetcher;
use ogshot::handler::OgService;
use ogshot::raster::Rasterizer;
use ogshot::template::{AssetCache, CardAssets};
use ogshot::{Error, RasterImage, RenderedDocument, Result, ServiceConfig, UpstreamResponse, IMAGE_MIME_TYPE};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const INSTALLATION_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <title>Installation - Tailwind CSS</title>
  <meta property="og:description" content="The simplest and fastest way to get up and running with Tailwind CSS from scratch.">
</head>
<body>
  <header id="header">
    <div><p>Getting Started</p></div>
    <h1>Installation</h1>
  </header>
</body>
</html>"#;

/// Serves canned upstream answers; unknown paths fail like a reset connection.
#[derive(Default)]
pub struct FakeFetcher {
    pages: HashMap<String, (u16, String)>,
    calls: AtomicUsize,
}

impl FakeFetcher {
    pub fn with_page(mut self, path: &str, status: u16, body: &str) -> Self {
        self.pages.insert(path.to_string(), (status, body.to_string()));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch(&self, path: &str) -> Result<UpstreamResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.pages.get(path) {
            Some((status, body)) => Ok(UpstreamResponse {
                body: body.clone(),
                status: *status,
            }),
            None => Err(Error::NetworkError("connection reset by 10.1.2.3".into())),
        }
    }
}

/// Produces PNG-magic-prefixed bytes derived from the document, so equal
/// documents give equal images.
#[derive(Default)]
pub struct FakeRasterizer {
    calls: AtomicUsize,
    fail: bool,
    delay: Option<Duration>,
}

impl FakeRasterizer {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    /// Takes `delay` before answering, like a browser stuck on a heavy page.
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Rasterizer for FakeRasterizer {
    async fn rasterize(&self, doc: &RenderedDocument) -> Result<RasterImage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(Error::RenderError("Target closed".into()));
        }
        let mut bytes = b"\x89PNG\r\n\x1a\n".to_vec();
        bytes.extend_from_slice(&Sha256::digest(doc.html.as_bytes()));
        Ok(RasterImage {
            bytes,
            mime_type: IMAGE_MIME_TYPE,
        })
    }
}

pub fn service(
    config: ServiceConfig,
    fetcher: Arc<FakeFetcher>,
    rasterizer: Arc<FakeRasterizer>,
) -> Arc<OgService> {
    let assets = AssetCache::preloaded(CardAssets::from_bytes(b"background", b"font"));
    Arc::new(OgService::new(config, fetcher, rasterizer).with_assets(assets))
}
