//! ogshot: social preview images for documentation pages
//!
//! Fetches a documentation page from a fixed upstream host, pulls out its
//! title, super title and description, fills them into a self-contained HTML
//! card and rasterizes that card to PNG with headless Chrome.
//!
//! # Pipeline
//!
//! - **fetch**: GET `<upstream><path>` and buffer the body
//! - **extract**: parse the HTML and build [`PageMetadata`]
//! - **template**: inline the cached background/font and produce a [`RenderedDocument`]
//! - **raster**: load the document into a single shared Chrome tab and screenshot it
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use ogshot::{fetch::HttpFetcher, handler::OgService, raster::SharedPage, ServiceConfig};
//!
//! # async fn run() -> ogshot::Result<()> {
//! let config = ServiceConfig::from_env()?;
//! let fetcher = Arc::new(HttpFetcher::new(&config)?);
//! let page = Arc::new(SharedPage::new(&config));
//! let service = OgService::new(config, fetcher, page);
//!
//! let output = service.generate(Some("/docs/installation")).await?;
//! println!("{} bytes", output.body_len());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;

pub mod error;
pub use error::{Error, Result};

pub mod extract;
pub mod fetch;
pub mod handler;
pub mod raster;
pub mod server;
pub mod template;

/// MIME type of every image this crate produces
pub const IMAGE_MIME_TYPE: &str = "image/png";

/// Cache policy sent with generated images
pub const CACHE_CONTROL: &str = "public, no-transform, s-maxage=31536000, max-age=3600";

/// How the Chrome binary is located
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowserMode {
    /// Launch a specific, locally installed Chrome
    Local { executable: PathBuf },
    /// Let the browser library find its own binary and use container-friendly flags
    Managed,
}

impl Default for BrowserMode {
    fn default() -> Self {
        BrowserMode::Local {
            executable: default_chrome_path(),
        }
    }
}

fn default_chrome_path() -> PathBuf {
    let path = if cfg!(target_os = "windows") {
        r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe"
    } else if cfg!(target_os = "linux") {
        "/usr/bin/google-chrome"
    } else {
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome"
    };
    PathBuf::from(path)
}

/// Default assets directory.
///
/// Prefers an `assets/` directory next to the running binary, then the one in
/// the crate checkout. Neither depends on the working directory.
pub fn default_assets_dir() -> PathBuf {
    let beside_binary = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("assets")));
    let in_checkout = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets");
    pick_assets_dir(beside_binary.into_iter().chain(std::iter::once(in_checkout)))
}

// First candidate holding the background image, else the last candidate.
fn pick_assets_dir(candidates: impl IntoIterator<Item = PathBuf>) -> PathBuf {
    let mut last = PathBuf::new();
    for dir in candidates {
        if dir.join(template::BACKGROUND_FILE).is_file() {
            return dir;
        }
        last = dir;
    }
    last
}

/// Configuration for the generator service
///
/// Defaults target the Tailwind CSS documentation site and a 1280x720 card.
/// Use [`ServiceConfig::from_env`] in binaries; tests usually start from
/// `Default` and override single fields.
///
/// # Examples
///
/// ```
/// let cfg = ogshot::ServiceConfig::default();
/// assert_eq!(cfg.viewport.width, 1280);
/// assert!(!cfg.html_debug);
/// ```
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Scheme and host of the documentation site, without trailing slash
    pub upstream_base: String,
    /// Site name stripped from the end of page titles
    pub site_name: String,
    /// Card size, also used as the screenshot viewport
    pub viewport: Viewport,
    /// Timeout for the upstream fetch in milliseconds
    pub fetch_timeout_ms: u64,
    /// Timeout for a single rasterization in milliseconds
    pub render_timeout_ms: u64,
    /// Return the rendered HTML instead of an image
    pub html_debug: bool,
    /// Chrome launch mode
    pub browser: BrowserMode,
    /// Directory holding `og-background.png` and `Inter-roman.var.woff2`
    pub assets_dir: PathBuf,
    /// User agent sent upstream
    pub user_agent: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            upstream_base: "https://tailwindcss.com".to_string(),
            site_name: "Tailwind CSS".to_string(),
            viewport: Viewport::default(),
            fetch_timeout_ms: 10_000,
            render_timeout_ms: 20_000,
            html_debug: false,
            browser: BrowserMode::default(),
            assets_dir: default_assets_dir(),
            user_agent: concat!("ogshot/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ServiceConfig {
    /// Build the configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    ///
    /// Recognised keys: `OG_UPSTREAM`, `OG_SITE_NAME`, `OG_VIEWPORT`,
    /// `OG_FETCH_TIMEOUT_MS`, `OG_RENDER_TIMEOUT_MS`, `OG_HTML_DEBUG`,
    /// `OG_BROWSER_MODE`, `OG_CHROME_PATH`, `AWS_REGION`, `OG_ASSETS_DIR`,
    /// `OG_USER_AGENT`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(base) = lookup("OG_UPSTREAM") {
            cfg.upstream_base = parse_upstream(&base)?;
        }
        if let Some(name) = lookup("OG_SITE_NAME") {
            cfg.site_name = name;
        }
        if let Some(vp) = lookup("OG_VIEWPORT") {
            cfg.viewport = vp.parse()?;
        }
        if let Some(ms) = lookup("OG_FETCH_TIMEOUT_MS") {
            cfg.fetch_timeout_ms = parse_millis("OG_FETCH_TIMEOUT_MS", &ms)?;
        }
        if let Some(ms) = lookup("OG_RENDER_TIMEOUT_MS") {
            cfg.render_timeout_ms = parse_millis("OG_RENDER_TIMEOUT_MS", &ms)?;
        }
        cfg.html_debug = lookup("OG_HTML_DEBUG").as_deref() == Some("1");

        let executable = lookup("OG_CHROME_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(default_chrome_path);
        cfg.browser = match lookup("OG_BROWSER_MODE").as_deref() {
            Some("local") => BrowserMode::Local { executable },
            Some("managed") => BrowserMode::Managed,
            Some(other) => {
                return Err(Error::ConfigError(format!(
                    "OG_BROWSER_MODE must be 'local' or 'managed', got {:?}",
                    other
                )))
            }
            // Serverless deployments expose AWS_REGION
            None if lookup("AWS_REGION").is_some() => BrowserMode::Managed,
            None => BrowserMode::Local { executable },
        };

        if let Some(dir) = lookup("OG_ASSETS_DIR") {
            cfg.assets_dir = PathBuf::from(dir);
        }
        if let Some(ua) = lookup("OG_USER_AGENT") {
            cfg.user_agent = ua;
        }

        Ok(cfg)
    }
}

fn parse_upstream(raw: &str) -> Result<String> {
    let parsed = url::Url::parse(raw)
        .map_err(|e| Error::ConfigError(format!("OG_UPSTREAM is not a URL: {}", e)))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(Error::ConfigError(format!(
            "OG_UPSTREAM must be http(s), got {}",
            parsed.scheme()
        )));
    }
    if parsed.host_str().is_none() {
        return Err(Error::ConfigError("OG_UPSTREAM has no host".into()));
    }
    Ok(raw.trim_end_matches('/').to_string())
}

fn parse_millis(key: &str, raw: &str) -> Result<u64> {
    raw.trim()
        .parse::<u64>()
        .map_err(|e| Error::ConfigError(format!("{} must be a number of milliseconds: {}", key, e)))
}

/// Viewport dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

impl std::str::FromStr for Viewport {
    type Err = Error;

    /// Parses `WIDTHxHEIGHT`, e.g. `1200x630`.
    fn from_str(s: &str) -> Result<Self> {
        let bad = || Error::ConfigError(format!("viewport must look like 1280x720, got {:?}", s));
        let (w, h) = s.trim().split_once(|c: char| c == 'x' || c == 'X').ok_or_else(bad)?;
        let width: u32 = w.parse().map_err(|_| bad())?;
        let height: u32 = h.parse().map_err(|_| bad())?;
        if width == 0 || height == 0 {
            return Err(bad());
        }
        Ok(Self { width, height })
    }
}

/// Raw upstream answer, consumed once by the extractor
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    /// Full response body as text
    pub body: String,
    /// HTTP status code
    pub status: u16,
}

/// Text pulled from a documentation page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageMetadata {
    /// Page title with the site suffix removed; never empty
    pub title: String,
    /// Section label shown above the title
    pub super_title: Option<String>,
    /// `og:description` content
    pub description: Option<String>,
}

/// Self-contained HTML card ready for the browser
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub html: String,
}

/// Final screenshot
#[derive(Debug, Clone)]
pub struct RasterImage {
    /// Encoded image bytes
    pub bytes: Vec<u8>,
    /// MIME type of `bytes`
    pub mime_type: &'static str,
}
