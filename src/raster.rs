//! Chrome DevTools Protocol rasterizer
//!
//! One browser, one tab, owned by a dedicated worker thread. Async callers
//! send capture commands over a channel and wait on a oneshot reply, so the
//! tab only ever works on one card at a time: a second request cannot replace
//! the document while the first one is being captured.
//!
//! The tab is launched lazily on first use and then kept for the life of the
//! process. If Chrome dies, later captures fail until the process restarts.

use crate::{BrowserMode, Error, RasterImage, RenderedDocument, Result, ServiceConfig, Viewport, IMAGE_MIME_TYPE};
use async_trait::async_trait;
use headless_chrome::browser::tab::Tab;
use headless_chrome::protocol::cdp::Page;
use headless_chrome::{Browser, LaunchOptions};
use log::{debug, info};
use std::ffi::OsStr;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::{oneshot, OnceCell};

/// Turns a rendered card into image bytes
#[async_trait]
pub trait Rasterizer: Send + Sync {
    async fn rasterize(&self, doc: &RenderedDocument) -> Result<RasterImage>;
}

// Flags for the bundled Chrome inside serverless containers
const MANAGED_ARGS: &[&str] = &[
    "--no-sandbox",
    "--no-zygote",
    "--single-process",
    "--disable-gpu",
    "--disable-dev-shm-usage",
    "--hide-scrollbars",
    "--font-render-hinting=none",
];

const LOCAL_ARGS: &[&str] = &["--hide-scrollbars", "--font-render-hinting=none"];

// headless_chrome closes an idle browser after 30s by default; the shared tab
// has to outlive quiet periods between requests.
const BROWSER_IDLE_TIMEOUT: Duration = Duration::from_secs(60 * 60 * 24 * 365);

// Resolves once web fonts are usable and two frames have been painted.
const SETTLE_SCRIPT: &str = r#"(async function() {
    await document.fonts.ready;
    await new Promise(function(resolve) {
        requestAnimationFrame(function() { requestAnimationFrame(resolve); });
    });
    return true;
})()"#;

/// Build Chrome launch options for the given mode.
pub fn launch_options(mode: &BrowserMode, viewport: Viewport) -> Result<LaunchOptions<'static>> {
    let mut builder = LaunchOptions::default_builder();
    builder
        .headless(true)
        .window_size(Some((viewport.width, viewport.height)))
        .idle_browser_timeout(BROWSER_IDLE_TIMEOUT);

    match mode {
        BrowserMode::Local { executable } => {
            builder
                .path(Some(executable.clone()))
                .args(LOCAL_ARGS.iter().map(OsStr::new).collect());
        }
        BrowserMode::Managed => {
            builder
                .sandbox(false)
                .args(MANAGED_ARGS.iter().map(OsStr::new).collect());
        }
    }

    builder
        .build()
        .map_err(|e| Error::InitializationError(format!("Failed to build launch options: {}", e)))
}

/// Synchronous CDP session: a launched browser and its single tab
pub struct CdpSession {
    browser: Browser,
    tab: Arc<Tab>,
    viewport: Viewport,
}

impl CdpSession {
    pub fn launch(mode: &BrowserMode, viewport: Viewport) -> Result<Self> {
        let options = launch_options(mode, viewport)?;

        let browser = Browser::new(options)
            .map_err(|e| Error::InitializationError(format!("Failed to launch browser: {}", e)))?;

        let tab = browser
            .new_tab()
            .map_err(|e| Error::InitializationError(format!("Failed to create tab: {}", e)))?;

        Ok(Self { browser, tab, viewport })
    }

    /// Replace the tab's document with `html` and screenshot it as PNG.
    pub fn capture(&self, html: &str) -> Result<Vec<u8>> {
        // For page targets the main frame shares the target's id
        let frame_id = self.tab.get_target_id().clone();

        self.tab
            .call_method(Page::SetDocumentContent {
                frame_id,
                html: html.to_string(),
            })
            .map_err(|e| Error::RenderError(format!("Failed to set content: {}", e)))?;

        self.tab.evaluate(SETTLE_SCRIPT, true)?;

        let clip = Page::Viewport {
            x: 0.0,
            y: 0.0,
            width: self.viewport.width as f64,
            height: self.viewport.height as f64,
            scale: 1.0,
        };

        self.tab
            .capture_screenshot(Page::CaptureScreenshotFormatOption::Png, None, Some(clip), true)
            .map_err(|e| Error::RenderError(format!("Screenshot failed: {}", e)))
    }

    pub fn close(self) {
        // Dropping the browser terminates the child process
        drop(self.tab);
        drop(self.browser);
    }
}

/// Blocking page the worker thread drives
trait PageSession {
    fn capture(&self, html: &str) -> Result<Vec<u8>>;
    fn close(self);
}

impl PageSession for CdpSession {
    fn capture(&self, html: &str) -> Result<Vec<u8>> {
        CdpSession::capture(self, html)
    }

    fn close(self) {
        CdpSession::close(self)
    }
}

enum Command {
    Capture(String, oneshot::Sender<Result<Vec<u8>>>),
    Close(oneshot::Sender<()>),
}

/// Serve commands until `Close` arrives or every sender is gone.
///
/// A capture whose caller already gave up (timed out or was dropped) is
/// skipped, so abandoned jobs never hold up the ones queued behind them.
fn run_worker<S: PageSession>(session: S, cmd_rx: Receiver<Command>) {
    while let Ok(cmd) = cmd_rx.recv() {
        match cmd {
            Command::Capture(_, resp) if resp.is_closed() => {
                debug!("skipping capture abandoned by its caller");
            }
            Command::Capture(html, resp) => {
                let _ = resp.send(session.capture(&html));
            }
            Command::Close(resp) => {
                session.close();
                let _ = resp.send(());
                return;
            }
        }
    }
}

/// Async handle to a `CdpSession` living on its own thread.
pub struct ChromePage {
    cmd_tx: Sender<Command>,
}

impl ChromePage {
    /// Launch Chrome on a worker thread and wait until the tab is ready.
    pub async fn launch(mode: BrowserMode, viewport: Viewport) -> Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();
        let (init_tx, init_rx) = oneshot::channel::<Result<()>>();

        thread::Builder::new()
            .name("ogshot-chrome".into())
            .spawn(move || {
                let session = match CdpSession::launch(&mode, viewport) {
                    Ok(s) => s,
                    Err(err) => {
                        let _ = init_tx.send(Err(err));
                        return;
                    }
                };
                let _ = init_tx.send(Ok(()));

                run_worker(session, cmd_rx);
            })
            .map_err(|e| Error::InitializationError(format!("Failed to spawn browser thread: {}", e)))?;

        init_rx
            .await
            .map_err(|e| Error::InitializationError(format!("Browser thread exited during startup: {}", e)))??;

        info!("headless browser ready ({}x{})", viewport.width, viewport.height);
        Ok(Self { cmd_tx })
    }

    /// Queue a capture and wait for its result.
    pub async fn capture(&self, html: String) -> Result<Vec<u8>> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Capture(html, tx))
            .map_err(|_| Error::RenderError("Browser thread is gone".into()))?;
        rx.await
            .map_err(|e| Error::RenderError(format!("Capture canceled: {}", e)))?
    }

    /// Shut the browser down.
    pub async fn close(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        if self.cmd_tx.send(Command::Close(tx)).is_err() {
            return Ok(());
        }
        rx.await
            .map_err(|e| Error::Other(format!("Close canceled: {}", e)))
    }
}

/// The process-wide page: launched on first rasterization, reused afterwards.
///
/// Callers bound the wait themselves; a caller that stops waiting has its
/// queued capture dropped by the worker.
pub struct SharedPage {
    mode: BrowserMode,
    viewport: Viewport,
    page: OnceCell<ChromePage>,
}

impl SharedPage {
    pub fn new(config: &ServiceConfig) -> Self {
        Self {
            mode: config.browser.clone(),
            viewport: config.viewport,
            page: OnceCell::new(),
        }
    }

    /// Whether the browser has been launched.
    pub fn is_started(&self) -> bool {
        self.page.initialized()
    }

    async fn page(&self) -> Result<&ChromePage> {
        self.page
            .get_or_try_init(|| ChromePage::launch(self.mode.clone(), self.viewport))
            .await
    }

    pub async fn close(&self) -> Result<()> {
        match self.page.get() {
            Some(page) => page.close().await,
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Rasterizer for SharedPage {
    async fn rasterize(&self, doc: &RenderedDocument) -> Result<RasterImage> {
        let page = self.page().await?;
        let bytes = page.capture(doc.html.clone()).await?;

        Ok(RasterImage {
            bytes,
            mime_type: IMAGE_MIME_TYPE,
        })
    }
}
