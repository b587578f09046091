//! Card template and static asset cache.
//!
//! The card is a single HTML document with the font and background inlined as
//! base64 data URIs, so the browser never touches the network while
//! rendering it.

use crate::{Error, PageMetadata, RenderedDocument, Result, Viewport};
use base64::Engine as Base64Engine;
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::OnceCell;

/// Background image file name inside the assets directory
pub const BACKGROUND_FILE: &str = "og-background.png";
/// Font file name inside the assets directory
pub const FONT_FILE: &str = "Inter-roman.var.woff2";

const LOGO_SVG: &str = include_str!("../assets/logo.svg");

/// Base64-encoded card assets
#[derive(Debug, Clone)]
pub struct CardAssets {
    background_base64: String,
    font_base64: String,
}

impl CardAssets {
    /// Encode raw background and font bytes.
    pub fn from_bytes(background: &[u8], font: &[u8]) -> Self {
        let b64 = &base64::engine::general_purpose::STANDARD;
        Self {
            background_base64: Base64Engine::encode(b64, background),
            font_base64: Base64Engine::encode(b64, font),
        }
    }

    pub fn background_data_uri(&self) -> String {
        data_uri(&self.background_base64, "image/png")
    }

    pub fn font_data_uri(&self) -> String {
        data_uri(&self.font_base64, "font/woff2")
    }
}

fn data_uri(base64: &str, mime: &str) -> String {
    format!("data:{};base64,{}", mime, base64)
}

/// Process-lifetime cache of the card assets.
///
/// The first caller reads both files; callers arriving while that read is in
/// flight wait for it instead of starting their own. A failed read leaves the
/// cache empty so the next request tries again.
pub struct AssetCache {
    dir: PathBuf,
    cell: OnceCell<CardAssets>,
    loads: AtomicUsize,
}

impl AssetCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            cell: OnceCell::new(),
            loads: AtomicUsize::new(0),
        }
    }

    /// Cache that starts out populated, used when assets are already in memory.
    pub fn preloaded(assets: CardAssets) -> Self {
        Self {
            dir: PathBuf::new(),
            cell: OnceCell::new_with(Some(assets)),
            loads: AtomicUsize::new(0),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Cached assets, loading them on first use.
    pub async fn get(&self) -> Result<&CardAssets> {
        self.cell.get_or_try_init(|| self.load()).await
    }

    /// Number of times the asset files were actually read.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    async fn load(&self) -> Result<CardAssets> {
        let background_path = self.dir.join(BACKGROUND_FILE);
        let font_path = self.dir.join(FONT_FILE);

        let (background, font) =
            futures::try_join!(read_asset(&background_path), read_asset(&font_path))?;
        self.loads.fetch_add(1, Ordering::SeqCst);

        info!(
            "loaded card assets from {} (background {} bytes, font {} bytes)",
            self.dir.display(),
            background.len(),
            font.len()
        );
        Ok(CardAssets::from_bytes(&background, &font))
    }
}

/// Asset files that are not present under `dir`.
pub fn missing_assets(dir: &Path) -> Vec<PathBuf> {
    [BACKGROUND_FILE, FONT_FILE]
        .iter()
        .map(|name| dir.join(name))
        .filter(|path| !path.is_file())
        .collect()
}

/// Warn about missing asset files before the first request trips over them.
///
/// Returns `true` when every file is present.
pub fn check_assets(dir: &Path) -> bool {
    let missing = missing_assets(dir);
    for path in &missing {
        warn!("card asset {} is missing; image requests will fail until it exists", path.display());
    }
    missing.is_empty()
}

async fn read_asset(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .map_err(|e| Error::AssetError(format!("Failed to read {}: {}", path.display(), e)))
}

// Placeholders are replaced in order; page text goes in last so it can never
// be mistaken for a placeholder.
const CARD_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
  <meta charset="utf-8">
  <title>Generated Image</title>
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <style>
    @font-face {
      font-family: 'Inter var';
      font-style: normal;
      font-weight: 100 900;
      src: url({{FONT_URI}}) format('woff2');
      font-named-instance: 'Regular';
    }
    *, *::before, *::after {
      margin: 0;
      padding: 0;
      box-sizing: border-box;
    }
    html {
      width: {{WIDTH}}px;
      height: {{HEIGHT}}px;
      overflow: hidden;
      font-family: 'Inter var';
      font-feature-settings: 'cv02', 'cv03', 'cv04', 'cv11';
      -webkit-font-smoothing: antialiased;
    }
    body {
      display: flex;
      flex-direction: column;
      justify-content: space-between;
      height: 100%;
      padding: 112px;
      background-image: url({{BACKGROUND_URI}});
      background-size: 100% 100%;
    }
    h1 {
      font-size: 72px;
      margin-top: 12px;
      line-height: 1;
      color: black;
      letter-spacing: -0.025em;
      font-weight: 800;
    }
    small {
      font-size: 36px;
      color: #0ea5e9;
      line-height: 1.5;
      font-weight: 600;
    }
    p {
      font-size: 36px;
      line-height: 1.5;
      font-weight: 600;
      color: #64748b;
      margin-top: 12px;
    }
  </style>
  <body>
    {{LOGO}}
    <main>
      {{MAIN}}
    </main>
  </body>
</html>"#;

/// Fill the card template with page text and inlined assets.
pub fn render_html(meta: &PageMetadata, assets: &CardAssets, viewport: Viewport) -> RenderedDocument {
    let mut main = String::new();
    if let Some(super_title) = &meta.super_title {
        main.push_str(&format!("<small>{}</small>\n      ", super_title));
    }
    main.push_str(&format!("<h1>{}</h1>", meta.title));
    if let Some(description) = &meta.description {
        main.push_str(&format!("\n      <p>{}</p>", description));
    }

    let html = CARD_TEMPLATE
        .replace("{{FONT_URI}}", &assets.font_data_uri())
        .replace("{{BACKGROUND_URI}}", &assets.background_data_uri())
        .replace("{{WIDTH}}", &viewport.width.to_string())
        .replace("{{HEIGHT}}", &viewport.height.to_string())
        .replace("{{LOGO}}", LOGO_SVG.trim())
        .replace("{{MAIN}}", &main);

    RenderedDocument { html }
}
