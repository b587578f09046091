use clap::{Parser, Subcommand};
use log::{error, info};
use ogshot::fetch::HttpFetcher;
use ogshot::handler::OgService;
use ogshot::raster::SharedPage;
use ogshot::template::check_assets;
use ogshot::ServiceConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "ogshot")]
#[command(version, about = "Social preview images for documentation pages", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve preview images over HTTP
    Serve {
        /// Address to listen on
        #[arg(short, long, default_value = "127.0.0.1:3000")]
        addr: SocketAddr,
    },

    /// Render a single page to disk
    Render {
        /// Documentation path, e.g. /docs/installation
        #[arg(short, long)]
        path: String,

        /// Output file (defaults to og.png, or og.html with --html)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Write the card HTML instead of rasterizing it
        #[arg(long)]
        html: bool,
    },
}

async fn render(mut config: ServiceConfig, path: String, out: Option<PathBuf>, html: bool) -> ogshot::Result<()> {
    config.html_debug |= html;
    let out = out.unwrap_or_else(|| {
        PathBuf::from(if config.html_debug { "og.html" } else { "og.png" })
    });

    let fetcher = Arc::new(HttpFetcher::new(&config)?);
    let page = Arc::new(SharedPage::new(&config));
    let service = OgService::new(config, fetcher, page.clone());
    check_assets(service.assets().dir());

    let result = service.generate(Some(&path)).await;
    page.close().await?;
    let output = result?;

    let len = output.body_len();
    tokio::fs::write(&out, output.into_bytes())
        .await
        .map_err(|e| ogshot::Error::Other(format!("Failed to write {}: {}", out.display(), e)))?;
    info!("wrote {} ({} bytes)", out.display(), len);
    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = match ServiceConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("{}", e);
            std::process::exit(2);
        }
    };

    let res = match cli.command {
        Command::Serve { addr } => ogshot::server::serve(config, addr).await,
        Command::Render { path, out, html } => render(config, path, out, html).await,
    };

    if let Err(e) = res {
        error!("{}", e);
        std::process::exit(1);
    }
}
