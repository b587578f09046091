//! Single-load behavior of the card asset cache

mod common;

use common::{FakeFetcher, FakeRasterizer, INSTALLATION_PAGE};
use ogshot::handler::OgService;
use ogshot::template::{AssetCache, BACKGROUND_FILE, FONT_FILE};
use ogshot::ServiceConfig;
use std::path::Path;
use std::sync::Arc;

fn write_assets(dir: &Path) {
    std::fs::write(dir.join(BACKGROUND_FILE), b"\x89PNG background").unwrap();
    std::fs::write(dir.join(FONT_FILE), b"wOF2 font").unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_first_use_reads_files_once() {
    let dir = tempfile::tempdir().unwrap();
    write_assets(dir.path());
    let cache = Arc::new(AssetCache::new(dir.path()));

    let tasks: Vec<_> = (0..32)
        .map(|_| {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get().await.map(|a| a.font_data_uri()) })
        })
        .collect();

    let uris: Vec<String> = futures::future::join_all(tasks)
        .await
        .into_iter()
        .map(|r| r.unwrap().unwrap())
        .collect();

    assert_eq!(cache.load_count(), 1);
    assert!(uris.iter().all(|u| u == &uris[0]));
}

#[tokio::test]
async fn cached_assets_survive_file_removal() {
    let dir = tempfile::tempdir().unwrap();
    write_assets(dir.path());
    let cache = AssetCache::new(dir.path());

    let before = cache.get().await.unwrap().background_data_uri();
    std::fs::remove_file(dir.path().join(BACKGROUND_FILE)).unwrap();
    let after = cache.get().await.unwrap().background_data_uri();

    assert_eq!(before, after);
    assert_eq!(cache.load_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_share_one_load() {
    let dir = tempfile::tempdir().unwrap();
    write_assets(dir.path());

    let fetcher = Arc::new(FakeFetcher::default().with_page("/docs/installation", 200, INSTALLATION_PAGE));
    let raster = Arc::new(FakeRasterizer::default());
    let config = ServiceConfig {
        assets_dir: dir.path().to_path_buf(),
        ..Default::default()
    };
    let service = Arc::new(OgService::new(config, fetcher, raster.clone()));

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let service = service.clone();
            tokio::spawn(async move { service.generate(Some("/docs/installation")).await })
        })
        .collect();

    for res in futures::future::join_all(tasks).await {
        assert!(res.unwrap().is_ok());
    }
    assert_eq!(service.assets().load_count(), 1);
    assert_eq!(raster.calls(), 16);
}
