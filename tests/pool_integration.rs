//! Integration tests for the worker pool running the real download pipeline.

use std::path::Path;
use std::sync::Arc;

use photoscrape_core::fetch::Fetcher;
use photoscrape_core::parse::ExtractRule;
use photoscrape_core::pool::{DownloadPipeline, DownloadPool, PoolError};
use photoscrape_core::resolve::{DETAIL_ATTRIBUTE, DETAIL_SELECTOR, DetailResolver, ItemLink};
use photoscrape_core::storage::{FilenamePolicy, StorageSink};
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn detail_page(data_href: &str) -> String {
    format!(
        r#"<html><body><aside><div class="detail__actions"><div class="detail__download"><div class="selection-download-wrapper"><button data-href="{data_href}">Download</button></div></div></div></aside></body></html>"#
    )
}

async fn mount_item(server: &MockServer, name: &str, payload: &[u8]) {
    Mock::given(method("GET"))
        .and(path(format!("/{name}")))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(detail_page(&format!("/files/{name}.jpg"))),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/files/{name}.jpg")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(payload.to_vec()))
        .mount(server)
        .await;
}

fn pipeline(server: &MockServer, root: &Path) -> Arc<DownloadPipeline> {
    let fetcher = Fetcher::new().expect("fetcher");
    let rule = ExtractRule::new(DETAIL_SELECTOR, DETAIL_ATTRIBUTE).expect("rule");
    Arc::new(DownloadPipeline::new(
        Url::parse(&format!("{}/search?query=dog", server.uri())).expect("base url"),
        DetailResolver::new(fetcher.clone(), rule),
        fetcher,
        Arc::new(StorageSink::new(root)),
        FilenamePolicy::Sequential,
    ))
}

fn links(values: &[&str]) -> Vec<ItemLink> {
    values.iter().map(|v| ItemLink::new(*v)).collect()
}

#[tokio::test]
async fn test_pool_downloads_every_item() {
    let server = MockServer::start().await;
    for (name, payload) in [("a", b"AAAA"), ("b", b"BBBB"), ("c", b"CCCC")] {
        mount_item(&server, name, payload).await;
    }
    let temp = TempDir::new().expect("temp dir");

    let stats = DownloadPool::new(2)
        .expect("pool")
        .run(links(&["/a", "/b", "/c"]), pipeline(&server, temp.path()))
        .await
        .expect("run should succeed");

    assert_eq!(stats.completed(), 3);
    assert_eq!(std::fs::read(temp.path().join("1.jpg")).expect("1.jpg"), b"AAAA");
    assert_eq!(std::fs::read(temp.path().join("2.jpg")).expect("2.jpg"), b"BBBB");
    assert_eq!(std::fs::read(temp.path().join("3.jpg")).expect("3.jpg"), b"CCCC");
}

#[tokio::test]
async fn test_pool_middle_item_404_surfaces_and_stops_single_worker() {
    let server = MockServer::start().await;
    mount_item(&server, "a", b"AAAA").await;
    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    mount_item(&server, "c", b"CCCC").await;
    let temp = TempDir::new().expect("temp dir");

    let result = DownloadPool::new(1)
        .expect("pool")
        .run(links(&["/a", "/b", "/c"]), pipeline(&server, temp.path()))
        .await;

    match result {
        Err(PoolError::Resolve { link, source }) => {
            assert_eq!(link, "/b");
            assert_eq!(source.status_code(), Some(404));
        }
        other => panic!("expected B's resolve error, got {other:?}"),
    }
    assert!(temp.path().join("1.jpg").is_file(), "A completed before B failed");
    assert!(!temp.path().join("2.jpg").exists());
    assert!(!temp.path().join("3.jpg").exists(), "C must not start after cancel");

    let requested: Vec<String> = server
        .received_requests()
        .await
        .expect("recorded requests")
        .iter()
        .map(|r| r.url.path().to_string())
        .collect();
    assert!(!requested.contains(&"/c".to_string()), "{requested:?}");
}

#[tokio::test]
async fn test_pool_download_failure_leaves_no_partial_file() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(ResponseTemplate::new(200).set_body_string(detail_page("/files/a.jpg")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/a.jpg"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let temp = TempDir::new().expect("temp dir");

    let result = DownloadPool::new(2)
        .expect("pool")
        .run(links(&["/a"]), pipeline(&server, temp.path()))
        .await;

    assert!(matches!(result, Err(PoolError::Fetch { .. })), "{result:?}");
    assert_eq!(
        std::fs::read_dir(temp.path()).expect("read dir").count(),
        0,
        "no file may be left behind"
    );
}

#[tokio::test]
async fn test_pool_skips_items_without_download() {
    let server = MockServer::start().await;
    mount_item(&server, "a", b"AAAA").await;
    Mock::given(method("GET"))
        .and(path("/premium"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><aside></aside></html>"))
        .mount(&server)
        .await;
    let temp = TempDir::new().expect("temp dir");

    let stats = DownloadPool::new(2)
        .expect("pool")
        .run(links(&["/premium", "", "/a"]), pipeline(&server, temp.path()))
        .await
        .expect("skips are not failures");

    assert_eq!(stats.completed(), 1);
    assert_eq!(stats.skipped(), 2);
    assert_eq!(stats.failed(), 0);
    assert!(temp.path().join("3.jpg").is_file());
}
