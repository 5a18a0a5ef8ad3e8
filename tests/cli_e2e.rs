//! End-to-end CLI tests for the photoscrape binary.

// Command::cargo_bin is deprecated in newer assert_cmd in favour of cargo_bin!.
#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LISTING: &str = r#"<html><body><section class="list-content"><div class="showcase">
<figure class="showcase__item"><div class="showcase__content"><a href="/item1">1</a></div></figure>
<figure class="showcase__item"><div class="showcase__content"><a href="/item2">2</a></div></figure>
<figure class="showcase__item"><div class="showcase__content"><a href="/item3">3</a></div></figure>
</div></section></body></html>"#;

fn detail_page(data_href: &str) -> String {
    format!(
        r#"<html><body><aside><div class="detail__actions"><div class="detail__download"><div class="selection-download-wrapper"><button data-href="{data_href}">Download</button></div></div></div></aside></body></html>"#
    )
}

async fn mount_catalog(server: &MockServer, item2_status: u16) {
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string(LISTING))
        .mount(server)
        .await;
    for i in 1..=3 {
        let template = if i == 2 && item2_status != 200 {
            ResponseTemplate::new(item2_status)
        } else {
            ResponseTemplate::new(200).set_body_string(detail_page(&format!("/img/{i}.jpg")))
        };
        Mock::given(method("GET"))
            .and(path(format!("/item{i}")))
            .respond_with(template)
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/img/{i}.jpg")))
            .respond_with(
                ResponseTemplate::new(200).set_body_bytes(vec![u8::try_from(i).unwrap_or(0); 64]),
            )
            .mount(server)
            .await;
    }
}

/// Test that --help displays usage information and exits with code 0.
#[test]
fn test_binary_help_displays_usage() {
    let mut cmd = Command::cargo_bin("photoscrape").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("photo catalog"))
        .stdout(predicate::str::contains("--query"))
        .stdout(predicate::str::contains("--limit"));
}

/// Test that --version displays version and exits with code 0.
#[test]
fn test_binary_version_displays_version() {
    let mut cmd = Command::cargo_bin("photoscrape").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("photoscrape"));
}

/// Test that invalid flags cause non-zero exit.
#[test]
fn test_binary_invalid_flag_returns_error() {
    let mut cmd = Command::cargo_bin("photoscrape").unwrap();
    cmd.arg("--invalid-flag")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_binary_zero_limit_rejected() {
    let mut cmd = Command::cargo_bin("photoscrape").unwrap();
    cmd.args(["-l", "0"]).assert().failure();
}

#[test]
fn test_binary_bad_base_url_exits_one_without_network() {
    let temp = TempDir::new().unwrap();
    let mut cmd = Command::cargo_bin("photoscrape").unwrap();
    cmd.args(["--base-url", "ftp://example.com", "--upload-root"])
        .arg(temp.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("invalid configuration"));
    assert!(!temp.path().join("dog").exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_binary_downloads_to_query_folder() {
    let server = MockServer::start().await;
    mount_catalog(&server, 200).await;
    let temp = TempDir::new().unwrap();

    let uri = server.uri();
    let mut cmd = Command::cargo_bin("photoscrape").unwrap();
    cmd.args(["-q", "dog", "-l", "2", "--base-url", uri.as_str(), "--upload-root"])
        .arg(temp.path())
        .assert()
        .success();

    let destination = temp.path().join("dog");
    assert_eq!(std::fs::read(destination.join("1.jpg")).unwrap(), vec![1u8; 64]);
    assert_eq!(std::fs::read(destination.join("2.jpg")).unwrap(), vec![2u8; 64]);
    assert!(!destination.join("3.jpg").exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_binary_listing_404_exits_one() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let temp = TempDir::new().unwrap();

    let uri = server.uri();
    let mut cmd = Command::cargo_bin("photoscrape").unwrap();
    cmd.args(["--base-url", uri.as_str(), "--upload-root"])
        .arg(temp.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("404"));

    assert_eq!(std::fs::read_dir(temp.path().join("dog")).unwrap().count(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_binary_item_failure_exits_zero_by_default() {
    let server = MockServer::start().await;
    mount_catalog(&server, 500).await;
    let temp = TempDir::new().unwrap();

    let uri = server.uri();
    let mut cmd = Command::cargo_bin("photoscrape").unwrap();
    cmd.args(["-w", "1", "--base-url", uri.as_str(), "--upload-root"])
        .arg(temp.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("download pipeline stopped early"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_binary_item_failure_exits_one_when_strict() {
    let server = MockServer::start().await;
    mount_catalog(&server, 500).await;
    let temp = TempDir::new().unwrap();

    let uri = server.uri();
    let mut cmd = Command::cargo_bin("photoscrape").unwrap();
    cmd.args(["-w", "1", "--strict", "--base-url", uri.as_str(), "--upload-root"])
        .arg(temp.path())
        .assert()
        .code(1);

    assert!(temp.path().join("dog").join("1.jpg").is_file());
}
