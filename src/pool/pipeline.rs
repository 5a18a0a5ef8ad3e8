//! The per-item step run by every worker: detail page → direct URL → file.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument};
use url::Url;

use super::{DownloadTarget, ItemOutcome, ItemProcessor, PoolError, SkipReason, WorkItem};
use crate::fetch::Fetcher;
use crate::resolve::DetailResolver;
use crate::storage::{FilenamePolicy, StorageSink};

/// Resolves, downloads and stores one catalog item.
#[derive(Debug)]
pub struct DownloadPipeline {
    base_url: Url,
    resolver: DetailResolver,
    fetcher: Fetcher,
    sink: Arc<StorageSink>,
    naming: FilenamePolicy,
}

impl DownloadPipeline {
    /// Creates a pipeline.
    ///
    /// `base_url` is the listing page's URL; relative item links are joined
    /// against it.
    #[must_use]
    pub fn new(
        base_url: Url,
        resolver: DetailResolver,
        fetcher: Fetcher,
        sink: Arc<StorageSink>,
        naming: FilenamePolicy,
    ) -> Self {
        Self {
            base_url,
            resolver,
            fetcher,
            sink,
            naming,
        }
    }

    /// Resolves `item` to a download target.
    ///
    /// Returns `Ok(Err(reason))` when there is nothing to download.
    async fn resolve_target(
        &self,
        item: &WorkItem,
    ) -> Result<Result<DownloadTarget, SkipReason>, PoolError> {
        let Some(detail_url) = item.link.to_absolute(&self.base_url) else {
            return Ok(Err(SkipReason::NoDetailLink));
        };

        let direct_url = self
            .resolver
            .resolve_direct_url(&detail_url)
            .await
            .map_err(|e| PoolError::resolve(&item.link, e))?;
        if direct_url.is_empty() {
            return Ok(Err(SkipReason::NoDirectUrl));
        }

        let assigned_filename = self.naming.filename_for(item.position, &direct_url);
        Ok(Ok(DownloadTarget {
            source_detail_url: detail_url,
            resolved_direct_url: direct_url,
            assigned_filename,
        }))
    }
}

#[async_trait]
impl ItemProcessor for DownloadPipeline {
    #[instrument(skip(self, item), fields(position = item.position, link = %item.link))]
    async fn process(&self, item: &WorkItem) -> Result<ItemOutcome, PoolError> {
        let target = match self.resolve_target(item).await? {
            Ok(target) => target,
            Err(reason) => return Ok(ItemOutcome::Skipped(reason)),
        };
        debug!(
            detail = %target.source_detail_url,
            direct = %target.resolved_direct_url,
            filename = %target.assigned_filename,
            "downloading item"
        );

        let body = self
            .fetcher
            .fetch(&target.resolved_direct_url)
            .await
            .map_err(|e| PoolError::fetch(&item.link, &target.resolved_direct_url, e))?;
        debug!(content_length = body.content_length(), "download accepted");

        let stored = self
            .sink
            .persist(&target.assigned_filename, body.into_stream())
            .await
            .map_err(|e| PoolError::storage(&item.link, e))?;

        Ok(ItemOutcome::Stored(stored))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::parse::ExtractRule;
    use crate::resolve::{DETAIL_ATTRIBUTE, DETAIL_SELECTOR, ItemLink};

    fn detail_page(data_href: &str) -> String {
        format!(
            r#"<html><body><aside><div class="detail__actions"><div class="detail__download"><div class="selection-download-wrapper"><button data-href="{data_href}">Download</button></div></div></div></aside></body></html>"#
        )
    }

    fn pipeline(server: &MockServer, root: &std::path::Path, naming: FilenamePolicy) -> DownloadPipeline {
        let fetcher = Fetcher::new().unwrap();
        let rule = ExtractRule::new(DETAIL_SELECTOR, DETAIL_ATTRIBUTE).unwrap();
        DownloadPipeline::new(
            Url::parse(&format!("{}/search?query=dog", server.uri())).unwrap(),
            DetailResolver::new(fetcher.clone(), rule),
            fetcher,
            Arc::new(StorageSink::new(root)),
            naming,
        )
    }

    fn item(position: usize, link: &str) -> WorkItem {
        WorkItem {
            position,
            link: ItemLink::new(link),
        }
    }

    #[tokio::test]
    async fn test_process_stores_image_under_position() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/item1"))
            .respond_with(ResponseTemplate::new(200).set_body_string(detail_page("/files/dog.jpg")))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/files/dog.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"\xFF\xD8jpeg".to_vec()))
            .mount(&server)
            .await;
        let temp = TempDir::new().unwrap();

        let outcome = pipeline(&server, temp.path(), FilenamePolicy::Sequential)
            .process(&item(1, "/item1"))
            .await
            .unwrap();

        match outcome {
            ItemOutcome::Stored(file) => {
                assert_eq!(file.path, temp.path().join("1.jpg"));
                assert_eq!(std::fs::read(&file.path).unwrap(), b"\xFF\xD8jpeg");
            }
            other => panic!("expected stored file, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_process_basename_policy_uses_direct_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/item2"))
            .respond_with(ResponseTemplate::new(200).set_body_string(detail_page("/files/puppy.png")))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/files/puppy.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"png".to_vec()))
            .mount(&server)
            .await;
        let temp = TempDir::new().unwrap();

        pipeline(&server, temp.path(), FilenamePolicy::UrlBasename)
            .process(&item(2, "/item2"))
            .await
            .unwrap();

        assert!(temp.path().join("puppy.jpg").is_file());
    }

    #[tokio::test]
    async fn test_process_skips_empty_link_without_request() {
        let server = MockServer::start().await;
        let temp = TempDir::new().unwrap();

        let outcome = pipeline(&server, temp.path(), FilenamePolicy::Sequential)
            .process(&item(1, ""))
            .await
            .unwrap();

        assert_eq!(outcome, ItemOutcome::Skipped(SkipReason::NoDetailLink));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_process_skips_detail_without_trigger() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/item1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html><aside></aside></html>"))
            .mount(&server)
            .await;
        let temp = TempDir::new().unwrap();

        let outcome = pipeline(&server, temp.path(), FilenamePolicy::Sequential)
            .process(&item(1, "/item1"))
            .await
            .unwrap();

        assert_eq!(outcome, ItemOutcome::Skipped(SkipReason::NoDirectUrl));
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_process_detail_404_is_resolve_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/item1"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        let temp = TempDir::new().unwrap();

        let err = pipeline(&server, temp.path(), FilenamePolicy::Sequential)
            .process(&item(1, "/item1"))
            .await
            .unwrap_err();

        match err {
            PoolError::Resolve { link, source } => {
                assert_eq!(link, "/item1");
                assert_eq!(source.status_code(), Some(404));
            }
            other => panic!("expected resolve error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_process_download_500_is_fetch_error_and_writes_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/item1"))
            .respond_with(ResponseTemplate::new(200).set_body_string(detail_page("/files/a.jpg")))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/files/a.jpg"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let temp = TempDir::new().unwrap();

        let err = pipeline(&server, temp.path(), FilenamePolicy::Sequential)
            .process(&item(1, "/item1"))
            .await
            .unwrap_err();

        match err {
            PoolError::Fetch { url, source, .. } => {
                assert!(url.ends_with("/files/a.jpg"));
                assert_eq!(source.status_code(), Some(500));
            }
            other => panic!("expected fetch error, got {other:?}"),
        }
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }
}
