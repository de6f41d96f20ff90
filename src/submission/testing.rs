// Recording RPC client for workflow tests

use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

use super::models::{DownloadRequest, FormatCatalog, FormatDescriptor};
use super::traits::RpcClient;
use crate::rpc::RpcError;

pub(crate) struct MockClient {
    catalog: Option<FormatCatalog>,
    paths: Vec<String>,
    format_delay: Duration,
    downloads: Mutex<Vec<(Instant, DownloadRequest)>>,
    queries: Mutex<Vec<String>>,
}

impl MockClient {
    pub fn new() -> Self {
        Self {
            catalog: None,
            paths: Vec::new(),
            format_delay: Duration::ZERO,
            downloads: Mutex::new(Vec::new()),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn with_catalog(catalog: FormatCatalog) -> Self {
        Self {
            catalog: Some(catalog),
            ..Self::new()
        }
    }

    /// `formats` answers with a backend error
    pub fn failing_formats() -> Self {
        Self::new()
    }

    pub fn with_format_delay(mut self, delay: Duration) -> Self {
        self.format_delay = delay;
        self
    }

    pub fn with_paths(mut self, paths: &[&str]) -> Self {
        self.paths = paths.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn requests(&self) -> Vec<DownloadRequest> {
        self.downloads
            .lock()
            .unwrap()
            .iter()
            .map(|(_, r)| r.clone())
            .collect()
    }

    pub fn dispatch_times(&self) -> Vec<Instant> {
        self.downloads.lock().unwrap().iter().map(|(t, _)| *t).collect()
    }

    pub fn format_queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl RpcClient for MockClient {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn download(&self, request: DownloadRequest) {
        self.downloads.lock().unwrap().push((Instant::now(), request));
    }

    async fn formats(&self, url: &str) -> Result<FormatCatalog, RpcError> {
        self.queries.lock().unwrap().push(url.to_string());
        if !self.format_delay.is_zero() {
            tokio::time::sleep(self.format_delay).await;
        }
        self.catalog
            .clone()
            .ok_or_else(|| RpcError::Backend("yt-dlp exited with status 1".to_string()))
    }

    async fn directory_tree(&self) -> Result<Vec<String>, RpcError> {
        Ok(self.paths.clone())
    }

    fn kill_all(&self) {}
}

fn format(id: &str, vcodec: &str, acodec: &str) -> FormatDescriptor {
    FormatDescriptor {
        format_id: id.to_string(),
        vcodec: vcodec.to_string(),
        acodec: acodec.to_string(),
        ..Default::default()
    }
}

pub(crate) fn sample_catalog() -> FormatCatalog {
    FormatCatalog {
        title: "Me at the zoo".to_string(),
        url: "https://youtu.be/jNQXAC9IVRw".to_string(),
        best: format("18", "avc1.42001E", "mp4a.40.2"),
        formats: vec![
            format("137", "avc1.640028", "none"),
            format("248", "vp9", "none"),
            format("140", "none", "mp4a.40.2"),
            format("251", "none", "opus"),
        ],
        ..Default::default()
    }
}
