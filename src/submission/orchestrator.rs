// Submission orchestrator - the two-phase batch workflow
//
// Idle ──submit (format selection on)──▶ AwaitingFormats ──catalog──▶ FormatsReady
//  │                                          │ failure                   │ confirm
//  │                                          ▼                           ▼
//  └──submit (format selection off)──────▶ Idle ◀──last URL sent── Submitting
//
// Every URL in a batch waits the pacing delay before it is sent, so the
// backend receives requests in batch order. Nothing is acknowledged per URL.

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::args;
use super::errors::{Result, SubmitError};
use super::fetcher::FormatCatalogFetcher;
use super::format_selector::{FormatSelection, FormatSelector};
use super::models::{BatchReport, DispatchedItem, DownloadRequest, FormatCatalog};
use super::settings::Settings;
use super::traits::{RpcClient, TemplateSource};
use super::url_list;

/// Workflow state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    /// No pending batch; input enabled
    Idle,
    /// Format query in flight
    AwaitingFormats,
    /// Catalog returned, waiting for a pick and confirmation
    FormatsReady,
    /// Sending the batch
    Submitting,
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::AwaitingFormats => write!(f, "awaiting formats"),
            Self::FormatsReady => write!(f, "formats ready"),
            Self::Submitting => write!(f, "submitting"),
        }
    }
}

/// Timing knobs for batch submission
#[derive(Debug, Clone)]
pub struct SubmissionConfig {
    /// Delay before each request of a batch
    pub pacing: Duration,
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            pacing: Duration::from_millis(10),
        }
    }
}

impl SubmissionConfig {
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }
}

/// What a submit action led to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Formats were fetched; pick codes and call `confirm`
    AwaitingChoice,
    /// The batch was sent directly
    Submitted(BatchReport),
}

/// Owns the input box, the catalog and the selection for one view
pub struct SubmissionOrchestrator {
    client: Arc<dyn RpcClient>,
    templates: Arc<dyn TemplateSource>,
    fetcher: FormatCatalogFetcher,
    config: SubmissionConfig,
    session: CancellationToken,

    state: WorkflowState,
    settings: Settings,
    input: String,
    /// Input text captured when formats were requested
    target: String,
    playlist: bool,
    download_path: String,
    available_paths: Vec<String>,
    catalog: Option<FormatCatalog>,
    selection: Option<FormatSelection>,
}

impl SubmissionOrchestrator {
    pub fn new(
        client: Arc<dyn RpcClient>,
        templates: Arc<dyn TemplateSource>,
        config: SubmissionConfig,
    ) -> Self {
        let session = CancellationToken::new();
        Self {
            fetcher: FormatCatalogFetcher::new(client.clone(), session.clone()),
            client,
            templates,
            config,
            session,
            state: WorkflowState::Idle,
            settings: Settings::default(),
            input: String::new(),
            target: String::new(),
            playlist: false,
            download_path: String::new(),
            available_paths: Vec::new(),
            catalog: None,
            selection: None,
        }
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn catalog(&self) -> Option<&FormatCatalog> {
        self.catalog.as_ref()
    }

    pub fn selection(&self) -> Option<&FormatSelection> {
        self.selection.as_ref()
    }

    pub fn playlist(&self) -> bool {
        self.playlist
    }

    pub fn download_path(&self) -> &str {
        &self.download_path
    }

    pub fn available_paths(&self) -> &[String] {
        &self.available_paths
    }

    /// Input box accepts edits only while idle
    pub fn input_enabled(&self) -> bool {
        self.state == WorkflowState::Idle
    }

    /// Submit button: idle with something typed
    pub fn submit_enabled(&self) -> bool {
        self.input_enabled() && !self.input.is_empty()
    }

    /// Token that aborts queries and running batches when cancelled.
    ///
    /// Cancelling is final: later submits fail with [`SubmitError::Cancelled`].
    pub fn cancel_handle(&self) -> CancellationToken {
        self.session.clone()
    }

    pub fn set_input(&mut self, text: impl Into<String>) -> Result<()> {
        self.require(WorkflowState::Idle, "editing the input")?;
        self.input = text.into();
        Ok(())
    }

    /// Load a local URL list as if its contents were typed into the input
    pub async fn load_url_file(&mut self, path: &Path) -> Result<()> {
        self.require(WorkflowState::Idle, "loading a URL list")?;
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| SubmitError::UrlFile {
                path: path.to_path_buf(),
                source,
            })?;
        tracing::debug!(path = %path.display(), bytes = text.len(), "loaded URL list");
        self.input = text;
        Ok(())
    }

    /// Playlist checkbox; read when each request is built
    pub fn set_playlist(&mut self, playlist: bool) {
        self.playlist = playlist;
    }

    /// Replace the list of server directories offered as path overrides
    pub fn set_available_paths(&mut self, paths: Vec<String>) {
        if !paths.contains(&self.download_path) {
            self.download_path.clear();
        }
        self.available_paths = paths;
    }

    /// Ask the server which directories it accepts
    pub async fn refresh_download_paths(&mut self) -> Result<&[String]> {
        let paths = self.client.directory_tree().await?;
        self.set_available_paths(paths);
        Ok(&self.available_paths)
    }

    /// Pick a server directory; an empty path removes the override
    pub fn select_download_path(&mut self, path: &str) -> Result<()> {
        if !path.is_empty() && !self.available_paths.iter().any(|p| p == path) {
            return Err(SubmitError::UnknownDownloadPath(path.to_string()));
        }
        self.download_path = path.to_string();
        Ok(())
    }

    /// Submit action.
    ///
    /// With format selection on, the whole input is queried as one target and
    /// the workflow stops in FormatsReady. Otherwise the batch goes out now.
    /// `settings` is the snapshot used until the workflow returns to Idle.
    pub async fn submit(&mut self, settings: Settings) -> Result<SubmitOutcome> {
        self.require(WorkflowState::Idle, "submitting")?;
        if self.session.is_cancelled() {
            return Err(SubmitError::Cancelled);
        }
        if self.input.is_empty() {
            return Err(SubmitError::EmptyBatch);
        }

        self.settings = settings;

        if self.settings.format_selection {
            self.request_formats().await?;
            Ok(SubmitOutcome::AwaitingChoice)
        } else {
            let raw = std::mem::take(&mut self.input);
            let report = self.run_batch(raw, Vec::new()).await;
            Ok(SubmitOutcome::Submitted(report))
        }
    }

    pub fn select_best(&mut self, code: &str) -> Result<()> {
        self.pick(code, "selecting the best format", |s, c| s.select_best(c))
    }

    pub fn select_video(&mut self, code: &str) -> Result<()> {
        self.pick(code, "selecting a video format", |s, c| s.select_video(c))
    }

    pub fn select_audio(&mut self, code: &str) -> Result<()> {
        self.pick(code, "selecting an audio format", |s, c| s.select_audio(c))
    }

    pub fn clear_selection(&mut self) -> Result<()> {
        self.require(WorkflowState::FormatsReady, "clearing the selection")?;
        if let Some(selection) = self.selection.as_mut() {
            selection.clear();
        }
        Ok(())
    }

    /// Send the batch captured at format query time with the picked codes.
    ///
    /// No pick is allowed; the backend then uses its default format.
    pub async fn confirm(&mut self) -> Result<BatchReport> {
        self.require(WorkflowState::FormatsReady, "confirming formats")?;
        let codes = self
            .selection
            .as_ref()
            .map(FormatSelection::codes)
            .unwrap_or_default();
        let raw = std::mem::take(&mut self.target);
        Ok(self.run_batch(raw, codes).await)
    }

    /// Drop the catalog and selection and go back to Idle.
    ///
    /// Also recovers a workflow whose submit/confirm future was dropped
    /// before it finished.
    pub fn reset(&mut self) {
        self.fetcher.cancel();
        if self.state != WorkflowState::Idle {
            tracing::debug!(from = %self.state, "workflow reset");
        }
        self.catalog = None;
        self.selection = None;
        self.target.clear();
        self.state = WorkflowState::Idle;
    }

    async fn request_formats(&mut self) -> Result<()> {
        self.selection = None;
        self.catalog = None;
        self.target = self.input.clone();
        self.state = WorkflowState::AwaitingFormats;
        tracing::debug!(query = %self.target, "state: awaiting formats");

        match self.fetcher.fetch(&self.target).await {
            Ok(catalog) => {
                self.catalog = Some(catalog);
                self.selection = Some(FormatSelection::new());
                self.input.clear();
                self.state = WorkflowState::FormatsReady;
                tracing::debug!("state: formats ready");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "format query failed; staying idle");
                self.target.clear();
                self.state = WorkflowState::Idle;
                Err(e)
            }
        }
    }

    fn pick(
        &mut self,
        code: &str,
        operation: &'static str,
        apply: impl FnOnce(&mut FormatSelection, &str),
    ) -> Result<()> {
        self.require(WorkflowState::FormatsReady, operation)?;
        let known = self
            .catalog
            .as_ref()
            .is_some_and(|c| FormatSelector::find(c, code).is_some());
        if !known {
            return Err(SubmitError::UnknownFormat(code.to_string()));
        }
        apply(self.selection.get_or_insert_with(FormatSelection::new), code);
        Ok(())
    }

    async fn run_batch(&mut self, raw: String, codes: Vec<String>) -> BatchReport {
        self.state = WorkflowState::Submitting;

        let batch = url_list::parse(&raw);
        let total = batch.len();
        let session = self.session.clone();
        let mut report = BatchReport::new();

        tracing::info!(batch_id = %report.batch_id, items = total, "submitting batch");

        for (index, url) in batch.into_iter().enumerate() {
            let cancelled = tokio::select! {
                biased;
                _ = session.cancelled() => true,
                _ = tokio::time::sleep(self.config.pacing) => false,
            };
            if cancelled {
                report.cancelled = true;
                report.skipped = total - index;
                tracing::warn!(
                    batch_id = %report.batch_id,
                    skipped = report.skipped,
                    "batch cancelled; remaining items dropped"
                );
                break;
            }

            let request = self.build_request(url.clone(), &codes);
            tracing::info!(
                batch_id = %report.batch_id,
                index,
                url = %request.url,
                args = %request.args,
                playlist = request.playlist,
                "dispatching download"
            );
            self.client.download(request);
            report.dispatched.push(DispatchedItem { index, url });

            // transient display state goes once something was sent
            self.input.clear();
            self.catalog = None;
        }

        self.input.clear();
        self.catalog = None;
        self.selection = None;
        self.target.clear();
        self.state = WorkflowState::Idle;

        tracing::info!(
            batch_id = %report.batch_id,
            dispatched = report.dispatched.len(),
            "batch finished"
        );
        report
    }

    fn build_request(&self, url: String, codes: &[String]) -> DownloadRequest {
        let custom_args = self
            .settings
            .enable_custom_args
            .then(|| self.templates.custom_args());
        let template =
            args::compose_template(&self.templates.download_template(), custom_args.as_deref());

        DownloadRequest {
            url,
            args: args::build(codes, &template),
            path_override: if self.settings.path_overriding {
                self.download_path.clone()
            } else {
                String::new()
            },
            rename_to: if self.settings.file_renaming {
                self.templates.filename_template()
            } else {
                String::new()
            },
            playlist: self.playlist,
        }
    }

    fn require(&self, expected: WorkflowState, operation: &'static str) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(SubmitError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::submission::settings::TemplateStore;
    use crate::submission::testing::{sample_catalog, MockClient};
    use std::sync::RwLock;

    fn direct() -> Settings {
        Settings::default()
    }

    fn two_phase() -> Settings {
        Settings {
            format_selection: true,
            ..Settings::default()
        }
    }

    fn make_orchestrator(client: Arc<MockClient>, store: TemplateStore) -> SubmissionOrchestrator {
        SubmissionOrchestrator::new(client, Arc::new(store), SubmissionConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_direct_batch_in_order_and_paced() {
        let client = Arc::new(MockClient::new());
        let mut orch = make_orchestrator(client.clone(), TemplateStore::default());
        let start = tokio::time::Instant::now();

        orch.set_input("https://a\nhttps://b\nhttps://c").unwrap();
        let outcome = orch.submit(direct()).await.unwrap();

        let SubmitOutcome::Submitted(report) = outcome else {
            panic!("expected a direct submission");
        };
        assert_eq!(report.dispatched.len(), 3);
        assert!(!report.cancelled);

        let urls: Vec<String> = client.requests().into_iter().map(|r| r.url).collect();
        assert_eq!(urls, vec!["https://a", "https://b", "https://c"]);

        let times = client.dispatch_times();
        assert!(times[0] - start >= Duration::from_millis(10));
        for pair in times.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(10));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_lines_are_dispatched() {
        let client = Arc::new(MockClient::new());
        let mut orch = make_orchestrator(client.clone(), TemplateStore::default());

        orch.set_input("a\n\nb").unwrap();
        orch.submit(direct()).await.unwrap();

        let urls: Vec<String> = client.requests().into_iter().map(|r| r.url).collect();
        assert_eq!(urls, vec!["a", "", "b"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cycle_resets_display_state() {
        let client = Arc::new(MockClient::with_catalog(sample_catalog()));
        let mut orch = make_orchestrator(client.clone(), TemplateStore::default());

        orch.set_input("https://youtu.be/a\nhttps://youtu.be/b").unwrap();
        orch.submit(two_phase()).await.unwrap();
        orch.select_video("137").unwrap();
        orch.confirm().await.unwrap();

        assert_eq!(orch.state(), WorkflowState::Idle);
        assert_eq!(orch.input(), "");
        assert!(orch.catalog().is_none());
        assert!(orch.selection().is_none());
        assert!(orch.input_enabled());
        assert!(!orch.submit_enabled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_format_selection_best_code() {
        let client = Arc::new(MockClient::with_catalog(sample_catalog()));
        let mut orch = make_orchestrator(client.clone(), TemplateStore::default());

        orch.set_input("https://youtu.be/jNQXAC9IVRw").unwrap();
        let outcome = orch.submit(two_phase()).await.unwrap();
        assert_eq!(outcome, SubmitOutcome::AwaitingChoice);
        assert_eq!(orch.state(), WorkflowState::FormatsReady);
        assert_eq!(orch.input(), "");
        assert!(!orch.input_enabled());

        orch.select_best("18").unwrap();
        // checkbox toggled after the query still counts
        orch.set_playlist(true);
        let report = orch.confirm().await.unwrap();

        let requests = client.requests();
        assert_eq!(report.dispatched.len(), 1);
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url, "https://youtu.be/jNQXAC9IVRw");
        assert!(requests[0].args.starts_with("-f 18"));
        assert!(requests[0].playlist);
        assert_eq!(client.format_queries(), vec!["https://youtu.be/jNQXAC9IVRw"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_multiline_input_is_one_query_target() {
        let client = Arc::new(MockClient::with_catalog(sample_catalog()));
        let mut orch = make_orchestrator(client.clone(), TemplateStore::default());

        orch.set_input("https://a\nhttps://b").unwrap();
        orch.submit(two_phase()).await.unwrap();
        orch.select_video("137").unwrap();
        orch.select_audio("140").unwrap();
        orch.confirm().await.unwrap();

        assert_eq!(client.format_queries(), vec!["https://a\nhttps://b"]);
        let requests = client.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests.iter().all(|r| r.args == "-f 137+140 "));
    }

    #[tokio::test(start_paused = true)]
    async fn test_selection_isolated_between_batches() {
        let client = Arc::new(MockClient::with_catalog(sample_catalog()));
        let mut orch = make_orchestrator(client.clone(), TemplateStore::default());

        orch.set_input("https://a").unwrap();
        orch.submit(two_phase()).await.unwrap();
        orch.select_video("137").unwrap();
        orch.select_audio("140").unwrap();
        orch.confirm().await.unwrap();

        orch.set_input("https://b").unwrap();
        orch.submit(two_phase()).await.unwrap();
        assert!(orch.selection().is_some_and(FormatSelection::is_empty));
        orch.confirm().await.unwrap();

        let requests = client.requests();
        assert_eq!(requests[1].url, "https://b");
        assert_eq!(requests[1].args, " ");
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_input_for_retry() {
        let client = Arc::new(MockClient::failing_formats());
        let mut orch = make_orchestrator(client.clone(), TemplateStore::default());

        orch.set_input("https://a").unwrap();
        let err = orch.submit(two_phase()).await.unwrap_err();

        assert!(matches!(err, SubmitError::FetchFailed(_)));
        assert_eq!(orch.state(), WorkflowState::Idle);
        assert_eq!(orch.input(), "https://a");
        assert!(orch.submit_enabled());

        assert!(orch.submit(two_phase()).await.is_err());
        assert_eq!(client.format_queries().len(), 2);
        assert!(client.requests().is_empty());
    }

    #[tokio::test]
    async fn test_empty_input_is_rejected() {
        let client = Arc::new(MockClient::new());
        let mut orch = make_orchestrator(client.clone(), TemplateStore::default());

        assert!(matches!(
            orch.submit(direct()).await,
            Err(SubmitError::EmptyBatch)
        ));
        assert!(client.requests().is_empty());
    }

    #[tokio::test]
    async fn test_operations_guarded_by_state() {
        let client = Arc::new(MockClient::with_catalog(sample_catalog()));
        let mut orch = make_orchestrator(client, TemplateStore::default());

        assert!(matches!(
            orch.select_best("18"),
            Err(SubmitError::InvalidState { .. })
        ));
        assert!(matches!(
            orch.confirm().await,
            Err(SubmitError::InvalidState { .. })
        ));

        orch.set_input("https://a").unwrap();
        orch.submit(two_phase()).await.unwrap();

        assert!(matches!(
            orch.set_input("https://other"),
            Err(SubmitError::InvalidState { .. })
        ));
        assert!(matches!(
            orch.submit(two_phase()).await,
            Err(SubmitError::InvalidState { .. })
        ));
        assert!(matches!(
            orch.select_video("999"),
            Err(SubmitError::UnknownFormat(code)) if code == "999"
        ));
    }

    #[tokio::test]
    async fn test_reset_discards_catalog() {
        let client = Arc::new(MockClient::with_catalog(sample_catalog()));
        let mut orch = make_orchestrator(client.clone(), TemplateStore::default());

        orch.set_input("https://a").unwrap();
        orch.submit(two_phase()).await.unwrap();
        orch.select_best("18").unwrap();
        orch.reset();

        assert_eq!(orch.state(), WorkflowState::Idle);
        assert!(orch.catalog().is_none());
        assert!(orch.selection().is_none());
        assert!(client.requests().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_aborts_remaining_items() {
        let client = Arc::new(MockClient::new());
        let mut orch = SubmissionOrchestrator::new(
            client.clone(),
            Arc::new(TemplateStore::default()),
            SubmissionConfig::default().with_pacing(Duration::from_secs(1)),
        );
        let cancel = orch.cancel_handle();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(2500)).await;
            cancel.cancel();
        });

        orch.set_input("1\n2\n3\n4\n5").unwrap();
        let SubmitOutcome::Submitted(report) = orch.submit(direct()).await.unwrap() else {
            panic!("expected a direct submission");
        };

        assert!(report.cancelled);
        assert_eq!(report.dispatched.len(), 2);
        assert_eq!(report.skipped, 3);
        assert_eq!(client.requests().len(), 2);
        assert_eq!(orch.state(), WorkflowState::Idle);

        orch.set_input("6").unwrap();
        assert!(matches!(
            orch.submit(direct()).await,
            Err(SubmitError::Cancelled)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_templates_and_toggles() {
        let client = Arc::new(MockClient::new().with_paths(&["/downloads", "/music"]));
        let store = TemplateStore {
            download_template: "--no-mtime".to_string(),
            filename_template: "%(title)s.%(ext)s".to_string(),
            custom_args: "-x".to_string(),
            saved_templates: Vec::new(),
        };
        let mut orch = make_orchestrator(client.clone(), store);

        orch.refresh_download_paths().await.unwrap();
        orch.select_download_path("/music").unwrap();
        assert!(matches!(
            orch.select_download_path("/etc"),
            Err(SubmitError::UnknownDownloadPath(_))
        ));

        orch.set_input("https://a").unwrap();
        orch.submit(direct()).await.unwrap();

        orch.set_input("https://b").unwrap();
        orch.submit(Settings {
            format_selection: false,
            enable_custom_args: true,
            file_renaming: true,
            path_overriding: true,
        })
        .await
        .unwrap();

        let requests = client.requests();
        assert_eq!(requests[0].args, " --no-mtime");
        assert_eq!(requests[0].rename_to, "");
        assert_eq!(requests[0].path_override, "");

        assert_eq!(requests[1].args, " --no-mtime -x");
        assert_eq!(requests[1].rename_to, "%(title)s.%(ext)s");
        assert_eq!(requests[1].path_override, "/music");
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_args_read_at_dispatch_time() {
        let client = Arc::new(MockClient::new());
        let store = Arc::new(RwLock::new(TemplateStore::default()));
        let mut orch = SubmissionOrchestrator::new(
            client.clone(),
            store.clone(),
            SubmissionConfig::default().with_pacing(Duration::from_secs(1)),
        );

        tokio::spawn({
            let store = store.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(1500)).await;
                store.write().unwrap().custom_args = "-x".to_string();
            }
        });

        orch.set_input("a\nb").unwrap();
        orch.submit(Settings {
            enable_custom_args: true,
            ..Settings::default()
        })
        .await
        .unwrap();

        let requests = client.requests();
        assert_eq!(requests[0].args, " ");
        assert_eq!(requests[1].args, " -x");
    }

    #[tokio::test]
    async fn test_load_url_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("urls.txt");
        std::fs::write(&path, "https://a\nhttps://b").unwrap();

        let client = Arc::new(MockClient::new());
        let mut orch = make_orchestrator(client, TemplateStore::default());

        orch.load_url_file(&path).await.unwrap();
        assert_eq!(orch.input(), "https://a\nhttps://b");

        assert!(matches!(
            orch.load_url_file(&dir.path().join("missing.txt")).await,
            Err(SubmitError::UrlFile { .. })
        ));
    }
}
