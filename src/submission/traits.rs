// Collaborator traits for the submission workflow

use async_trait::async_trait;

use super::models::{DownloadRequest, FormatCatalog};
use crate::rpc::RpcError;

/// Trait for the backend RPC client
#[async_trait]
pub trait RpcClient: Send + Sync {
    /// Name of the transport (for logging)
    fn name(&self) -> &'static str;

    /// Queue a download. Fire-and-forget: calls issued in order reach the
    /// backend in order, and failures are only logged.
    fn download(&self, request: DownloadRequest);

    /// Query available formats for one URL
    async fn formats(&self, url: &str) -> Result<FormatCatalog, RpcError>;

    /// Directories the server accepts as path overrides
    async fn directory_tree(&self) -> Result<Vec<String>, RpcError>;

    /// Stop every running job on the backend
    fn kill_all(&self);
}

/// Read-only view of the persisted templates.
///
/// Read at dispatch time, so edits made while a batch runs are picked up
/// by the remaining items.
pub trait TemplateSource: Send + Sync {
    /// Arguments appended to every request
    fn download_template(&self) -> String;

    /// Rename target, used only when file renaming is on
    fn filename_template(&self) -> String;

    /// Free-form extra arguments, used only when custom args are on
    fn custom_args(&self) -> String;
}
