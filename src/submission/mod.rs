// Submission module - batch download submission and format selection workflow

pub mod args;
pub mod errors;
pub mod fetcher;
pub mod format_selector;
pub mod models;
pub mod orchestrator;
pub mod settings;
pub mod traits;
pub mod url_list;

#[cfg(test)]
pub(crate) mod testing;

pub use errors::SubmitError;
pub use fetcher::FormatCatalogFetcher;
pub use format_selector::{FormatKind, FormatOption, FormatSelection, FormatSelector};
pub use models::{BatchReport, DispatchedItem, DownloadRequest, FormatCatalog, FormatDescriptor};
pub use orchestrator::{SubmissionConfig, SubmissionOrchestrator, SubmitOutcome, WorkflowState};
pub use settings::{AppConfig, SavedTemplate, Settings, TemplateStore};
pub use traits::{RpcClient, TemplateSource};
