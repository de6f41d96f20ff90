pub mod cli;
pub mod rpc;
pub mod submission;

pub use rpc::{ClientConfig, HttpRpcClient, RpcError};
pub use submission::{
    DownloadRequest, FormatCatalog, Settings, SubmissionConfig, SubmissionOrchestrator,
    SubmitError, SubmitOutcome, TemplateStore, WorkflowState,
};
