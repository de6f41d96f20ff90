// Error types for the submission workflow

use std::path::PathBuf;
use thiserror::Error;

use super::orchestrator::WorkflowState;
use crate::rpc::RpcError;

#[derive(Debug, Error)]
pub enum SubmitError {
    /// Submit was triggered with nothing in the input box
    #[error("nothing to submit: the URL input is empty")]
    EmptyBatch,

    /// Operation is not allowed in the current workflow state
    #[error("{operation} is not allowed while {state}")]
    InvalidState {
        operation: &'static str,
        state: WorkflowState,
    },

    /// Format code is not part of the fetched catalog
    #[error("format {0} is not in the current catalog")]
    UnknownFormat(String),

    /// Download path is not one the server advertised
    #[error("download path {0} is not offered by the server")]
    UnknownDownloadPath(String),

    /// Format query failed or returned nothing usable
    #[error("format query failed: {0}")]
    FetchFailed(#[from] RpcError),

    /// A newer format query replaced this one before it resolved
    #[error("format query for {0} was superseded by a newer one")]
    Superseded(String),

    /// The workflow session was cancelled
    #[error("workflow was cancelled")]
    Cancelled,

    /// Reading a local URL list failed
    #[error("failed to read URL list {path}: {source}")]
    UrlFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Settings or template store could not be read or written
    #[error("config store error at {path}: {reason}")]
    Config { path: PathBuf, reason: String },
}

pub type Result<T> = std::result::Result<T, SubmitError>;
