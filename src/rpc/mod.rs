// RPC client for the yt-dlp web UI backend

pub mod http;
pub mod wire;

use thiserror::Error;

pub use http::HttpRpcClient;

#[derive(Debug, Error)]
pub enum RpcError {
    /// Client could not be built from the config
    #[error("invalid client configuration: {0}")]
    Config(String),

    /// Connection, timeout or TLS failure
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("server answered {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body was not the expected JSON
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Backend reported an error for the call
    #[error("backend error: {0}")]
    Backend(String),

    /// Call succeeded but carried no result
    #[error("backend returned no result")]
    EmptyResult,

    /// Dispatcher task is no longer running
    #[error("request queue is closed")]
    Closed,
}

/// Connection settings for the backend
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server root, e.g. "http://127.0.0.1:3033"
    pub base_url: String,
    /// SOCKS5/HTTP proxy URL
    pub proxy: Option<String>,
    /// Request timeout in seconds
    pub timeout_seconds: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3033".to_string(),
            proxy: None,
            timeout_seconds: 30,
        }
    }
}

impl ClientConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.proxy = proxy;
        self
    }

    pub fn with_timeout(mut self, seconds: u32) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// `<base>/rpc/http`
    pub fn rpc_url(&self) -> String {
        format!("{}/rpc/http", self.base_url.trim_end_matches('/'))
    }

    /// `<base>/restart-service/`
    pub fn restart_url(&self) -> String {
        format!("{}/restart-service/", self.base_url.trim_end_matches('/'))
    }
}
