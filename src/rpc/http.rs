// HTTP JSON-RPC transport
//
// Downloads and kill requests go through one queue drained by a single
// worker task, so they reach the server in the order they were issued
// without the caller waiting on them. Queries are sent directly.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

use super::wire::{self, RpcRequest, UrlArgs};
use super::{ClientConfig, RpcError};
use crate::submission::models::{DownloadRequest, FormatCatalog};
use crate::submission::traits::RpcClient;

enum Queued {
    Call {
        method: &'static str,
        params: Vec<Value>,
        label: String,
    },
    Flush(oneshot::Sender<()>),
}

struct Transport {
    http: reqwest::Client,
    rpc_url: String,
    next_id: AtomicU64,
}

impl Transport {
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<T, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = RpcRequest { id, method, params };

        let response = self.http.post(&self.rpc_url).json(&body).send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            return Err(RpcError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }
        wire::decode(&bytes)
    }

    /// Call whose result is not needed; a null result is fine
    async fn notify(&self, method: &str, params: Vec<Value>) -> Result<(), RpcError> {
        match self.call::<Value>(method, params).await {
            Ok(_) | Err(RpcError::EmptyResult) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

/// reqwest-backed client for the web UI's `/rpc/http` endpoint
pub struct HttpRpcClient {
    config: ClientConfig,
    transport: Arc<Transport>,
    http: reqwest::Client,
    queue: mpsc::UnboundedSender<Queued>,
}

impl HttpRpcClient {
    /// Build the client and start its dispatcher.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(config: ClientConfig) -> Result<Self, RpcError> {
        let mut builder =
            reqwest::Client::builder().timeout(Duration::from_secs(config.timeout_seconds as u64));

        if let Some(proxy_url) = config.proxy.as_deref() {
            let proxy = reqwest::Proxy::all(proxy_url)
                .map_err(|e| RpcError::Config(format!("invalid proxy {}: {}", proxy_url, e)))?;
            tracing::debug!(proxy = proxy_url, "using proxy");
            builder = builder.proxy(proxy);
        }

        let http = builder.build()?;
        let transport = Arc::new(Transport {
            http: http.clone(),
            rpc_url: config.rpc_url(),
            next_id: AtomicU64::new(1),
        });

        let (queue, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_dispatcher(transport.clone(), rx));

        Ok(Self {
            config,
            transport,
            http,
            queue,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Wait until everything queued so far has been sent
    pub async fn flush(&self) -> Result<(), RpcError> {
        let (done, waiter) = oneshot::channel();
        self.queue
            .send(Queued::Flush(done))
            .map_err(|_| RpcError::Closed)?;
        waiter.await.map_err(|_| RpcError::Closed)
    }

    /// Ask the server to restart its service unit
    pub async fn restart_service(&self) -> Result<String, RpcError> {
        let response = self.http.post(self.config.restart_url()).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(RpcError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }

    fn enqueue(&self, method: &'static str, params: Vec<Value>, label: String) {
        let call = Queued::Call {
            method,
            params,
            label,
        };
        if self.queue.send(call).is_err() {
            tracing::warn!(method, "request queue closed; call dropped");
        }
    }
}

async fn run_dispatcher(transport: Arc<Transport>, mut rx: mpsc::UnboundedReceiver<Queued>) {
    while let Some(queued) = rx.recv().await {
        match queued {
            Queued::Call {
                method,
                params,
                label,
            } => match transport.notify(method, params).await {
                Ok(()) => tracing::debug!(method, target_url = %label, "sent"),
                Err(e) => tracing::warn!(method, target_url = %label, error = %e, "call failed"),
            },
            Queued::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    tracing::debug!("dispatcher stopped");
}

#[async_trait]
impl RpcClient for HttpRpcClient {
    fn name(&self) -> &'static str {
        "http"
    }

    fn download(&self, request: DownloadRequest) {
        if request.url.is_empty() {
            tracing::debug!("skipping request without URL");
            return;
        }

        let (method, args) = wire::exec_call(&request);
        match serde_json::to_value(&args) {
            Ok(params) => self.enqueue(method, vec![params], request.url),
            Err(e) => tracing::warn!(url = %request.url, error = %e, "failed to encode request"),
        }
    }

    async fn formats(&self, url: &str) -> Result<FormatCatalog, RpcError> {
        let args = UrlArgs {
            url: wire::strip_list_param(url).to_string(),
        };
        self.transport
            .call(wire::METHOD_FORMATS, vec![serde_json::to_value(args)?])
            .await
    }

    async fn directory_tree(&self) -> Result<Vec<String>, RpcError> {
        self.transport
            .call(wire::METHOD_DIRECTORY_TREE, Vec::new())
            .await
    }

    fn kill_all(&self) {
        self.enqueue(wire::METHOD_KILL_ALL, Vec::new(), String::new());
    }
}
