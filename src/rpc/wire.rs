// JSON-RPC wire format for the yt-dlp web UI backend
//
// Requests are POSTed to `/rpc/http` as `{id, method, params: [arg]}`;
// the server answers `{id, result, error}` with `error` null on success.

use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::RpcError;
use crate::submission::models::DownloadRequest;

pub const METHOD_EXEC: &str = "Service.Exec";
pub const METHOD_EXEC_PLAYLIST: &str = "Service.ExecPlaylist";
pub const METHOD_FORMATS: &str = "Service.Formats";
pub const METHOD_KILL_ALL: &str = "Service.KillAll";
pub const METHOD_DIRECTORY_TREE: &str = "Service.DirectoryTree";

lazy_static::lazy_static! {
    static ref OUTPUT_RE: Regex = Regex::new(r"(?:^|\s)(?:-o|--output)\s+(\S+)").unwrap();
}

#[derive(Debug, Serialize)]
pub struct RpcRequest<'a> {
    pub id: u64,
    pub method: &'a str,
    pub params: Vec<Value>,
}

#[derive(Debug, Deserialize)]
pub struct RpcResponse<T> {
    #[serde(default)]
    pub id: Option<u64>,
    pub result: Option<T>,
    #[serde(default)]
    pub error: Option<Value>,
}

impl<T> RpcResponse<T> {
    /// Backend error first, then a missing result
    pub fn into_result(self) -> Result<T, RpcError> {
        match self.error {
            Some(Value::Null) | None => self.result.ok_or(RpcError::EmptyResult),
            Some(Value::String(msg)) => Err(RpcError::Backend(msg)),
            Some(other) => Err(RpcError::Backend(other.to_string())),
        }
    }
}

/// Decode a response body into its result
pub fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, RpcError> {
    let response: RpcResponse<T> = serde_json::from_slice(body)?;
    response.into_result()
}

/// Argument object of `Service.Exec` / `Service.ExecPlaylist`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecArgs {
    #[serde(rename = "URL")]
    pub url: String,
    #[serde(rename = "Params")]
    pub params: Vec<String>,
    #[serde(rename = "Path")]
    pub path: String,
    #[serde(rename = "Rename")]
    pub rename: String,
}

/// Argument object of `Service.Formats`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UrlArgs {
    #[serde(rename = "URL")]
    pub url: String,
}

/// Drop a `?list…` suffix so a single video is queried
pub fn strip_list_param(url: &str) -> &str {
    url.split_once("?list").map_or(url, |(head, _)| head)
}

/// Pull an output template out of the args.
///
/// Returns the args without `-o <name>` and the name, if there was one.
pub fn extract_output(args: &str) -> (String, Option<String>) {
    match OUTPUT_RE.captures(args) {
        Some(caps) => {
            let name = caps.get(1).map(|m| m.as_str().to_string());
            let stripped = OUTPUT_RE.replace(args, " ").into_owned();
            (stripped, name)
        }
        None => (args.to_string(), None),
    }
}

/// Split args into the params list the backend hands to yt-dlp
pub fn sanitize_args(args: &str) -> Vec<String> {
    args.split_whitespace().map(str::to_string).collect()
}

/// Map a download request to its method and argument object.
///
/// An output template inside the args takes precedence over `rename_to`.
pub fn exec_call(request: &DownloadRequest) -> (&'static str, ExecArgs) {
    let (args, output) = extract_output(&request.args);
    let rename = output.unwrap_or_else(|| request.rename_to.clone());

    if request.playlist {
        (
            METHOD_EXEC_PLAYLIST,
            ExecArgs {
                url: request.url.clone(),
                params: sanitize_args(&args),
                path: request.path_override.clone(),
                rename,
            },
        )
    } else {
        (
            METHOD_EXEC,
            ExecArgs {
                url: strip_list_param(&request.url).to_string(),
                params: sanitize_args(&args),
                path: request.path_override.clone(),
                rename,
            },
        )
    }
}
