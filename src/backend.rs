//! Client side of the Lattice Builder JSON-RPC service.

use crate::{config, error::BackendError};
use latweb_protocol::{
    ExecResult, METHOD_ARRAY_FROM_EXPR, METHOD_BACKEND_VERSION, METHOD_LATBUILDER_EXEC,
    RpcRequest, RpcResponse,
};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};
use tracing::{debug, warn};

/// Remote operations the form relies on.
pub trait Backend: Send + Sync {
    fn backend_version(&self) -> Result<String, BackendError>;

    /// Evaluates `expr` for `index` = 1..=`length`.
    fn array_from_expr(
        &self,
        expr: &str,
        index: &str,
        length: usize,
    ) -> Result<Vec<f64>, BackendError>;

    fn latbuilder_exec(&self, params: &[Value]) -> Result<ExecResult, BackendError>;
}

pub struct HttpBackend {
    url: String,
    client: reqwest::blocking::Client,
    next_id: AtomicU64,
}

impl HttpBackend {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, BackendError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Transport(format!("could not build HTTP client: {e}")))?;
        Ok(Self {
            url: url.into(),
            client,
            next_id: AtomicU64::new(0),
        })
    }

    /// Client for the configured URL and timeout.
    pub fn from_config() -> Result<Self, BackendError> {
        Self::new(config::backend_url(), config::request_timeout())
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, BackendError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let request = RpcRequest::new(id, method, params);
        debug!(id, method, url = %self.url, "sending backend request");
        let response = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .map_err(|e| {
                warn!(id, method, error = %e, "backend request failed");
                BackendError::Transport(e.to_string())
            })?;
        let status = response.status();
        let body = response
            .text()
            .map_err(|e| BackendError::Transport(format!("could not read response body: {e}")))?;
        if !status.is_success() {
            return Err(BackendError::Transport(format!("HTTP {status}")));
        }
        decode_response(&body)
    }
}

impl Backend for HttpBackend {
    fn backend_version(&self) -> Result<String, BackendError> {
        self.call(METHOD_BACKEND_VERSION, json!([]))
    }

    fn array_from_expr(
        &self,
        expr: &str,
        index: &str,
        length: usize,
    ) -> Result<Vec<f64>, BackendError> {
        self.call(METHOD_ARRAY_FROM_EXPR, json!([expr, index, length]))
    }

    fn latbuilder_exec(&self, params: &[Value]) -> Result<ExecResult, BackendError> {
        self.call(METHOD_LATBUILDER_EXEC, Value::Array(params.to_vec()))
    }
}

/// Decodes a response body into the expected payload type. A response with
/// an `error` object becomes [`BackendError::Remote`] with its message kept
/// verbatim.
pub fn decode_response<T: DeserializeOwned>(body: &str) -> Result<T, BackendError> {
    let response: RpcResponse = serde_json::from_str(body)
        .map_err(|e| BackendError::Protocol(format!("invalid JSON-RPC response: {e}")))?;
    let result = response.into_result().map_err(|e| BackendError::Remote {
        message: e.message,
    })?;
    serde_json::from_value(result)
        .map_err(|e| BackendError::Protocol(format!("unexpected result shape: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_exec_result() {
        let body = r#"{"id": 0, "result": ["latbuilder -d 3", 1024, [1, 433, 229], 0.0123, 1.5], "error": null}"#;
        let result: ExecResult = decode_response(body).unwrap();
        assert_eq!(result.size, 1024);
        assert_eq!(result.generating_vector, vec![1, 433, 229]);
    }

    #[test]
    fn error_message_is_verbatim() {
        let body = r#"{"id": 1, "result": null, "error": {"name": "LatBuilderError", "message": "invalid weights"}}"#;
        let err = decode_response::<ExecResult>(body).unwrap_err();
        assert_eq!(
            err,
            BackendError::Remote {
                message: "invalid weights".to_string()
            }
        );
    }

    #[test]
    fn malformed_bodies_are_protocol_errors() {
        assert!(matches!(
            decode_response::<String>("<html>"),
            Err(BackendError::Protocol(_))
        ));
        assert!(matches!(
            decode_response::<Vec<f64>>(r#"{"id": 2, "result": "nope"}"#),
            Err(BackendError::Protocol(_))
        ));
    }

    #[test]
    fn unreachable_host_is_a_transport_error() {
        let backend = HttpBackend::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        assert!(matches!(
            backend.backend_version(),
            Err(BackendError::Transport(_))
        ));
    }

    #[test]
    fn request_ids_increase() {
        let backend = HttpBackend::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap();
        let _ = backend.backend_version();
        let _ = backend.backend_version();
        assert_eq!(backend.next_id.load(Ordering::SeqCst), 2);
    }
}
