//! Shared machine-readable contracts between the latweb form controller and
//! the Lattice Builder JSON-RPC service.
//!
//! The service speaks a small JSON-RPC dialect over HTTP POST: every request
//! carries a client-chosen increasing `id`, a `method` name and positional
//! `params`; every response echoes the `id` and carries either `result` or an
//! `error` object with a human-readable `message`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const METHOD_BACKEND_VERSION: &str = "backend_version";
pub const METHOD_ARRAY_FROM_EXPR: &str = "array_from_expr";
pub const METHOD_LATBUILDER_EXEC: &str = "latbuilder_exec";

/// Number of positional parameters expected by `latbuilder_exec`.
pub const EXEC_PARAM_COUNT: usize = 11;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    pub id: u64,
    pub method: String,
    pub params: Value,
}

impl RpcRequest {
    pub fn new(id: u64, method: &str, params: Value) -> Self {
        Self {
            id,
            method: method.to_string(),
            params,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcErrorObject {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub code: Option<i64>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcErrorObject>,
}

impl RpcResponse {
    /// Splits the response into its payload or its error object.
    ///
    /// A response carrying a non-null `error` is an error even when a
    /// `result` is present as well.
    pub fn into_result(self) -> Result<Value, RpcErrorObject> {
        if let Some(error) = self.error {
            return Err(error);
        }
        Ok(self.result.unwrap_or(Value::Null))
    }
}

/// Successful `latbuilder_exec` payload.
///
/// On the wire this is the positional tuple
/// `[command, size, generating_vector, merit, cpu_seconds]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ExecResultTuple", into = "ExecResultTuple")]
pub struct ExecResult {
    pub command: String,
    pub size: u64,
    pub generating_vector: Vec<u64>,
    pub merit: f64,
    pub cpu_seconds: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ExecResultTuple(String, u64, Vec<u64>, f64, f64);

impl From<ExecResultTuple> for ExecResult {
    fn from(t: ExecResultTuple) -> Self {
        Self {
            command: t.0,
            size: t.1,
            generating_vector: t.2,
            merit: t.3,
            cpu_seconds: t.4,
        }
    }
}

impl From<ExecResult> for ExecResultTuple {
    fn from(r: ExecResult) -> Self {
        Self(r.command, r.size, r.generating_vector, r.merit, r.cpu_seconds)
    }
}
