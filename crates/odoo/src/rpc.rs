//! JSON-RPC envelopes used by Odoo's `/jsonrpc` endpoint.

use crate::{OdooError, OdooResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Serialize)]
pub(crate) struct RpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'static str,
    params: RpcParams<'a>,
    id: u64,
}

#[derive(Debug, Serialize)]
struct RpcParams<'a> {
    service: &'a str,
    method: &'a str,
    args: Vec<Value>,
}

impl<'a> RpcRequest<'a> {
    pub(crate) fn call(id: u64, service: &'a str, method: &'a str, args: Vec<Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            method: "call",
            params: RpcParams {
                service,
                method,
                args,
            },
            id,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Option<RpcErrorData>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorData {
    #[serde(default)]
    message: String,
}

/// Extract and decode `result`, turning an `error` member into [`OdooError::Rpc`].
pub(crate) fn parse_response<T: DeserializeOwned>(body: &str) -> OdooResult<T> {
    let response: RpcResponse =
        serde_json::from_str(body).map_err(|e| OdooError::ResponseParsing(e.to_string()))?;

    if let Some(error) = response.error {
        // The top-level message is always "Odoo Server Error"; the useful text is in data.
        let message = match error.data {
            Some(data) if !data.message.is_empty() => data.message,
            _ => error.message,
        };
        return Err(OdooError::Rpc {
            code: error.code,
            message,
        });
    }

    let result = response
        .result
        .ok_or_else(|| OdooError::ResponseParsing("response has neither result nor error".into()))?;
    serde_json::from_value(result).map_err(|e| OdooError::ResponseParsing(e.to_string()))
}

/// `common.login` answers with the numeric uid, or `false` when the credentials are wrong.
pub(crate) fn parse_uid(result: &Value) -> Option<u64> {
    result.as_u64()
}

/// Search domain selecting individual contacts, minus the given display names.
pub(crate) fn individuals_domain(excluded_names: &[String]) -> Value {
    let mut domain = vec![serde_json::json!(["is_company", "=", false])];
    if !excluded_names.is_empty() {
        domain.push(serde_json::json!(["name", "not in", excluded_names]));
    }
    Value::Array(domain)
}

pub(crate) fn string_or_false<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Bool(false) | Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or false, got {other}"
        ))),
    }
}
