//! Odoo CRM access over JSON-RPC.
//!
//! Only read access to `res.partner` is needed: clinic-sync lists individual contacts and uses
//! their numeric id as the external identifier. Calls go through the generic `/jsonrpc`
//! endpoint (`common.login`, then `object.execute_kw`), the same protocol the Odoo web client
//! and `odoorpc` use.

mod client;
mod rpc;

pub use client::OdooClient;

use serde::Deserialize;

/// Errors returned by the Odoo client
#[derive(Debug, thiserror::Error)]
pub enum OdooError {
    /// The server could not be reached at all
    #[error("cannot connect to Odoo at {0}")]
    Connection(String),

    /// Any other transport-level failure
    #[error("HTTP client error: {0}")]
    Http(String),

    /// `common.login` returned `false`
    #[error("Odoo rejected the credentials for user '{user}' on database '{database}'")]
    AuthenticationFailed { database: String, user: String },

    /// The server returned a JSON-RPC `error` member
    #[error("Odoo RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// The response body did not have the expected shape
    #[error("failed to parse Odoo response: {0}")]
    ResponseParsing(String),
}

pub type OdooResult<T> = std::result::Result<T, OdooError>;

/// The `res.partner` fields clinic-sync reads.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Partner {
    pub id: u64,
    /// Display name; Odoo sends `false` for unset text fields, which maps to an empty string.
    #[serde(deserialize_with = "rpc::string_or_false")]
    pub name: String,
    #[serde(default)]
    pub is_company: bool,
}
