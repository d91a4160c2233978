//! Authenticated Odoo session.

use crate::rpc::{individuals_domain, parse_response, parse_uid, RpcRequest};
use crate::{OdooError, OdooResult, Partner};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::cell::Cell;

const PARTNER_FIELDS: [&str; 3] = ["id", "name", "is_company"];

/// A logged-in JSON-RPC session.
///
/// Construction performs `common.login`, so holding an `OdooClient` means the credentials were
/// accepted. The password is resent with every `execute_kw` call, as the protocol requires.
#[derive(Debug)]
pub struct OdooClient {
    endpoint: String,
    database: String,
    uid: u64,
    password: String,
    client: reqwest::blocking::Client,
    next_id: Cell<u64>,
}

impl OdooClient {
    /// Log in to `database` on the server at `base_url` (e.g. `http://localhost:8069`).
    pub fn connect(base_url: &str, database: &str, user: &str, password: &str) -> OdooResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .build()
            .map_err(|e| OdooError::Http(e.to_string()))?;
        let endpoint = format!("{}/jsonrpc", base_url.trim_end_matches('/'));

        let mut session = Self {
            endpoint,
            database: database.to_string(),
            uid: 0,
            password: password.to_string(),
            client,
            next_id: Cell::new(1),
        };

        let result: Value = session.call(
            "common",
            "login",
            vec![
                Value::from(database),
                Value::from(user),
                Value::from(password),
            ],
        )?;
        session.uid = parse_uid(&result).ok_or_else(|| OdooError::AuthenticationFailed {
            database: database.to_string(),
            user: user.to_string(),
        })?;

        tracing::info!("Connected to Odoo database '{}' as uid {}", database, session.uid);
        Ok(session)
    }

    /// Individual (non-company) partners, excluding the given display names.
    pub fn list_individuals(&self, excluded_names: &[String]) -> OdooResult<Vec<Partner>> {
        let domain = individuals_domain(excluded_names);
        let options = serde_json::json!({ "fields": PARTNER_FIELDS });
        self.execute_kw("res.partner", "search_read", vec![domain], options)
    }

    fn execute_kw<T: DeserializeOwned>(
        &self,
        model: &str,
        method: &str,
        args: Vec<Value>,
        kwargs: Value,
    ) -> OdooResult<T> {
        self.call(
            "object",
            "execute_kw",
            vec![
                Value::from(self.database.as_str()),
                Value::from(self.uid),
                Value::from(self.password.as_str()),
                Value::from(model),
                Value::from(method),
                Value::Array(args),
                kwargs,
            ],
        )
    }

    fn call<T: DeserializeOwned>(
        &self,
        service: &str,
        method: &str,
        args: Vec<Value>,
    ) -> OdooResult<T> {
        let id = self.next_id.get();
        self.next_id.set(id + 1);

        let request = RpcRequest::call(id, service, method, args);
        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .map_err(|e| {
                if e.is_connect() {
                    OdooError::Connection(self.endpoint.clone())
                } else {
                    OdooError::Http(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| OdooError::Http(e.to_string()))?;
        if !status.is_success() {
            return Err(OdooError::Http(format!("{status}: {body}")));
        }
        parse_response(&body)
    }
}
