//! OpenMRS REST client
//!
//! This crate wraps the handful of `ws/rest/v1` endpoints that clinic-sync needs:
//!
//! - `GET /session` to confirm the configured credentials authenticate
//! - `GET /patient?q=<identifier>` to find subjects by identifier
//! - `GET /<resource>` to pick the first configured location or identifier type
//! - `POST /person`, `POST /patient` and `DELETE /person/<uuid>` for provisioning
//! - `GET /obs` and multipart `POST /obs` for document attachments
//!
//! All calls are blocking and authenticated with HTTP basic auth. Wire models live in
//! [`models`]; response bodies are parsed through small pure functions so they can be tested
//! without a server.

mod client;
pub mod models;

pub use client::OpenmrsClient;
pub use models::{
    Attachment, NewObservation, NewPatient, NewPatientIdentifier, NewPerson, ObservationSummary,
    PersonName,
};

/// Errors returned by the OpenMRS client
#[derive(Debug, thiserror::Error)]
pub enum OpenmrsError {
    /// The server could not be reached at all
    #[error("cannot connect to OpenMRS at {0}")]
    Connection(String),

    /// Any other transport-level failure
    #[error("HTTP client error: {0}")]
    Http(String),

    /// The session endpoint reported the credentials as not authenticated
    #[error("OpenMRS rejected the configured credentials")]
    Unauthenticated,

    /// The server answered with a status the caller did not accept
    #[error("unexpected OpenMRS response {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    /// The response body did not have the expected shape
    #[error("failed to parse OpenMRS response: {0}")]
    ResponseParsing(String),

    /// A request payload could not be serialised
    #[error("failed to serialise request: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type OpenmrsResult<T> = std::result::Result<T, OpenmrsError>;
