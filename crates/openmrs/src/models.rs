//! Wire models for OpenMRS REST payloads.
//!
//! Field names follow the REST representation (`givenName`, `obsDatetime`, ...). Only the fields
//! clinic-sync reads or writes are modelled; unknown response fields are ignored.

use crate::{OpenmrsError, OpenmrsResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sync_types::ResourceUuid;

/// Envelope returned by every OpenMRS list/search endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct ResultList<T> {
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}

/// The `custom:(uuid)` representation of any resource.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct UuidRef {
    pub uuid: ResourceUuid,
}

/// Body of `GET /session`.
#[derive(Debug, Deserialize)]
pub(crate) struct SessionInfo {
    #[serde(default)]
    pub authenticated: bool,
}

/// A person name as sent to `POST /person`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonName {
    pub given_name: String,
    pub family_name: String,
}

/// Body of `POST /person`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewPerson {
    pub names: Vec<PersonName>,
    pub gender: String,
    pub birthdate: String,
}

/// One identifier entry of a new patient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPatientIdentifier {
    pub identifier: String,
    pub identifier_type: ResourceUuid,
    pub location: ResourceUuid,
    pub preferred: bool,
}

/// Body of `POST /patient`, linking an existing person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewPatient {
    pub person: ResourceUuid,
    pub identifiers: Vec<NewPatientIdentifier>,
}

/// JSON part of the multipart `POST /obs` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewObservation {
    pub person: ResourceUuid,
    pub concept: ResourceUuid,
    pub obs_datetime: String,
    pub comment: String,
}

/// Binary part of the multipart `POST /obs` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// The `custom:(uuid,comment)` representation of an observation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ObservationSummary {
    pub uuid: ResourceUuid,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Parses a `{"results": [...]}` body.
pub(crate) fn parse_results<T: DeserializeOwned>(body: &str) -> OpenmrsResult<Vec<T>> {
    let list: ResultList<T> =
        serde_json::from_str(body).map_err(|e| OpenmrsError::ResponseParsing(e.to_string()))?;
    Ok(list.results)
}

/// Parses the `uuid` of a freshly created resource.
pub(crate) fn parse_created(body: &str) -> OpenmrsResult<ResourceUuid> {
    let created: UuidRef =
        serde_json::from_str(body).map_err(|e| OpenmrsError::ResponseParsing(e.to_string()))?;
    Ok(created.uuid)
}

pub(crate) fn parse_session(body: &str) -> OpenmrsResult<SessionInfo> {
    serde_json::from_str(body).map_err(|e| OpenmrsError::ResponseParsing(e.to_string()))
}
