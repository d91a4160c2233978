//! Blocking HTTP client for the OpenMRS REST API.

use crate::models::{
    parse_created, parse_results, parse_session, Attachment, NewObservation, NewPatient,
    NewPerson, ObservationSummary, UuidRef,
};
use crate::{OpenmrsError, OpenmrsResult};
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{RequestBuilder, Response};
use reqwest::StatusCode;
use sync_types::ResourceUuid;

/// Authenticated session against one OpenMRS instance.
///
/// The underlying `reqwest` client keeps its connection pool for the lifetime of the run; the
/// credentials are attached to every request.
#[derive(Debug)]
pub struct OpenmrsClient {
    base_url: String,
    username: String,
    password: String,
    client: reqwest::blocking::Client,
}

impl OpenmrsClient {
    /// Create a client for the REST root, e.g. `http://localhost:8000/openmrs/ws/rest/v1`.
    pub fn new(base_url: &str, username: &str, password: &str) -> OpenmrsResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .build()
            .map_err(|e| OpenmrsError::Http(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            username: username.to_string(),
            password: password.to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Confirm the server is reachable and accepts the configured credentials.
    pub fn check_session(&self) -> OpenmrsResult<()> {
        let response = self.send(self.get("session"))?;
        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(OpenmrsError::Unauthenticated);
        }
        let body = read_success(response)?;
        if parse_session(&body)?.authenticated {
            Ok(())
        } else {
            Err(OpenmrsError::Unauthenticated)
        }
    }

    /// Find patients carrying exactly `identifier`, in server order.
    pub fn find_patients(&self, identifier: &str) -> OpenmrsResult<Vec<ResourceUuid>> {
        let request = self
            .get("patient")
            .query(&[("q", identifier), ("v", "custom:(uuid)")]);
        let body = read_success(self.send(request)?)?;
        let refs: Vec<UuidRef> = parse_results(&body)?;
        Ok(refs.into_iter().map(|r| r.uuid).collect())
    }

    /// UUID of the first element listed by `GET /<resource>`, if any.
    pub fn first_uuid(&self, resource: &str) -> OpenmrsResult<Option<ResourceUuid>> {
        let body = read_success(self.send(self.get(resource))?)?;
        let refs: Vec<UuidRef> = parse_results(&body)?;
        Ok(refs.into_iter().next().map(|r| r.uuid))
    }

    /// Create a person and return its UUID. Anything but `201 Created` is an error.
    pub fn create_person(&self, person: &NewPerson) -> OpenmrsResult<ResourceUuid> {
        let request = self.post("person").json(person);
        let body = read_status(self.send(request)?, StatusCode::CREATED)?;
        parse_created(&body)
    }

    /// Delete a person, purging it when `purge` is set.
    pub fn delete_person(&self, uuid: &ResourceUuid, purge: bool) -> OpenmrsResult<()> {
        let response = self.send(self.delete_person_request(uuid, purge))?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        Err(OpenmrsError::UnexpectedStatus {
            status: status.as_u16(),
            body: response.text().unwrap_or_default(),
        })
    }

    /// Create a patient for an existing person. Anything but `201 Created` is an error.
    pub fn create_patient(&self, patient: &NewPatient) -> OpenmrsResult<()> {
        let request = self.post("patient").json(patient);
        read_status(self.send(request)?, StatusCode::CREATED)?;
        Ok(())
    }

    /// Observations of `concept` recorded for `patient`.
    pub fn find_observations(
        &self,
        patient: &ResourceUuid,
        concept: &ResourceUuid,
    ) -> OpenmrsResult<Vec<ObservationSummary>> {
        let request = self.get("obs").query(&[
            ("patient", patient.as_str()),
            ("concept", concept.as_str()),
            ("v", "custom:(uuid,comment)"),
        ]);
        let body = read_success(self.send(request)?)?;
        parse_results(&body)
    }

    /// Upload a complex observation: a `json` metadata part plus a `file` binary part.
    pub fn create_observation(
        &self,
        observation: &NewObservation,
        attachment: &Attachment,
    ) -> OpenmrsResult<()> {
        let request = self.observation_request(observation, attachment)?;
        read_status(self.send(request)?, StatusCode::CREATED)?;
        Ok(())
    }

    fn delete_person_request(&self, uuid: &ResourceUuid, purge: bool) -> RequestBuilder {
        let request = self.authed(
            self.client
                .delete(self.url(&format!("person/{}", uuid.as_str()))),
        );
        if purge {
            request.query(&[("purge", "true")])
        } else {
            request
        }
    }

    fn observation_request(
        &self,
        observation: &NewObservation,
        attachment: &Attachment,
    ) -> OpenmrsResult<RequestBuilder> {
        let metadata = serde_json::to_string(observation)?;
        let json_part = Part::text(metadata)
            .mime_str("application/json")
            .map_err(|e| OpenmrsError::Http(e.to_string()))?;
        let file_part = Part::bytes(attachment.bytes.clone())
            .file_name(attachment.file_name.clone())
            .mime_str(&attachment.content_type)
            .map_err(|e| OpenmrsError::Http(e.to_string()))?;
        let form = Form::new().part("json", json_part).part("file", file_part);
        Ok(self.post("obs").multipart(form))
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request.basic_auth(&self.username, Some(&self.password))
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.authed(self.client.get(self.url(path)))
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.authed(self.client.post(self.url(path)))
    }

    fn send(&self, request: RequestBuilder) -> OpenmrsResult<Response> {
        request.send().map_err(|e| {
            if e.is_connect() {
                OpenmrsError::Connection(self.base_url.clone())
            } else {
                OpenmrsError::Http(e.to_string())
            }
        })
    }
}

/// Body of a 2xx response, or `UnexpectedStatus` with the body for logging.
fn read_success(response: Response) -> OpenmrsResult<String> {
    let status = response.status();
    let body = response
        .text()
        .map_err(|e| OpenmrsError::Http(e.to_string()))?;
    if !status.is_success() {
        return Err(OpenmrsError::UnexpectedStatus {
            status: status.as_u16(),
            body,
        });
    }
    Ok(body)
}

/// Body of a response carrying exactly `expected`.
fn read_status(response: Response, expected: StatusCode) -> OpenmrsResult<String> {
    let status = response.status();
    let body = response
        .text()
        .map_err(|e| OpenmrsError::Http(e.to_string()))?;
    if status != expected {
        tracing::debug!("OpenMRS answered {} where {} was expected", status, expected);
        return Err(OpenmrsError::UnexpectedStatus {
            status: status.as_u16(),
            body,
        });
    }
    Ok(body)
}
