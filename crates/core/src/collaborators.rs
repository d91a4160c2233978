//! Seams between the workflows and the external systems.
//!
//! Each workflow talks to its collaborators only through these traits. The production
//! implementations below delegate to the `openmrs`, `odoo` and `sync_webdav` clients; tests
//! substitute in-memory doubles.

use crate::SyncResult;
use chrono::{DateTime, FixedOffset};
use odoo::OdooClient;
use openmrs::{
    Attachment, NewObservation, NewPatient, NewPerson, ObservationSummary, OpenmrsClient,
};
use sync_types::{ExternalId, ResourceUuid};
use sync_webdav::WebdavClient;

/// A file listed in a storage folder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteFile {
    pub name: String,
    pub last_modified: Option<DateTime<FixedOffset>>,
    pub content_type: Option<String>,
}

/// A CRM contact as read for provisioning.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Contact {
    pub id: ExternalId,
    pub name: String,
    pub is_company: bool,
}

/// File storage holding the staging and processed folders.
pub trait DocumentStore {
    /// Create `dir` unless it already exists.
    fn ensure_dir(&self, dir: &str) -> SyncResult<()>;
    /// Plain files directly inside `dir`; sub-folders are not returned.
    fn list_files(&self, dir: &str) -> SyncResult<Vec<RemoteFile>>;
    fn read(&self, path: &str) -> SyncResult<Vec<u8>>;
    fn move_file(&self, from: &str, to: &str) -> SyncResult<()>;
}

/// Read-only CRM contact listing.
pub trait ContactDirectory {
    /// Individual contacts, excluding the given display names.
    fn list_contacts(&self, excluded_names: &[String]) -> SyncResult<Vec<Contact>>;
}

/// The clinical records system.
pub trait ClinicalRecords {
    /// Fails when the system is unreachable or rejects the credentials.
    fn check_session(&self) -> SyncResult<()>;
    /// Subjects carrying exactly `identifier`, in server order.
    fn find_subjects(&self, identifier: &str) -> SyncResult<Vec<ResourceUuid>>;
    /// First resource listed under `resource`, used for run-wide defaults.
    fn first_resource_uuid(&self, resource: &str) -> SyncResult<Option<ResourceUuid>>;
    fn create_person(&self, person: &NewPerson) -> SyncResult<ResourceUuid>;
    fn delete_person(&self, person: &ResourceUuid) -> SyncResult<()>;
    fn create_subject(&self, subject: &NewPatient) -> SyncResult<()>;
    fn find_observations(
        &self,
        subject: &ResourceUuid,
        concept: &ResourceUuid,
    ) -> SyncResult<Vec<ObservationSummary>>;
    fn create_observation(
        &self,
        observation: &NewObservation,
        attachment: &Attachment,
    ) -> SyncResult<()>;
}

/// `dir/name` with exactly one separator.
pub fn remote_path(dir: &str, name: &str) -> String {
    format!("{}/{}", dir.trim_end_matches('/'), name.trim_start_matches('/'))
}

impl DocumentStore for WebdavClient {
    fn ensure_dir(&self, dir: &str) -> SyncResult<()> {
        Ok(WebdavClient::ensure_dir(self, dir)?)
    }

    fn list_files(&self, dir: &str) -> SyncResult<Vec<RemoteFile>> {
        Ok(WebdavClient::list_files(self, dir)?
            .into_iter()
            .map(|entry| RemoteFile {
                name: entry.name,
                last_modified: entry.last_modified,
                content_type: entry.content_type,
            })
            .collect())
    }

    fn read(&self, path: &str) -> SyncResult<Vec<u8>> {
        Ok(WebdavClient::read(self, path)?)
    }

    fn move_file(&self, from: &str, to: &str) -> SyncResult<()> {
        Ok(WebdavClient::move_file(self, from, to)?)
    }
}

impl ContactDirectory for OdooClient {
    fn list_contacts(&self, excluded_names: &[String]) -> SyncResult<Vec<Contact>> {
        Ok(self
            .list_individuals(excluded_names)?
            .into_iter()
            .map(|partner| Contact {
                id: ExternalId::from(partner.id),
                name: partner.name,
                is_company: partner.is_company,
            })
            .collect())
    }
}

impl ClinicalRecords for OpenmrsClient {
    fn check_session(&self) -> SyncResult<()> {
        Ok(OpenmrsClient::check_session(self)?)
    }

    fn find_subjects(&self, identifier: &str) -> SyncResult<Vec<ResourceUuid>> {
        Ok(self.find_patients(identifier)?)
    }

    fn first_resource_uuid(&self, resource: &str) -> SyncResult<Option<ResourceUuid>> {
        Ok(self.first_uuid(resource)?)
    }

    fn create_person(&self, person: &NewPerson) -> SyncResult<ResourceUuid> {
        Ok(OpenmrsClient::create_person(self, person)?)
    }

    fn delete_person(&self, person: &ResourceUuid) -> SyncResult<()> {
        Ok(OpenmrsClient::delete_person(self, person, true)?)
    }

    fn create_subject(&self, subject: &NewPatient) -> SyncResult<()> {
        Ok(self.create_patient(subject)?)
    }

    fn find_observations(
        &self,
        subject: &ResourceUuid,
        concept: &ResourceUuid,
    ) -> SyncResult<Vec<ObservationSummary>> {
        Ok(OpenmrsClient::find_observations(self, subject, concept)?)
    }

    fn create_observation(
        &self,
        observation: &NewObservation,
        attachment: &Attachment,
    ) -> SyncResult<()> {
        Ok(OpenmrsClient::create_observation(self, observation, attachment)?)
    }
}
