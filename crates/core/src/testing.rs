//! In-memory collaborator doubles for workflow tests.
//!
//! The doubles record every call they receive so tests can assert on what a workflow did
//! (which files moved, which subjects were created) instead of on log output.

use crate::collaborators::{ClinicalRecords, Contact, ContactDirectory, DocumentStore, RemoteFile};
use crate::config::{ImportConfig, ProvisionConfig, SyncConfig};
use crate::constants::*;
use crate::identifier::IdentifierScheme;
use crate::{SyncError, SyncResult};
use chrono::{DateTime, FixedOffset};
use openmrs::{
    Attachment, NewObservation, NewPatient, NewPerson, ObservationSummary, OpenmrsError,
};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use sync_types::{ExternalId, ResourceUuid};
use sync_webdav::WebdavError;

pub(crate) fn uuid(value: &str) -> ResourceUuid {
    ResourceUuid::new(value).expect("valid uuid")
}

/// Default configuration with the two safety switches set explicitly.
pub(crate) fn sync_config(check_existing: bool, rollback_orphans: bool) -> Arc<SyncConfig> {
    let identifiers = IdentifierScheme::new(DEFAULT_EXTERNAL_ID_PREFIX).expect("valid prefix");
    let import = ImportConfig::new(
        DEFAULT_STAGING_DIR,
        DEFAULT_PROCESSED_DIR,
        DEFAULT_ATTACHMENT_CONCEPT_UUID,
        DEFAULT_OBS_DATETIME,
        check_existing,
    )
    .expect("valid import config");
    let provision = ProvisionConfig::new(
        DEFAULT_EXCLUDED_CONTACT_NAMES
            .iter()
            .map(|name| name.to_string())
            .collect(),
        DEFAULT_PLACEHOLDER_GENDER,
        DEFAULT_PLACEHOLDER_BIRTHDATE,
        rollback_orphans,
    )
    .expect("valid provision config");
    Arc::new(SyncConfig::new(identifiers, import, provision))
}

fn rejected(status: u16) -> SyncError {
    SyncError::Clinical(OpenmrsError::UnexpectedStatus {
        status,
        body: format!("{{\"error\":{{\"message\":\"rejected with {status}\"}}}}"),
    })
}

// ============================================================================
// CLINICAL RECORDS
// ============================================================================

#[derive(Default)]
pub(crate) struct InMemoryClinical {
    subjects: RefCell<Vec<(String, ResourceUuid)>>,
    resources: HashMap<String, ResourceUuid>,
    searched: RefCell<Vec<String>>,
    persons: RefCell<Vec<NewPerson>>,
    deleted_persons: RefCell<Vec<ResourceUuid>>,
    subject_requests: RefCell<Vec<NewPatient>>,
    observations: RefCell<Vec<(ResourceUuid, NewObservation, Attachment)>>,
    observation_attempts: Cell<usize>,
    next_id: Cell<u32>,
    unauthenticated: bool,
    search_fails: bool,
    observation_lookup_fails: bool,
    delete_fails: bool,
    person_status: Option<u16>,
    subject_status: Option<u16>,
    observation_status: Option<u16>,
}

impl InMemoryClinical {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_subject(self, identifier: &str, subject: &str) -> Self {
        self.subjects
            .borrow_mut()
            .push((identifier.to_string(), uuid(subject)));
        self
    }

    pub(crate) fn with_resource(mut self, resource: &str, first: &str) -> Self {
        self.resources.insert(resource.to_string(), uuid(first));
        self
    }

    /// Location and identifier type, as a freshly installed server has.
    pub(crate) fn with_defaults(self) -> Self {
        self.with_resource(LOCATION_RESOURCE, "loc-1")
            .with_resource(IDENTIFIER_TYPE_RESOURCE, "idtype-1")
    }

    pub(crate) fn with_observation(self, subject: &str, concept: &str, comment: &str) -> Self {
        let observation = NewObservation {
            person: uuid(subject),
            concept: uuid(concept),
            obs_datetime: DEFAULT_OBS_DATETIME.to_string(),
            comment: comment.to_string(),
        };
        let attachment = Attachment {
            file_name: "earlier.pdf".into(),
            content_type: "application/pdf".into(),
            bytes: vec![],
        };
        let id = self.next_uuid("obs");
        self.observations
            .borrow_mut()
            .push((id, observation, attachment));
        self
    }

    pub(crate) fn unauthenticated(mut self) -> Self {
        self.unauthenticated = true;
        self
    }

    pub(crate) fn failing_search(mut self) -> Self {
        self.search_fails = true;
        self
    }

    pub(crate) fn failing_observation_lookup(mut self) -> Self {
        self.observation_lookup_fails = true;
        self
    }

    pub(crate) fn failing_person_delete(mut self) -> Self {
        self.delete_fails = true;
        self
    }

    pub(crate) fn rejecting_persons(mut self, status: u16) -> Self {
        self.person_status = Some(status);
        self
    }

    pub(crate) fn rejecting_subjects(mut self, status: u16) -> Self {
        self.subject_status = Some(status);
        self
    }

    pub(crate) fn rejecting_observations(mut self, status: u16) -> Self {
        self.observation_status = Some(status);
        self
    }

    pub(crate) fn searched_identifiers(&self) -> Vec<String> {
        self.searched.borrow().clone()
    }

    pub(crate) fn created_persons(&self) -> Vec<NewPerson> {
        self.persons.borrow().clone()
    }

    pub(crate) fn deleted_persons(&self) -> Vec<ResourceUuid> {
        self.deleted_persons.borrow().clone()
    }

    pub(crate) fn subject_requests(&self) -> Vec<NewPatient> {
        self.subject_requests.borrow().clone()
    }

    /// Observations created through the workflow (seeded ones excluded).
    pub(crate) fn created_observations(&self) -> Vec<(NewObservation, Attachment)> {
        self.observations
            .borrow()
            .iter()
            .filter(|(_, _, attachment)| attachment.file_name != "earlier.pdf")
            .map(|(_, observation, attachment)| (observation.clone(), attachment.clone()))
            .collect()
    }

    pub(crate) fn observation_attempts(&self) -> usize {
        self.observation_attempts.get()
    }

    fn next_uuid(&self, kind: &str) -> ResourceUuid {
        let n = self.next_id.get() + 1;
        self.next_id.set(n);
        uuid(&format!("{kind}-{n}"))
    }
}

impl ClinicalRecords for InMemoryClinical {
    fn check_session(&self) -> SyncResult<()> {
        if self.unauthenticated {
            return Err(SyncError::Clinical(OpenmrsError::Unauthenticated));
        }
        Ok(())
    }

    fn find_subjects(&self, identifier: &str) -> SyncResult<Vec<ResourceUuid>> {
        self.searched.borrow_mut().push(identifier.to_string());
        if self.search_fails {
            return Err(SyncError::Clinical(OpenmrsError::Connection(
                "http://openmrs.test".into(),
            )));
        }
        Ok(self
            .subjects
            .borrow()
            .iter()
            .filter(|(candidate, _)| candidate == identifier)
            .map(|(_, subject)| subject.clone())
            .collect())
    }

    fn first_resource_uuid(&self, resource: &str) -> SyncResult<Option<ResourceUuid>> {
        Ok(self.resources.get(resource).cloned())
    }

    fn create_person(&self, person: &NewPerson) -> SyncResult<ResourceUuid> {
        if let Some(status) = self.person_status {
            return Err(rejected(status));
        }
        self.persons.borrow_mut().push(person.clone());
        Ok(self.next_uuid("person"))
    }

    fn delete_person(&self, person: &ResourceUuid) -> SyncResult<()> {
        if self.delete_fails {
            return Err(rejected(500));
        }
        self.deleted_persons.borrow_mut().push(person.clone());
        Ok(())
    }

    fn create_subject(&self, subject: &NewPatient) -> SyncResult<()> {
        self.subject_requests.borrow_mut().push(subject.clone());
        if let Some(status) = self.subject_status {
            return Err(rejected(status));
        }
        let created = self.next_uuid("patient");
        let mut subjects = self.subjects.borrow_mut();
        for identifier in &subject.identifiers {
            subjects.push((identifier.identifier.clone(), created.clone()));
        }
        Ok(())
    }

    fn find_observations(
        &self,
        subject: &ResourceUuid,
        concept: &ResourceUuid,
    ) -> SyncResult<Vec<ObservationSummary>> {
        if self.observation_lookup_fails {
            return Err(rejected(500));
        }
        Ok(self
            .observations
            .borrow()
            .iter()
            .filter(|(_, obs, _)| &obs.person == subject && &obs.concept == concept)
            .map(|(id, obs, _)| ObservationSummary {
                uuid: id.clone(),
                comment: Some(obs.comment.clone()),
            })
            .collect())
    }

    fn create_observation(
        &self,
        observation: &NewObservation,
        attachment: &Attachment,
    ) -> SyncResult<()> {
        self.observation_attempts
            .set(self.observation_attempts.get() + 1);
        if let Some(status) = self.observation_status {
            return Err(rejected(status));
        }
        let id = self.next_uuid("obs");
        self.observations
            .borrow_mut()
            .push((id, observation.clone(), attachment.clone()));
        Ok(())
    }
}

// ============================================================================
// DOCUMENT STORE
// ============================================================================

#[derive(Clone)]
struct StoredFile {
    file: RemoteFile,
    bytes: Vec<u8>,
}

#[derive(Default)]
pub(crate) struct InMemoryStore {
    dirs: RefCell<BTreeMap<String, Vec<StoredFile>>>,
    created_dirs: RefCell<Vec<String>>,
    unreadable: HashSet<String>,
    unreachable: bool,
    move_fails: bool,
}

fn dir_key(dir: &str) -> String {
    dir.trim_end_matches('/').to_string()
}

impl InMemoryStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Existing folder without files.
    pub(crate) fn with_dir(self, dir: &str) -> Self {
        self.dirs.borrow_mut().entry(dir_key(dir)).or_default();
        self
    }

    pub(crate) fn with_file(self, dir: &str, name: &str, bytes: &[u8]) -> Self {
        self.with_stored(dir, name, bytes, None, None)
    }

    pub(crate) fn with_modified_file(
        self,
        dir: &str,
        name: &str,
        bytes: &[u8],
        last_modified: DateTime<FixedOffset>,
        content_type: &str,
    ) -> Self {
        self.with_stored(
            dir,
            name,
            bytes,
            Some(last_modified),
            Some(content_type.to_string()),
        )
    }

    fn with_stored(
        self,
        dir: &str,
        name: &str,
        bytes: &[u8],
        last_modified: Option<DateTime<FixedOffset>>,
        content_type: Option<String>,
    ) -> Self {
        self.dirs
            .borrow_mut()
            .entry(dir_key(dir))
            .or_default()
            .push(StoredFile {
                file: RemoteFile {
                    name: name.to_string(),
                    last_modified,
                    content_type,
                },
                bytes: bytes.to_vec(),
            });
        self
    }

    pub(crate) fn unreadable(mut self, name: &str) -> Self {
        self.unreadable.insert(name.to_string());
        self
    }

    pub(crate) fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    pub(crate) fn failing_moves(mut self) -> Self {
        self.move_fails = true;
        self
    }

    pub(crate) fn file_names(&self, dir: &str) -> Vec<String> {
        self.dirs
            .borrow()
            .get(&dir_key(dir))
            .map(|files| files.iter().map(|f| f.file.name.clone()).collect())
            .unwrap_or_default()
    }

    pub(crate) fn created_dirs(&self) -> Vec<String> {
        self.created_dirs.borrow().clone()
    }

    fn connection_check(&self) -> SyncResult<()> {
        if self.unreachable {
            return Err(SyncError::Storage(WebdavError::Connection(
                "http://nextcloud.test".into(),
            )));
        }
        Ok(())
    }

    fn split(path: &str) -> (String, String) {
        match path.rsplit_once('/') {
            Some((dir, name)) => (dir_key(dir), name.to_string()),
            None => (String::new(), path.to_string()),
        }
    }
}

impl DocumentStore for InMemoryStore {
    fn ensure_dir(&self, dir: &str) -> SyncResult<()> {
        self.connection_check()?;
        let mut dirs = self.dirs.borrow_mut();
        if !dirs.contains_key(&dir_key(dir)) {
            dirs.insert(dir_key(dir), Vec::new());
            self.created_dirs.borrow_mut().push(dir_key(dir));
        }
        Ok(())
    }

    fn list_files(&self, dir: &str) -> SyncResult<Vec<RemoteFile>> {
        self.connection_check()?;
        self.dirs
            .borrow()
            .get(&dir_key(dir))
            .map(|files| files.iter().map(|f| f.file.clone()).collect())
            .ok_or_else(|| SyncError::Storage(WebdavError::NotFound(dir.to_string())))
    }

    fn read(&self, path: &str) -> SyncResult<Vec<u8>> {
        self.connection_check()?;
        let (dir, name) = Self::split(path);
        if self.unreadable.contains(&name) {
            return Err(SyncError::Storage(WebdavError::UnexpectedStatus {
                method: "GET",
                path: path.to_string(),
                status: 500,
            }));
        }
        self.dirs
            .borrow()
            .get(&dir)
            .and_then(|files| files.iter().find(|f| f.file.name == name))
            .map(|f| f.bytes.clone())
            .ok_or_else(|| SyncError::Storage(WebdavError::NotFound(path.to_string())))
    }

    fn move_file(&self, from: &str, to: &str) -> SyncResult<()> {
        self.connection_check()?;
        if self.move_fails {
            return Err(SyncError::Storage(WebdavError::UnexpectedStatus {
                method: "MOVE",
                path: from.to_string(),
                status: 412,
            }));
        }
        let (from_dir, from_name) = Self::split(from);
        let (to_dir, to_name) = Self::split(to);
        let mut dirs = self.dirs.borrow_mut();
        let source = dirs
            .get_mut(&from_dir)
            .ok_or_else(|| SyncError::Storage(WebdavError::NotFound(from.to_string())))?;
        let index = source
            .iter()
            .position(|f| f.file.name == from_name)
            .ok_or_else(|| SyncError::Storage(WebdavError::NotFound(from.to_string())))?;
        let mut stored = source.remove(index);
        stored.file.name = to_name;
        dirs.entry(to_dir).or_default().push(stored);
        Ok(())
    }
}

// ============================================================================
// CONTACT DIRECTORY
// ============================================================================

/// Returns its contacts as-is: no server-side filtering is simulated, so the workflow's own
/// filtering is exercised.
#[derive(Default)]
pub(crate) struct InMemoryDirectory {
    contacts: Vec<Contact>,
    fails: bool,
    requested_exclusions: RefCell<Vec<Vec<String>>>,
}

impl InMemoryDirectory {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_contact(mut self, id: u64, name: &str) -> Self {
        self.contacts.push(Contact {
            id: ExternalId::from(id),
            name: name.to_string(),
            is_company: false,
        });
        self
    }

    pub(crate) fn with_company(mut self, id: u64, name: &str) -> Self {
        self.contacts.push(Contact {
            id: ExternalId::from(id),
            name: name.to_string(),
            is_company: true,
        });
        self
    }

    pub(crate) fn failing(mut self) -> Self {
        self.fails = true;
        self
    }

    pub(crate) fn requested_exclusions(&self) -> Vec<Vec<String>> {
        self.requested_exclusions.borrow().clone()
    }
}

impl ContactDirectory for InMemoryDirectory {
    fn list_contacts(&self, excluded_names: &[String]) -> SyncResult<Vec<Contact>> {
        self.requested_exclusions
            .borrow_mut()
            .push(excluded_names.to_vec());
        if self.fails {
            return Err(SyncError::Crm(odoo::OdooError::Connection(
                "http://odoo.test/jsonrpc".into(),
            )));
        }
        Ok(self.contacts.clone())
    }
}
