//! Subject provisioning: every individual CRM contact gets a clinical subject.
//!
//! The join identifier `<PREFIX>-<contact id>` is the only correlation between the two systems,
//! so a contact whose identifier already resolves is skipped and re-running the workflow is safe.
//!
//! Creating a subject takes two requests (person, then patient). When the second is rejected the
//! person is deleted again unless rollback is disabled, so a failed run does not leave orphan
//! persons behind.

use crate::collaborators::{ClinicalRecords, Contact, ContactDirectory};
use crate::config::SyncConfig;
use crate::constants::{
    EMPTY_FAMILY_NAME, IDENTIFIER_TYPE_RESOURCE, LOCATION_RESOURCE, UNKNOWN_GIVEN_NAME,
};
use crate::resolution::lookup_subject;
use crate::{SyncError, SyncResult};
use openmrs::{NewPatient, NewPatientIdentifier, NewPerson, PersonName};
use std::sync::Arc;
use sync_types::{ExternalId, ResourceUuid};

/// What happened to one CRM contact.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProvisionOutcome {
    /// Person and subject were created.
    Created { person: ResourceUuid },
    /// A subject with this join identifier already exists.
    AlreadyExists { subject: ResourceUuid },
    /// Companies and excluded names are never provisioned.
    NotAnIndividual,
    /// The existence check failed, so nothing was created.
    LookupFailed,
    /// The person could not be created.
    PersonRejected,
    /// The person was created but the subject was not.
    SubjectRejected {
        person: ResourceUuid,
        person_rolled_back: bool,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContactReport {
    pub contact_id: ExternalId,
    pub name: String,
    pub outcome: ProvisionOutcome,
}

/// Per-contact outcomes of one provisioning run, in CRM order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProvisionReport {
    pub contacts: Vec<ContactReport>,
}

impl ProvisionReport {
    pub fn created(&self) -> usize {
        self.count(|o| matches!(o, ProvisionOutcome::Created { .. }))
    }

    pub fn already_existing(&self) -> usize {
        self.count(|o| matches!(o, ProvisionOutcome::AlreadyExists { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| {
            matches!(
                o,
                ProvisionOutcome::LookupFailed
                    | ProvisionOutcome::PersonRejected
                    | ProvisionOutcome::SubjectRejected { .. }
            )
        })
    }

    pub fn outcome_for(&self, contact_id: &ExternalId) -> Option<&ProvisionOutcome> {
        self.contacts
            .iter()
            .find(|c| &c.contact_id == contact_id)
            .map(|c| &c.outcome)
    }

    fn count(&self, predicate: impl Fn(&ProvisionOutcome) -> bool) -> usize {
        self.contacts.iter().filter(|c| predicate(&c.outcome)).count()
    }
}

/// Split a CRM display name into an OpenMRS person name.
///
/// The first whitespace-separated token is the given name and the rest, joined by single spaces,
/// is the family name. OpenMRS rejects an empty family name, so a single token gets `" "`.
pub fn split_display_name(display_name: &str) -> PersonName {
    let mut tokens = display_name.split_whitespace();
    let given_name = tokens.next().unwrap_or(UNKNOWN_GIVEN_NAME).to_string();
    let family_name = tokens.collect::<Vec<_>>().join(" ");
    PersonName {
        given_name,
        family_name: if family_name.is_empty() {
            EMPTY_FAMILY_NAME.to_string()
        } else {
            family_name
        },
    }
}

/// Location and identifier type shared by every subject created in one run.
struct RunDefaults {
    location: ResourceUuid,
    identifier_type: ResourceUuid,
}

/// Subject provisioning workflow bound to its configuration and collaborators.
pub struct SubjectProvisioning<'a> {
    cfg: Arc<SyncConfig>,
    directory: &'a dyn ContactDirectory,
    clinical: &'a dyn ClinicalRecords,
}

impl<'a> SubjectProvisioning<'a> {
    pub fn new(
        cfg: Arc<SyncConfig>,
        directory: &'a dyn ContactDirectory,
        clinical: &'a dyn ClinicalRecords,
    ) -> Self {
        Self {
            cfg,
            directory,
            clinical,
        }
    }

    /// Provision a subject for every individual contact that lacks one.
    ///
    /// # Errors
    ///
    /// Returns `SyncError` (and creates nothing) if the contacts cannot be listed, the clinical
    /// session is not authenticated, or the default location or identifier type is missing.
    pub fn run(&self) -> SyncResult<ProvisionReport> {
        tracing::info!("=== Starting subject provisioning: CRM -> clinical records ===");

        let excluded = self.cfg.provision().excluded_contact_names();
        let contacts = self.directory.list_contacts(excluded)?;
        if contacts.is_empty() {
            tracing::warn!("No individual contacts found in the CRM.");
            return Ok(ProvisionReport::default());
        }
        tracing::info!("Found {} contacts to check.", contacts.len());

        self.clinical.check_session()?;
        let defaults = self.run_defaults()?;

        let mut report = ProvisionReport::default();
        for contact in &contacts {
            let outcome = self.provision_contact(contact, &defaults);
            report.contacts.push(ContactReport {
                contact_id: contact.id.clone(),
                name: contact.name.clone(),
                outcome,
            });
        }

        tracing::info!(
            "Subject provisioning finished: {} created, {} already existed, {} failed.",
            report.created(),
            report.already_existing(),
            report.failed()
        );
        Ok(report)
    }

    fn run_defaults(&self) -> SyncResult<RunDefaults> {
        Ok(RunDefaults {
            location: self.required_resource(LOCATION_RESOURCE)?,
            identifier_type: self.required_resource(IDENTIFIER_TYPE_RESOURCE)?,
        })
    }

    fn required_resource(&self, resource: &str) -> SyncResult<ResourceUuid> {
        match self.clinical.first_resource_uuid(resource) {
            Ok(Some(uuid)) => Ok(uuid),
            Ok(None) => Err(SyncError::MissingPrerequisite(format!(
                "no '{resource}' is defined in the clinical system"
            ))),
            Err(e) => Err(SyncError::MissingPrerequisite(format!(
                "could not read '{resource}': {e}"
            ))),
        }
    }

    fn is_individual(&self, contact: &Contact) -> bool {
        !contact.is_company
            && !self
                .cfg
                .provision()
                .excluded_contact_names()
                .iter()
                .any(|name| name == contact.name.trim())
    }

    fn provision_contact(&self, contact: &Contact, defaults: &RunDefaults) -> ProvisionOutcome {
        tracing::info!("--- Processing contact: {} (ID: {}) ---", contact.name, contact.id);

        if !self.is_individual(contact) {
            tracing::info!("Contact '{}' is not an individual; skipping.", contact.name);
            return ProvisionOutcome::NotAnIndividual;
        }

        let scheme = self.cfg.identifiers();
        let identifier = scheme.join_identifier(&contact.id);
        match lookup_subject(self.clinical, scheme, &contact.id) {
            Ok(Some(subject)) => {
                tracing::warn!(
                    "Subject with identifier {} already exists ({}). Skipping.",
                    identifier,
                    subject
                );
                return ProvisionOutcome::AlreadyExists { subject };
            }
            Ok(None) => {}
            Err(e) => {
                tracing::error!(
                    "Could not check whether {} already exists: {}. Skipping.",
                    identifier,
                    e
                );
                return ProvisionOutcome::LookupFailed;
            }
        }

        let provision = self.cfg.provision();
        let person = NewPerson {
            names: vec![split_display_name(&contact.name)],
            gender: provision.placeholder_gender().to_string(),
            birthdate: provision.placeholder_birthdate().to_string(),
        };
        let person_uuid = match self.clinical.create_person(&person) {
            Ok(uuid) => uuid,
            Err(e) => {
                tracing::error!("Error creating person for '{}': {}", contact.name, e);
                return ProvisionOutcome::PersonRejected;
            }
        };
        tracing::info!("Person created with UUID: {}", person_uuid);

        let subject = NewPatient {
            person: person_uuid.clone(),
            identifiers: vec![NewPatientIdentifier {
                identifier: identifier.clone(),
                identifier_type: defaults.identifier_type.clone(),
                location: defaults.location.clone(),
                preferred: true,
            }],
        };
        match self.clinical.create_subject(&subject) {
            Ok(()) => {
                tracing::info!(
                    "SUCCESS! Subject '{}' created with identifier {}.",
                    contact.name,
                    identifier
                );
                ProvisionOutcome::Created {
                    person: person_uuid,
                }
            }
            Err(e) => {
                tracing::error!("Error creating subject for '{}': {}", contact.name, e);
                let person_rolled_back = self.roll_back_person(&person_uuid);
                ProvisionOutcome::SubjectRejected {
                    person: person_uuid,
                    person_rolled_back,
                }
            }
        }
    }

    /// Delete a person left without a subject. Returns whether the person is gone.
    fn roll_back_person(&self, person: &ResourceUuid) -> bool {
        if !self.cfg.provision().rollback_orphan_person() {
            tracing::warn!("Person {} was left without a subject.", person);
            return false;
        }
        match self.clinical.delete_person(person) {
            Ok(()) => {
                tracing::info!("Orphan person {} deleted.", person);
                true
            }
            Err(e) => {
                tracing::error!("Could not delete orphan person {}: {}", person, e);
                false
            }
        }
    }
}
