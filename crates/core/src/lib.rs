//! # Sync Core
//!
//! Workflows that keep the clinic's CRM, file storage and clinical records system in step:
//! - **Document import**: staged result files become complex observations on the matching subject
//! - **Subject provisioning**: individual CRM contacts become clinical subjects
//!
//! Both workflows correlate records only through the join identifier `<PREFIX>-<external_id>`
//! (see [`IdentifierScheme`]) and reach the external systems through the traits in
//! [`collaborators`].
//!
//! **No process concerns**: reading the environment, initialising logging and choosing which
//! workflow to run belong in the `clinic-sync` binary.

pub mod collaborators;
pub mod config;
pub mod constants;
pub mod error;
pub mod identifier;
pub mod import;
pub mod provision;
pub mod resolution;

#[cfg(test)]
pub(crate) mod testing;

pub use collaborators::{ClinicalRecords, Contact, ContactDirectory, DocumentStore, RemoteFile};
pub use config::{
    ConnectionConfig, Credentials, CrmEndpoint, ImportConfig, ProvisionConfig, ServiceEndpoint,
    SyncConfig,
};
pub use error::{SyncError, SyncResult};
pub use identifier::IdentifierScheme;
pub use import::{DocumentImport, FileReport, ImportOutcome, ImportReport};
pub use provision::{
    split_display_name, ContactReport, ProvisionOutcome, ProvisionReport, SubjectProvisioning,
};
pub use resolution::{lookup_subject, resolve_subject};
pub use sync_types::{ExternalId, NonEmptyText, ResourceUuid};
