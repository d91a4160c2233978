//! Document import: staged files become observations on the matching subject.
//!
//! For every file in the staging folder:
//!
//! 1. the external id is parsed from the filename,
//! 2. the subject carrying the join identifier is resolved,
//! 3. the file is downloaded and uploaded as a complex observation,
//! 4. the file is moved to the processed folder once the upload is confirmed.
//!
//! A file that fails any step stays in the staging folder and is retried by the next run. The
//! run itself only fails when the storage folders or the clinical system are unusable.
//!
//! A file whose observation already exists (a previous run uploaded it but could not move it) is
//! moved without uploading again, unless the duplicate check is disabled.

use crate::collaborators::{remote_path, ClinicalRecords, DocumentStore, RemoteFile};
use crate::config::SyncConfig;
use crate::constants::{FALLBACK_CONTENT_TYPE, IMPORT_COMMENT_PREFIX, OBS_DATETIME_FORMAT};
use crate::resolution::resolve_subject;
use crate::{SyncError, SyncResult};
use openmrs::{Attachment, NewObservation, OpenmrsError};
use std::sync::Arc;
use sync_types::{ExternalId, ResourceUuid};

/// What happened to one staged file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImportOutcome {
    /// Observation created and file moved to the processed folder.
    Imported { subject: ResourceUuid },
    /// An observation for this file already existed; the file was only moved.
    AlreadyAttached { subject: ResourceUuid },
    /// Filename does not follow the staged-file grammar.
    MalformedFilename,
    /// No subject carries the file's join identifier (or the lookup failed).
    SubjectNotFound { external_id: ExternalId },
    /// File content could not be downloaded.
    DownloadFailed,
    /// The clinical system did not answer `201 Created`; `status` is absent for transport errors.
    UploadRejected { status: Option<u16> },
    /// The observation exists but the file could not be moved out of staging.
    RelocationFailed { subject: ResourceUuid },
}

impl ImportOutcome {
    /// The file left the staging folder.
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            ImportOutcome::Imported { .. } | ImportOutcome::AlreadyAttached { .. }
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileReport {
    pub file_name: String,
    pub outcome: ImportOutcome,
}

/// Per-file outcomes of one import run, in processing order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub files: Vec<FileReport>,
}

impl ImportReport {
    pub fn succeeded(&self) -> usize {
        self.files.iter().filter(|f| f.outcome.is_success()).count()
    }

    pub fn left_staged(&self) -> usize {
        self.files.len() - self.succeeded()
    }

    pub fn outcome_for(&self, file_name: &str) -> Option<&ImportOutcome> {
        self.files
            .iter()
            .find(|f| f.file_name == file_name)
            .map(|f| &f.outcome)
    }
}

/// Document import workflow bound to its configuration and collaborators.
pub struct DocumentImport<'a> {
    cfg: Arc<SyncConfig>,
    store: &'a dyn DocumentStore,
    clinical: &'a dyn ClinicalRecords,
}

impl<'a> DocumentImport<'a> {
    pub fn new(
        cfg: Arc<SyncConfig>,
        store: &'a dyn DocumentStore,
        clinical: &'a dyn ClinicalRecords,
    ) -> Self {
        Self {
            cfg,
            store,
            clinical,
        }
    }

    /// Import every file currently in the staging folder.
    ///
    /// # Errors
    ///
    /// Returns `SyncError` (and processes nothing) if:
    /// - the staging or processed folder cannot be checked, created or listed
    /// - the clinical system is unreachable or rejects the credentials
    ///
    /// Per-file failures are never returned; they are logged and recorded in the report.
    pub fn run(&self) -> SyncResult<ImportReport> {
        let import = self.cfg.import();
        tracing::info!("=== Starting document import: storage -> clinical records ===");

        self.store.ensure_dir(import.staging_dir())?;
        self.store.ensure_dir(import.processed_dir())?;

        let files = self.store.list_files(import.staging_dir())?;
        if files.is_empty() {
            tracing::info!("No new result files to process.");
            return Ok(ImportReport::default());
        }
        tracing::info!("Found {} files to process.", files.len());

        self.clinical.check_session()?;

        let mut report = ImportReport::default();
        for file in &files {
            let outcome = self.import_file(file);
            report.files.push(FileReport {
                file_name: file.name.clone(),
                outcome,
            });
        }

        tracing::info!(
            "Document import finished: {} imported, {} left in staging.",
            report.succeeded(),
            report.left_staged()
        );
        Ok(report)
    }

    fn import_file(&self, file: &RemoteFile) -> ImportOutcome {
        let import = self.cfg.import();
        let scheme = self.cfg.identifiers();
        tracing::info!("--- Processing file: '{}' ---", file.name);

        let external_id = match scheme.external_id_from_filename(&file.name) {
            Ok(id) => id,
            Err(e) => {
                tracing::error!("{}", e);
                return ImportOutcome::MalformedFilename;
            }
        };

        let Some(subject) = resolve_subject(self.clinical, scheme, &external_id) else {
            tracing::error!(
                "Could not find the subject for file '{}'. It will be retried on the next run.",
                file.name
            );
            return ImportOutcome::SubjectNotFound { external_id };
        };

        let staged_path = remote_path(import.staging_dir(), &file.name);
        let comment = format!("{IMPORT_COMMENT_PREFIX}{}", file.name);

        if self.already_attached(&subject, &comment) {
            tracing::warn!(
                "File '{}' is already attached to subject {}; moving it without uploading again.",
                file.name,
                subject
            );
            return if self.relocate(&file.name, &staged_path) {
                ImportOutcome::AlreadyAttached { subject }
            } else {
                ImportOutcome::RelocationFailed { subject }
            };
        }

        tracing::info!("Downloading '{}' from storage...", file.name);
        let bytes = match self.store.read(&staged_path) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!("Failed to download '{}': {}", file.name, e);
                return ImportOutcome::DownloadFailed;
            }
        };

        let observation = NewObservation {
            person: subject.clone(),
            concept: import.attachment_concept().clone(),
            obs_datetime: self.obs_datetime(file),
            comment,
        };
        let attachment = Attachment {
            file_name: file.name.clone(),
            content_type: content_type(file),
            bytes,
        };

        tracing::info!("Uploading file to the clinical system for subject {}...", subject);
        if let Err(e) = self.clinical.create_observation(&observation, &attachment) {
            let status = match &e {
                SyncError::Clinical(OpenmrsError::UnexpectedStatus { status, body }) => {
                    tracing::error!(
                        "Error attaching file in the clinical system: {} - {}",
                        status,
                        body
                    );
                    Some(*status)
                }
                other => {
                    tracing::error!("Error attaching file '{}': {}", file.name, other);
                    None
                }
            };
            return ImportOutcome::UploadRejected { status };
        }

        tracing::info!("SUCCESS! File '{}' attached to subject {}.", file.name, subject);
        if self.relocate(&file.name, &staged_path) {
            ImportOutcome::Imported { subject }
        } else {
            ImportOutcome::RelocationFailed { subject }
        }
    }

    /// Whether an observation with this file's comment already exists for the subject.
    fn already_attached(&self, subject: &ResourceUuid, comment: &str) -> bool {
        let import = self.cfg.import();
        if !import.check_existing_observations() {
            return false;
        }
        match self
            .clinical
            .find_observations(subject, import.attachment_concept())
        {
            Ok(existing) => existing
                .iter()
                .any(|obs| obs.comment.as_deref() == Some(comment)),
            Err(e) => {
                tracing::warn!(
                    "Could not check existing observations for subject {}: {}",
                    subject,
                    e
                );
                false
            }
        }
    }

    /// Move a staged file to the processed folder. Returns whether it left staging.
    fn relocate(&self, file_name: &str, staged_path: &str) -> bool {
        let processed_path = remote_path(self.cfg.import().processed_dir(), file_name);
        match self.store.move_file(staged_path, &processed_path) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(
                    "Observation created but '{}' could not be moved to {}: {}",
                    file_name,
                    processed_path,
                    e
                );
                false
            }
        }
    }

    fn obs_datetime(&self, file: &RemoteFile) -> String {
        file.last_modified
            .map(|t| t.format(OBS_DATETIME_FORMAT).to_string())
            .unwrap_or_else(|| self.cfg.import().default_obs_datetime().to_string())
    }
}

/// Store-reported type, else a guess from the extension, else `application/octet-stream`.
fn content_type(file: &RemoteFile) -> String {
    file.content_type
        .clone()
        .or_else(|| {
            mime_guess::from_path(&file.name)
                .first_raw()
                .map(str::to_string)
        })
        .unwrap_or_else(|| FALLBACK_CONTENT_TYPE.to_string())
}
