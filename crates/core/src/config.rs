//! Runtime configuration.
//!
//! Everything here is resolved once at process startup and then passed into the workflows.
//! Nothing in this crate reads environment variables; the binary does that and hands the values
//! to the constructors below, which validate them eagerly so a bad setting fails the run before
//! any record is touched.

use crate::constants::{ACCEPTED_GENDERS, OBS_DATETIME_FORMAT};
use crate::identifier::IdentifierScheme;
use crate::{SyncError, SyncResult};
use chrono::{DateTime, NaiveDate};
use sync_types::{NonEmptyText, ResourceUuid};

/// Username and password for one collaborator. The password never appears in `Debug` output.
#[derive(Clone)]
pub struct Credentials {
    username: NonEmptyText,
    password: String,
}

impl Credentials {
    pub fn new(username: &str, password: String) -> SyncResult<Self> {
        let username = NonEmptyText::new(username)
            .map_err(|_| SyncError::InvalidConfig("username cannot be empty".into()))?;
        if password.is_empty() {
            return Err(SyncError::InvalidConfig(format!(
                "password for '{username}' cannot be empty"
            )));
        }
        Ok(Self { username, password })
    }

    pub fn username(&self) -> &str {
        self.username.as_str()
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Base URL plus credentials of an HTTP collaborator.
#[derive(Clone, Debug)]
pub struct ServiceEndpoint {
    url: String,
    credentials: Credentials,
}

impl ServiceEndpoint {
    pub fn new(url: &str, credentials: Credentials) -> SyncResult<Self> {
        let url = url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(SyncError::InvalidConfig(format!(
                "endpoint URL must start with http:// or https://: '{url}'"
            )));
        }
        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }
}

/// Odoo server root (the JSON-RPC path is appended by the client) and database.
#[derive(Clone, Debug)]
pub struct CrmEndpoint {
    pub server: ServiceEndpoint,
    pub database: NonEmptyText,
}

/// Where and how to reach the collaborators of one run.
///
/// Every run talks to the clinical system. Storage is only configured for document import and
/// the CRM only for subject provisioning, so neither job needs the other's credentials.
#[derive(Clone, Debug)]
pub struct ConnectionConfig {
    /// OpenMRS REST root (`.../openmrs/ws/rest/v1`)
    pub clinical: ServiceEndpoint,
    /// WebDAV root collection of the storage user
    pub storage: Option<ServiceEndpoint>,
    pub crm: Option<CrmEndpoint>,
}

/// Settings of the document import workflow.
#[derive(Clone, Debug)]
pub struct ImportConfig {
    staging_dir: NonEmptyText,
    processed_dir: NonEmptyText,
    attachment_concept: ResourceUuid,
    default_obs_datetime: String,
    check_existing_observations: bool,
}

impl ImportConfig {
    /// Create a new `ImportConfig`.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::InvalidConfig` if:
    /// - either folder is empty, or both name the same folder
    /// - the concept UUID is empty
    /// - `default_obs_datetime` does not follow [`OBS_DATETIME_FORMAT`]
    pub fn new(
        staging_dir: &str,
        processed_dir: &str,
        attachment_concept: &str,
        default_obs_datetime: &str,
        check_existing_observations: bool,
    ) -> SyncResult<Self> {
        let staging_dir = folder(staging_dir, "staging")?;
        let processed_dir = folder(processed_dir, "processed")?;
        if normalise_folder(staging_dir.as_str()) == normalise_folder(processed_dir.as_str()) {
            return Err(SyncError::InvalidConfig(
                "staging and processed folders must be different".into(),
            ));
        }

        let attachment_concept = ResourceUuid::new(attachment_concept)
            .map_err(|_| SyncError::InvalidConfig("attachment concept cannot be empty".into()))?;

        DateTime::parse_from_str(default_obs_datetime, OBS_DATETIME_FORMAT).map_err(|e| {
            SyncError::InvalidConfig(format!(
                "default observation datetime '{default_obs_datetime}' is invalid: {e}"
            ))
        })?;

        Ok(Self {
            staging_dir,
            processed_dir,
            attachment_concept,
            default_obs_datetime: default_obs_datetime.to_string(),
            check_existing_observations,
        })
    }

    pub fn staging_dir(&self) -> &str {
        self.staging_dir.as_str()
    }

    pub fn processed_dir(&self) -> &str {
        self.processed_dir.as_str()
    }

    pub fn attachment_concept(&self) -> &ResourceUuid {
        &self.attachment_concept
    }

    pub fn default_obs_datetime(&self) -> &str {
        &self.default_obs_datetime
    }

    pub fn check_existing_observations(&self) -> bool {
        self.check_existing_observations
    }
}

/// Settings of the subject provisioning workflow.
#[derive(Clone, Debug)]
pub struct ProvisionConfig {
    excluded_contact_names: Vec<String>,
    placeholder_gender: String,
    placeholder_birthdate: String,
    rollback_orphan_person: bool,
}

impl ProvisionConfig {
    /// Create a new `ProvisionConfig`.
    ///
    /// Blank excluded names are dropped. The gender must be one OpenMRS accepts and the
    /// birthdate must be `YYYY-MM-DD`.
    pub fn new(
        excluded_contact_names: Vec<String>,
        placeholder_gender: &str,
        placeholder_birthdate: &str,
        rollback_orphan_person: bool,
    ) -> SyncResult<Self> {
        let excluded_contact_names = excluded_contact_names
            .into_iter()
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect();

        let placeholder_gender = placeholder_gender.trim().to_uppercase();
        if !ACCEPTED_GENDERS.contains(&placeholder_gender.as_str()) {
            return Err(SyncError::InvalidConfig(format!(
                "placeholder gender '{placeholder_gender}' must be one of {ACCEPTED_GENDERS:?}"
            )));
        }

        NaiveDate::parse_from_str(placeholder_birthdate, "%Y-%m-%d").map_err(|e| {
            SyncError::InvalidConfig(format!(
                "placeholder birthdate '{placeholder_birthdate}' is invalid: {e}"
            ))
        })?;

        Ok(Self {
            excluded_contact_names,
            placeholder_gender,
            placeholder_birthdate: placeholder_birthdate.to_string(),
            rollback_orphan_person,
        })
    }

    pub fn excluded_contact_names(&self) -> &[String] {
        &self.excluded_contact_names
    }

    pub fn placeholder_gender(&self) -> &str {
        &self.placeholder_gender
    }

    pub fn placeholder_birthdate(&self) -> &str {
        &self.placeholder_birthdate
    }

    pub fn rollback_orphan_person(&self) -> bool {
        self.rollback_orphan_person
    }
}

/// Workflow configuration shared by both entry points.
#[derive(Clone, Debug)]
pub struct SyncConfig {
    identifiers: IdentifierScheme,
    import: ImportConfig,
    provision: ProvisionConfig,
}

impl SyncConfig {
    pub fn new(
        identifiers: IdentifierScheme,
        import: ImportConfig,
        provision: ProvisionConfig,
    ) -> Self {
        Self {
            identifiers,
            import,
            provision,
        }
    }

    pub fn identifiers(&self) -> &IdentifierScheme {
        &self.identifiers
    }

    pub fn import(&self) -> &ImportConfig {
        &self.import
    }

    pub fn provision(&self) -> &ProvisionConfig {
        &self.provision
    }
}

fn folder(path: &str, role: &str) -> SyncResult<NonEmptyText> {
    NonEmptyText::new(path)
        .map_err(|_| SyncError::InvalidConfig(format!("{role} folder cannot be empty")))
}

fn normalise_folder(path: &str) -> &str {
    path.trim_matches('/')
}
