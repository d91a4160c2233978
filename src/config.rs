//! Startup configuration read from the process environment (and `.env`, via `dotenvy`).

use anyhow::{Context, bail};
use sync_core::constants::{
    DEFAULT_ATTACHMENT_CONCEPT_UUID, DEFAULT_EXCLUDED_CONTACT_NAMES, DEFAULT_EXTERNAL_ID_PREFIX,
    DEFAULT_OBS_DATETIME, DEFAULT_PLACEHOLDER_BIRTHDATE, DEFAULT_PLACEHOLDER_GENDER,
    DEFAULT_PROCESSED_DIR, DEFAULT_STAGING_DIR,
};
use sync_core::{
    ConnectionConfig, Credentials, CrmEndpoint, IdentifierScheme, ImportConfig, NonEmptyText,
    ProvisionConfig, ServiceEndpoint, SyncConfig,
};

const DEFAULT_OPENMRS_URL: &str = "http://localhost:8000/openmrs/ws/rest/v1";
const DEFAULT_OPENMRS_USER: &str = "admin";
const DEFAULT_NEXTCLOUD_URL: &str = "http://localhost:8081";
const DEFAULT_NEXTCLOUD_USER: &str = "admin_nc";
const DEFAULT_ODOO_URL: &str = "http://localhost:8069";
const DEFAULT_ODOO_DB: &str = "ClinicaDB";
const DEFAULT_ODOO_USER: &str = "admin";

/// The job being started; it decides which collaborator settings are required.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Workflow {
    ImportDocuments,
    ProvisionSubjects,
}

/// Everything the binary needs to build clients and workflows.
pub struct Settings {
    pub connections: ConnectionConfig,
    pub sync: SyncConfig,
}

impl Settings {
    pub fn from_env(workflow: Workflow) -> anyhow::Result<Self> {
        Self::from_lookup(workflow, |key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup. Blank values count as unset.
    ///
    /// Nextcloud settings are only read for document import and Odoo settings only for subject
    /// provisioning.
    pub fn from_lookup(
        workflow: Workflow,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());
        let required = |key: &str| get(key).with_context(|| format!("{key} must be set"));

        let openmrs_password = match get("OPENMRS_PASSWORD") {
            Some(password) => password,
            None => required("OMRS_ADMIN_USER_PASSWORD")
                .context("OPENMRS_PASSWORD (or OMRS_ADMIN_USER_PASSWORD) must be set")?,
        };
        let clinical = ServiceEndpoint::new(
            &or("OPENMRS_URL", DEFAULT_OPENMRS_URL),
            Credentials::new(&or("OPENMRS_USER", DEFAULT_OPENMRS_USER), openmrs_password)?,
        )
        .context("invalid OpenMRS settings")?;

        let storage = match workflow {
            Workflow::ImportDocuments => {
                let user = or("NEXTCLOUD_USER", DEFAULT_NEXTCLOUD_USER);
                let webdav_url = get("NEXTCLOUD_WEBDAV_URL").unwrap_or_else(|| {
                    format!(
                        "{}/remote.php/dav/files/{}",
                        or("NEXTCLOUD_URL", DEFAULT_NEXTCLOUD_URL).trim_end_matches('/'),
                        user
                    )
                });
                let credentials = Credentials::new(&user, required("NEXTCLOUD_PASSWORD")?)?;
                Some(
                    ServiceEndpoint::new(&webdav_url, credentials)
                        .context("invalid Nextcloud settings")?,
                )
            }
            Workflow::ProvisionSubjects => None,
        };

        let crm = match workflow {
            Workflow::ProvisionSubjects => {
                let credentials = Credentials::new(
                    &or("ODOO_USER", DEFAULT_ODOO_USER),
                    required("ODOO_PASSWORD")?,
                )?;
                Some(CrmEndpoint {
                    server: ServiceEndpoint::new(&or("ODOO_URL", DEFAULT_ODOO_URL), credentials)
                        .context("invalid Odoo settings")?,
                    database: NonEmptyText::new(or("ODOO_DB", DEFAULT_ODOO_DB))
                        .context("ODOO_DB cannot be empty")?,
                })
            }
            Workflow::ImportDocuments => None,
        };

        let identifiers =
            IdentifierScheme::new(&or("EXTERNAL_ID_PREFIX", DEFAULT_EXTERNAL_ID_PREFIX))
                .context("invalid EXTERNAL_ID_PREFIX")?;

        let import = ImportConfig::new(
            &or("NEXTCLOUD_STAGING_DIR", DEFAULT_STAGING_DIR),
            &or("NEXTCLOUD_PROCESSED_DIR", DEFAULT_PROCESSED_DIR),
            &or("OBS_CONCEPT_UUID", DEFAULT_ATTACHMENT_CONCEPT_UUID),
            &or("OBS_DEFAULT_DATETIME", DEFAULT_OBS_DATETIME),
            flag("OBS_CHECK_EXISTING", get("OBS_CHECK_EXISTING"), true)?,
        )
        .context("invalid document import settings")?;

        let excluded = match get("ODOO_EXCLUDED_NAMES") {
            Some(names) => names.split(',').map(str::to_string).collect(),
            None => DEFAULT_EXCLUDED_CONTACT_NAMES
                .iter()
                .map(|name| name.to_string())
                .collect(),
        };
        let provision = ProvisionConfig::new(
            excluded,
            &or("PERSON_PLACEHOLDER_GENDER", DEFAULT_PLACEHOLDER_GENDER),
            &or("PERSON_PLACEHOLDER_BIRTHDATE", DEFAULT_PLACEHOLDER_BIRTHDATE),
            flag("PERSON_ROLLBACK_ORPHANS", get("PERSON_ROLLBACK_ORPHANS"), true)?,
        )
        .context("invalid subject provisioning settings")?;

        Ok(Self {
            connections: ConnectionConfig {
                clinical,
                storage,
                crm,
            },
            sync: SyncConfig::new(identifiers, import, provision),
        })
    }
}

fn flag(key: &str, value: Option<String>, default: bool) -> anyhow::Result<bool> {
    let Some(value) = value else {
        return Ok(default);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("{key} must be true or false, got '{other}'"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings_for(workflow: Workflow, pairs: &[(&str, &str)]) -> anyhow::Result<Settings> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(workflow, |key| env.get(key).cloned())
    }

    fn settings(pairs: &[(&str, &str)]) -> anyhow::Result<Settings> {
        settings_for(Workflow::ImportDocuments, pairs)
    }

    fn storage(s: &Settings) -> &ServiceEndpoint {
        s.connections.storage.as_ref().expect("storage configured")
    }

    const IMPORT_PASSWORDS: [(&str, &str); 2] =
        [("OPENMRS_PASSWORD", "omrs"), ("NEXTCLOUD_PASSWORD", "nc")];

    const PROVISION_PASSWORDS: [(&str, &str); 2] =
        [("OPENMRS_PASSWORD", "omrs"), ("ODOO_PASSWORD", "odoo")];

    #[test]
    fn import_defaults_apply_when_only_its_passwords_are_set() {
        let s = settings(&IMPORT_PASSWORDS).expect("import needs no Odoo settings");
        assert_eq!(s.connections.clinical.url(), DEFAULT_OPENMRS_URL);
        assert_eq!(
            storage(&s).url(),
            "http://localhost:8081/remote.php/dav/files/admin_nc"
        );
        assert!(s.connections.crm.is_none());
        assert_eq!(s.sync.identifiers().prefix(), "EXT");
        assert!(s.sync.import().check_existing_observations());
    }

    #[test]
    fn provisioning_needs_no_nextcloud_settings() {
        let s = settings_for(Workflow::ProvisionSubjects, &PROVISION_PASSWORDS)
            .expect("provisioning needs no Nextcloud settings");
        assert!(s.connections.storage.is_none());
        let crm = s.connections.crm.as_ref().expect("crm configured");
        assert_eq!(crm.server.url(), "http://localhost:8069");
        assert_eq!(crm.server.credentials().username(), "admin");
        assert_eq!(crm.database.as_str(), "ClinicaDB");
        assert_eq!(
            s.sync.provision().excluded_contact_names(),
            ["Mitchell Admin"]
        );
    }

    #[test]
    fn openmrs_password_falls_back_to_admin_variable() {
        let s = settings(&[
            ("OMRS_ADMIN_USER_PASSWORD", "fallback"),
            ("NEXTCLOUD_PASSWORD", "nc"),
        ])
        .expect("should load");
        assert_eq!(s.connections.clinical.credentials().password(), "fallback");
    }

    #[test]
    fn each_workflow_requires_its_own_password() {
        let err = settings(&PROVISION_PASSWORDS)
            .err()
            .expect("import without Nextcloud password should fail");
        assert!(err.to_string().contains("NEXTCLOUD_PASSWORD"));

        let err = settings_for(Workflow::ProvisionSubjects, &IMPORT_PASSWORDS)
            .err()
            .expect("provisioning without Odoo password should fail");
        assert!(err.to_string().contains("ODOO_PASSWORD"));
    }

    #[test]
    fn overrides_are_honoured() {
        let mut pairs = IMPORT_PASSWORDS.to_vec();
        pairs.extend([
            ("NEXTCLOUD_WEBDAV_URL", "https://files.example/dav/"),
            ("ODOO_EXCLUDED_NAMES", "Mitchell Admin, Public user"),
            ("EXTERNAL_ID_PREFIX", "ODOO"),
            ("OBS_CHECK_EXISTING", "false"),
            ("PERSON_ROLLBACK_ORPHANS", "no"),
        ]);
        let s = settings(&pairs).expect("should load");
        assert_eq!(storage(&s).url(), "https://files.example/dav");
        assert_eq!(
            s.sync.provision().excluded_contact_names(),
            ["Mitchell Admin", "Public user"]
        );
        assert_eq!(s.sync.identifiers().prefix(), "ODOO");
        assert!(!s.sync.import().check_existing_observations());
        assert!(!s.sync.provision().rollback_orphan_person());
    }

    #[test]
    fn rejects_unparseable_flag() {
        let mut pairs = IMPORT_PASSWORDS.to_vec();
        pairs.push(("OBS_CHECK_EXISTING", "maybe"));
        assert!(settings(&pairs).is_err());
    }
}
