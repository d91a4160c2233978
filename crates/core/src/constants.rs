//! Constants used throughout the sync core crate.
//!
//! Defaults here are the values the workflows fall back to when the corresponding setting is not
//! supplied at startup. Endpoint URLs and credentials are not defaulted in this crate.

/// Default prefix of the join identifier (`EXT-<external_id>`).
pub const DEFAULT_EXTERNAL_ID_PREFIX: &str = "EXT";

/// Default staging collection for documents awaiting import.
pub const DEFAULT_STAGING_DIR: &str = "/ResultadosNuevos";

/// Default collection that imported documents are moved into.
pub const DEFAULT_PROCESSED_DIR: &str = "/ResultadosProcesados";

/// OpenMRS concept used for complex (file) observations.
pub const DEFAULT_ATTACHMENT_CONCEPT_UUID: &str = "a899e040-e794-4363-80e9-794541728235";

/// Observation timestamp used when the store reports no modification time.
pub const DEFAULT_OBS_DATETIME: &str = "2025-07-12T10:15:00.000-0500";

/// Timestamp layout OpenMRS expects for `obsDatetime`.
pub const OBS_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%z";

/// Prefix of the comment attached to each imported observation; the filename follows it.
pub const IMPORT_COMMENT_PREFIX: &str = "Imported lab result: ";

/// Content type sent when neither the store nor the extension identifies the file.
pub const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// CRM display names that are never provisioned (the stock Odoo administrator).
pub const DEFAULT_EXCLUDED_CONTACT_NAMES: &[&str] = &["Mitchell Admin"];

/// Placeholder gender for people whose CRM record carries none.
pub const DEFAULT_PLACEHOLDER_GENDER: &str = "M";

/// Placeholder birthdate for people whose CRM record carries none.
pub const DEFAULT_PLACEHOLDER_BIRTHDATE: &str = "1990-01-01";

/// Given name used when a contact's display name is blank.
pub const UNKNOWN_GIVEN_NAME: &str = "Unknown";

/// Family name used when the display name has a single token; OpenMRS rejects empty names.
pub const EMPTY_FAMILY_NAME: &str = " ";

/// REST resource listing locations; the first one is the default for new identifiers.
pub const LOCATION_RESOURCE: &str = "location";

/// REST resource listing identifier types; the first one is used for the join identifier.
pub const IDENTIFIER_TYPE_RESOURCE: &str = "patientidentifiertype";

/// Genders OpenMRS accepts on a person.
pub const ACCEPTED_GENDERS: &[&str] = &["M", "F", "O", "U"];
