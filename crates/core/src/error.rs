#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("filename '{filename}' does not match <label>_<PREFIX>-<id>_<suffix>.<ext>: {reason}")]
    MalformedFilename { filename: String, reason: String },
    #[error("missing run prerequisite: {0}")]
    MissingPrerequisite(String),

    #[error("clinical records error: {0}")]
    Clinical(#[from] openmrs::OpenmrsError),
    #[error("CRM error: {0}")]
    Crm(#[from] odoo::OdooError),
    #[error("file storage error: {0}")]
    Storage(#[from] sync_webdav::WebdavError),
    #[error("invalid value: {0}")]
    Text(#[from] sync_types::TextError),
}

pub type SyncResult<T> = std::result::Result<T, SyncError>;
