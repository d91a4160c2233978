//! Resolution of external identifiers to clinical subjects.

use crate::collaborators::ClinicalRecords;
use crate::identifier::IdentifierScheme;
use crate::SyncResult;
use sync_types::{ExternalId, ResourceUuid};

/// Look up the subject carrying the join identifier for `external_id`.
///
/// Returns `Ok(None)` when no subject matches. When several match, the first one in server order
/// wins and a warning is logged. Errors are returned so callers can tell "absent" from "unknown".
pub fn lookup_subject(
    clinical: &dyn ClinicalRecords,
    scheme: &IdentifierScheme,
    external_id: &ExternalId,
) -> SyncResult<Option<ResourceUuid>> {
    let identifier = scheme.join_identifier(external_id);
    let matches = clinical.find_subjects(&identifier)?;
    if matches.len() > 1 {
        tracing::warn!(
            "{} subjects carry identifier '{}'; using the first ({})",
            matches.len(),
            identifier,
            matches[0]
        );
    }
    Ok(matches.into_iter().next())
}

/// Resolve `external_id` to a subject UUID, treating any failure as "not found".
///
/// Lookup errors are logged and never propagated, so one unreachable lookup cannot abort a
/// batch.
pub fn resolve_subject(
    clinical: &dyn ClinicalRecords,
    scheme: &IdentifierScheme,
    external_id: &ExternalId,
) -> Option<ResourceUuid> {
    let identifier = scheme.join_identifier(external_id);
    match lookup_subject(clinical, scheme, external_id) {
        Ok(Some(subject)) => {
            tracing::info!(
                "Subject for CRM id '{}' found in the clinical system. UUID: {}",
                external_id,
                subject
            );
            Some(subject)
        }
        Ok(None) => {
            tracing::warn!("No subject found with identifier: {}", identifier);
            None
        }
        Err(e) => {
            tracing::error!("Error looking up subject by identifier '{}': {}", identifier, e);
            None
        }
    }
}
