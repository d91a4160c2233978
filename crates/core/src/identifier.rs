//! The join-identifier convention shared by both workflows.
//!
//! A clinical subject is correlated with a CRM contact only through an identifier of the form
//! `<PREFIX>-<external_id>` (default prefix `EXT`). Staged documents embed the same string as the
//! second underscore-delimited segment of their filename:
//!
//! ```text
//! RESULT_EXT-47_2025-07-12.pdf
//! ^^^^^^ ^^^^^^ ^^^^^^^^^^ ^^^
//! label  join   suffix     extension
//! ```

use crate::{SyncError, SyncResult};
use sync_types::{ExternalId, NonEmptyText};

/// Builds and parses join identifiers for one prefix.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdentifierScheme {
    prefix: NonEmptyText,
}

impl IdentifierScheme {
    /// The prefix must be ASCII alphanumeric; `-` and `_` are delimiters in filenames.
    pub fn new(prefix: &str) -> SyncResult<Self> {
        let prefix = NonEmptyText::new(prefix)
            .map_err(|_| SyncError::InvalidConfig("identifier prefix cannot be empty".into()))?;
        if !prefix.as_str().bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(SyncError::InvalidConfig(format!(
                "identifier prefix '{prefix}' must be ASCII alphanumeric"
            )));
        }
        Ok(Self { prefix })
    }

    pub fn prefix(&self) -> &str {
        self.prefix.as_str()
    }

    /// `EXT-47` for external id `47`.
    pub fn join_identifier(&self, external_id: &ExternalId) -> String {
        format!("{}-{}", self.prefix, external_id)
    }

    /// Extract the external identifier from a staged filename.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::MalformedFilename`] when the name lacks a label, a suffix with an
    /// extension, or a second segment of exactly `<PREFIX>-<id>`.
    pub fn external_id_from_filename(&self, filename: &str) -> SyncResult<ExternalId> {
        let malformed = |reason: &str| SyncError::MalformedFilename {
            filename: filename.to_string(),
            reason: reason.to_string(),
        };

        let segments: Vec<&str> = filename.split('_').collect();
        if segments.len() < 3 {
            return Err(malformed("expected at least three '_'-separated segments"));
        }
        if segments[0].trim().is_empty() {
            return Err(malformed("label is empty"));
        }

        let last = segments[segments.len() - 1];
        match last.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => {}
            _ => return Err(malformed("suffix must be '<suffix>.<ext>'")),
        }

        let mut parts = segments[1].split('-');
        let prefix = parts.next().unwrap_or_default();
        if prefix != self.prefix.as_str() {
            return Err(malformed(&format!(
                "second segment must start with '{}-'",
                self.prefix
            )));
        }
        let id = parts
            .next()
            .ok_or_else(|| malformed("second segment has no identifier"))?;
        if parts.next().is_some() {
            return Err(malformed("second segment has more than one '-'"));
        }

        ExternalId::parse(id).map_err(|e| malformed(&e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheme() -> IdentifierScheme {
        IdentifierScheme::new("EXT").expect("valid prefix")
    }

    fn assert_malformed(filename: &str) {
        let err = scheme()
            .external_id_from_filename(filename)
            .expect_err("should reject malformed filename");
        assert!(
            matches!(&err, SyncError::MalformedFilename { filename: f, .. } if f == filename),
            "unexpected error for {filename}: {err:?}"
        );
    }

    #[test]
    fn extracts_id_from_result_filename() {
        let id = scheme()
            .external_id_from_filename("RESULT_EXT-47_2025-07-12.pdf")
            .expect("should parse");
        assert_eq!(id.as_str(), "47");
    }

    #[test]
    fn extracts_id_for_varied_labels_and_suffixes() {
        let cases = [
            ("LAB_EXT-1_x.txt", "1"),
            ("Informe Lab_EXT-90210_2025-01-01_v2.pdf", "90210"),
            ("X_EXT-A7_final.tar.gz", "A7"),
            ("Hemograma_EXT-3_scan.JPG", "3"),
        ];
        for (filename, expected) in cases {
            let id = scheme()
                .external_id_from_filename(filename)
                .unwrap_or_else(|e| panic!("{filename} should parse: {e}"));
            assert_eq!(id.as_str(), expected, "for {filename}");
        }
    }

    #[test]
    fn rejects_filenames_not_matching_grammar() {
        assert_malformed("RESULT.pdf");
        assert_malformed("RESULT_EXT-47.pdf");
        assert_malformed("_EXT-47_2025.pdf");
        assert_malformed("RESULT_EXT-47_noextension");
        assert_malformed("RESULT_EXT-47_.pdf");
        assert_malformed("RESULT_EXT_2025.pdf");
        assert_malformed("RESULT_EXT-_2025.pdf");
        assert_malformed("RESULT_ODOO-47_2025.pdf");
        assert_malformed("RESULT_EXT-47-2_2025.pdf");
        assert_malformed("RESULT_EXT-4.7_2025.pdf");
        assert_malformed("RESULT_EXT- 47 _2025.pdf");
        assert_malformed("RESULT_EXT-47 _2025.pdf");
        assert_malformed("");
    }

    #[test]
    fn join_identifier_uses_prefix() {
        let scheme = IdentifierScheme::new("ODOO").expect("valid prefix");
        assert_eq!(scheme.join_identifier(&ExternalId::from(9)), "ODOO-9");
        let id = scheme
            .external_id_from_filename("R_ODOO-9_a.pdf")
            .expect("should parse with custom prefix");
        assert_eq!(id.as_str(), "9");
    }

    #[test]
    fn rejects_prefix_with_delimiters() {
        assert!(IdentifierScheme::new("EXT-ID").is_err());
        assert!(IdentifierScheme::new("EXT_ID").is_err());
        assert!(IdentifierScheme::new(" ").is_err());
    }
}
