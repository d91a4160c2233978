//! Interpretation of `207 Multi-Status` PROPFIND responses.
//!
//! Servers differ in the namespace prefix they pick for `DAV:` (`d:`, `D:`, none), so the
//! patterns below accept any prefix. Only the properties clinic-sync requests are read:
//! `resourcetype`, `getlastmodified` and `getcontenttype`.

use crate::{WebdavError, WebdavResult};
use chrono::{DateTime, FixedOffset};
use percent_encoding::percent_decode_str;
use regex::Regex;
use std::sync::LazyLock;

/// Request body asking for the properties [`parse_multistatus`] reads.
pub(crate) const PROPFIND_BODY: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<d:propfind xmlns:d="DAV:">
  <d:prop>
    <d:resourcetype/>
    <d:getlastmodified/>
    <d:getcontenttype/>
  </d:prop>
</d:propfind>"#;

static MULTISTATUS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<(?:[A-Za-z][\w.-]*:)?multistatus\b").unwrap());
static RESPONSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?s)<(?:[A-Za-z][\w.-]*:)?response(?:\s[^>]*)?>(.*?)</(?:[A-Za-z][\w.-]*:)?response\s*>",
    )
    .unwrap()
});
static HREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<(?:[A-Za-z][\w.-]*:)?href(?:\s[^>/]*)?>(.*?)</(?:[A-Za-z][\w.-]*:)?href\s*>")
        .unwrap()
});
static COLLECTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<(?:[A-Za-z][\w.-]*:)?collection\b").unwrap());
static LAST_MODIFIED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?s)<(?:[A-Za-z][\w.-]*:)?getlastmodified(?:\s[^>/]*)?>(.*?)</(?:[A-Za-z][\w.-]*:)?getlastmodified\s*>",
    )
    .unwrap()
});
static CONTENT_TYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?s)<(?:[A-Za-z][\w.-]*:)?getcontenttype(?:\s[^>/]*)?>(.*?)</(?:[A-Za-z][\w.-]*:)?getcontenttype\s*>",
    )
    .unwrap()
});

static ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(#[xX][0-9A-Fa-f]+|#[0-9]+|[A-Za-z]+);").unwrap());

/// One resource listed in a multistatus response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    /// Decoded absolute path from the server's href (`/remote.php/dav/files/u/dir/a b.pdf`)
    pub href_path: String,
    /// Last path segment, decoded
    pub name: String,
    /// Collection (directory) rather than a plain file
    pub is_dir: bool,
    /// `getlastmodified`, when present and parseable (RFC 2822)
    pub last_modified: Option<DateTime<FixedOffset>>,
    /// `getcontenttype`, when present
    pub content_type: Option<String>,
}

/// Parse every `<response>` element of a multistatus body.
pub(crate) fn parse_multistatus(body: &str) -> WebdavResult<Vec<RemoteEntry>> {
    if !MULTISTATUS.is_match(body) {
        return Err(WebdavError::InvalidMultistatus(
            "body has no multistatus element".into(),
        ));
    }

    RESPONSE
        .captures_iter(body)
        .map(|caps| parse_response(&caps[1]))
        .collect()
}

fn parse_response(fragment: &str) -> WebdavResult<RemoteEntry> {
    let raw_href = HREF
        .captures(fragment)
        .map(|caps| caps[1].trim().to_string())
        .ok_or_else(|| WebdavError::InvalidMultistatus("response without href".into()))?;

    let href_path = decode_href(&raw_href);
    let is_dir = href_path.ends_with('/') || COLLECTION.is_match(fragment);
    let name = href_path
        .rsplit('/')
        .find(|segment| !segment.is_empty())
        .unwrap_or_default()
        .to_string();

    let last_modified = LAST_MODIFIED
        .captures(fragment)
        .and_then(|caps| DateTime::parse_from_rfc2822(caps[1].trim()).ok());
    let content_type = CONTENT_TYPE
        .captures(fragment)
        .map(|caps| unescape_xml(caps[1].trim()))
        .filter(|value| !value.is_empty());

    Ok(RemoteEntry {
        href_path,
        name,
        is_dir,
        last_modified,
        content_type,
    })
}

/// Turn an href (absolute URL or absolute path, XML-escaped and percent-encoded) into a
/// decoded path.
fn decode_href(raw: &str) -> String {
    let unescaped = unescape_xml(raw);
    let path = match reqwest::Url::parse(&unescaped) {
        Ok(url) => url.path().to_string(),
        Err(_) => unescaped,
    };
    percent_decode_str(&path).decode_utf8_lossy().into_owned()
}

pub(crate) fn normalise_path(path: &str) -> &str {
    path.trim_end_matches('/')
}

/// Decode the predefined entities and numeric character references in one pass, so `&amp;lt;`
/// stays `&lt;`. Unknown entities and invalid code points are kept verbatim.
fn unescape_xml(value: &str) -> String {
    ENTITY
        .replace_all(value, |caps: &regex::Captures| {
            let entity = &caps[1];
            let decoded = match entity {
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "amp" => Some('&'),
                _ => numeric_reference(entity),
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}

fn numeric_reference(entity: &str) -> Option<char> {
    let digits = entity.strip_prefix('#')?;
    let code = match digits.strip_prefix('x').or_else(|| digits.strip_prefix('X')) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => digits.parse().ok()?,
    };
    char::from_u32(code)
}
