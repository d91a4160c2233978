//! WebDAV document store
//!
//! This crate provides the file-storage side of document hand-off: a blocking WebDAV client
//! scoped to one user's root collection (for Nextcloud,
//! `https://host/remote.php/dav/files/<user>`).
//!
//! ## Operations
//!
//! | Operation        | WebDAV request          | Accepted status      |
//! |------------------|-------------------------|----------------------|
//! | `is_dir`         | `PROPFIND`, `Depth: 0`  | 207, 404 = absent    |
//! | `mkdir`          | `MKCOL`                 | 201, 405 = exists    |
//! | `list_files`     | `PROPFIND`, `Depth: 1`  | 207                  |
//! | `read`           | `GET`                   | 200                  |
//! | `move_file`      | `MOVE`, `Overwrite: F`  | 201, 204             |
//!
//! ## Paths
//!
//! Callers address resources with slash-separated paths relative to the root collection
//! (`/ResultadosNuevos/RESULT_EXT-47_2025-07-12.pdf`). Each segment is percent-encoded when the
//! request URL is built, and hrefs in multistatus responses are decoded again before names are
//! returned, so filenames with spaces or non-ASCII characters round-trip unchanged.
//!
//! ## Example Usage
//!
//! ```no_run
//! use sync_webdav::WebdavClient;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = WebdavClient::new(
//!     "http://localhost:8081/remote.php/dav/files/admin_nc",
//!     "admin_nc",
//!     "secret",
//! )?;
//! client.ensure_dir("/ResultadosNuevos")?;
//! for entry in client.list_files("/ResultadosNuevos")? {
//!     println!("{}", entry.name);
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod propfind;

pub use client::WebdavClient;
pub use propfind::RemoteEntry;

/// Errors that can occur during WebDAV operations
#[derive(Debug, thiserror::Error)]
pub enum WebdavError {
    /// Root URL could not be parsed or cannot carry a path
    #[error("Invalid WebDAV root URL: {0}")]
    InvalidRootUrl(String),

    /// The server could not be reached at all
    #[error("Cannot connect to WebDAV server at {0}")]
    Connection(String),

    /// Any other transport-level failure
    #[error("HTTP client error: {0}")]
    Http(String),

    /// The server rejected the credentials
    #[error("WebDAV server rejected the credentials")]
    Unauthorized,

    /// The requested resource does not exist
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// The server answered a request with an unexpected status
    #[error("Unexpected WebDAV response {status} for {method} {path}")]
    UnexpectedStatus {
        method: &'static str,
        path: String,
        status: u16,
    },

    /// Multistatus body could not be interpreted
    #[error("Invalid multistatus response: {0}")]
    InvalidMultistatus(String),
}

pub type WebdavResult<T> = std::result::Result<T, WebdavError>;
