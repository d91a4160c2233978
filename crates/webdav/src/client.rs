//! Blocking WebDAV client
//!
//! [`WebdavClient`] is bound to one root collection and one set of credentials. It is stateless
//! apart from the pooled `reqwest` client, and every operation maps to exactly one HTTP request
//! (except [`WebdavClient::ensure_dir`], which checks before creating).

use crate::propfind::{normalise_path, parse_multistatus, RemoteEntry, PROPFIND_BODY};
use crate::{WebdavError, WebdavResult};
use reqwest::blocking::{RequestBuilder, Response};
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use reqwest::{Method, StatusCode, Url};
use std::sync::LazyLock;

static PROPFIND: LazyLock<Method> = LazyLock::new(|| extension_method("PROPFIND"));
static MKCOL: LazyLock<Method> = LazyLock::new(|| extension_method("MKCOL"));
static MOVE: LazyLock<Method> = LazyLock::new(|| extension_method("MOVE"));

/// PROPFIND depth for the target itself.
const DEPTH_SELF: &str = "0";
/// PROPFIND depth for the target and its direct members.
const DEPTH_MEMBERS: &str = "1";

/// WebDAV client scoped to a root collection.
#[derive(Debug)]
pub struct WebdavClient {
    root: Url,
    username: String,
    password: String,
    client: reqwest::blocking::Client,
}

impl WebdavClient {
    /// Creates a client for the collection at `root_url`.
    ///
    /// # Errors
    ///
    /// Returns `WebdavError` if:
    /// - `root_url` is not an absolute URL that can carry a path
    /// - The HTTP client cannot be constructed
    pub fn new(root_url: &str, username: &str, password: &str) -> WebdavResult<Self> {
        let root = Url::parse(root_url)
            .map_err(|e| WebdavError::InvalidRootUrl(format!("{root_url}: {e}")))?;
        if root.cannot_be_a_base() {
            return Err(WebdavError::InvalidRootUrl(root_url.to_string()));
        }

        let client = reqwest::blocking::Client::builder()
            .build()
            .map_err(|e| WebdavError::Http(e.to_string()))?;

        Ok(Self {
            root,
            username: username.to_string(),
            password: password.to_string(),
            client,
        })
    }

    /// Returns `true` if `path` exists and is a collection.
    pub fn is_dir(&self, path: &str) -> WebdavResult<bool> {
        let response = self.propfind(path, DEPTH_SELF)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        let body = expect_multistatus(response, path)?;
        let entries = parse_multistatus(&body)?;
        Ok(entries.first().is_some_and(|entry| entry.is_dir))
    }

    /// Creates the collection at `path`. An already existing collection is not an error.
    pub fn mkdir(&self, path: &str) -> WebdavResult<()> {
        let url = self.url_for(path)?;
        let response = self.send(self.request(MKCOL.clone(), url))?;
        match response.status() {
            StatusCode::CREATED | StatusCode::METHOD_NOT_ALLOWED => Ok(()),
            status => Err(unexpected("MKCOL", path, status)),
        }
    }

    /// Creates `path` unless it already exists as a collection.
    pub fn ensure_dir(&self, path: &str) -> WebdavResult<()> {
        if self.is_dir(path)? {
            return Ok(());
        }
        tracing::info!("Creating WebDAV collection {}", path);
        self.mkdir(path)
    }

    /// Lists the plain files directly inside the collection at `path`.
    ///
    /// The collection's own entry and any sub-collections are excluded.
    pub fn list_files(&self, path: &str) -> WebdavResult<Vec<RemoteEntry>> {
        let target = self.url_for(path)?;
        let target_path = percent_encoding::percent_decode_str(target.path())
            .decode_utf8_lossy()
            .into_owned();

        let response = self.propfind(path, DEPTH_MEMBERS)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(WebdavError::NotFound(path.to_string()));
        }
        let body = expect_multistatus(response, path)?;

        Ok(parse_multistatus(&body)?
            .into_iter()
            .filter(|entry| normalise_path(&entry.href_path) != normalise_path(&target_path))
            .filter(|entry| !entry.is_dir)
            .collect())
    }

    /// Downloads the content of the file at `path`.
    pub fn read(&self, path: &str) -> WebdavResult<Vec<u8>> {
        let url = self.url_for(path)?;
        let response = self.send(self.request(Method::GET, url))?;
        match response.status() {
            StatusCode::OK => response
                .bytes()
                .map(|bytes| bytes.to_vec())
                .map_err(|e| WebdavError::Http(e.to_string())),
            StatusCode::NOT_FOUND => Err(WebdavError::NotFound(path.to_string())),
            StatusCode::UNAUTHORIZED => Err(WebdavError::Unauthorized),
            status => Err(unexpected("GET", path, status)),
        }
    }

    /// Moves `from` to `to` without overwriting an existing destination.
    pub fn move_file(&self, from: &str, to: &str) -> WebdavResult<()> {
        let response = self.send(self.move_request(from, to)?)?;
        match response.status() {
            StatusCode::CREATED | StatusCode::NO_CONTENT => Ok(()),
            StatusCode::NOT_FOUND => Err(WebdavError::NotFound(from.to_string())),
            StatusCode::UNAUTHORIZED => Err(WebdavError::Unauthorized),
            status => Err(unexpected("MOVE", from, status)),
        }
    }

    /// Builds the request URL for a root-relative path, percent-encoding each segment.
    fn url_for(&self, path: &str) -> WebdavResult<Url> {
        let mut url = self.root.clone();
        url.path_segments_mut()
            .map_err(|_| WebdavError::InvalidRootUrl(self.root.to_string()))?
            .pop_if_empty()
            .extend(path.split('/').filter(|segment| !segment.is_empty()));
        Ok(url)
    }

    fn propfind(&self, path: &str, depth: &'static str) -> WebdavResult<Response> {
        self.send(self.propfind_request(path, depth)?)
    }

    fn propfind_request(&self, path: &str, depth: &'static str) -> WebdavResult<RequestBuilder> {
        let url = self.url_for(path)?;
        Ok(self
            .request(PROPFIND.clone(), url)
            .header("Depth", depth)
            .header(CONTENT_TYPE, "application/xml; charset=utf-8")
            .body(PROPFIND_BODY))
    }

    /// `MOVE` that fails instead of replacing an existing destination.
    fn move_request(&self, from: &str, to: &str) -> WebdavResult<RequestBuilder> {
        let source = self.url_for(from)?;
        let destination = self.url_for(to)?;
        let destination = HeaderValue::from_str(destination.as_str())
            .map_err(|e| WebdavError::Http(e.to_string()))?;
        Ok(self
            .request(MOVE.clone(), source)
            .header("Destination", destination)
            .header("Overwrite", "F"))
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .basic_auth(&self.username, Some(&self.password))
    }

    fn send(&self, request: RequestBuilder) -> WebdavResult<Response> {
        request.send().map_err(|e| {
            if e.is_connect() {
                WebdavError::Connection(self.root.to_string())
            } else {
                WebdavError::Http(e.to_string())
            }
        })
    }
}

fn extension_method(name: &'static str) -> Method {
    Method::from_bytes(name.as_bytes()).expect("WebDAV method names are valid HTTP tokens")
}

fn expect_multistatus(response: Response, path: &str) -> WebdavResult<String> {
    match response.status() {
        StatusCode::MULTI_STATUS => response
            .text()
            .map_err(|e| WebdavError::Http(e.to_string())),
        StatusCode::UNAUTHORIZED => Err(WebdavError::Unauthorized),
        status => Err(unexpected("PROPFIND", path, status)),
    }
}

fn unexpected(method: &'static str, path: &str, status: StatusCode) -> WebdavError {
    WebdavError::UnexpectedStatus {
        method,
        path: path.to_string(),
        status: status.as_u16(),
    }
}
