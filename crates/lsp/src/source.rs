//! Text sources: where document text comes from.
//!
//! Every fetch is abortable. A cancelled fetch returns
//! [`NakoError::Cancelled`] and never yields partial text.

use crate::document::VersionMarker;
use async_trait::async_trait;
use nako_core::NakoError;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

/// Text of one document and the marker identifying that revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched {
    pub text: String,
    pub marker: VersionMarker,
}

#[async_trait]
pub trait TextSource: Send + Sync {
    async fn fetch(&self, uri: &str, cancel: &CancellationToken) -> Result<Fetched, NakoError>;
}

fn cancelled(uri: &str) -> NakoError {
    NakoError::Cancelled {
        uri: uri.to_owned(),
    }
}

// ──────────────────────────────────────────────
// URIs
// ──────────────────────────────────────────────

/// Filesystem path of a `file://` URI, percent-decoded. Other URIs are
/// returned unchanged.
pub fn uri_to_path(uri: &str) -> String {
    match uri.strip_prefix("file://") {
        Some(rest) => percent_decode(rest),
        None => uri.to_owned(),
    }
}

fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(b) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(b);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

// ──────────────────────────────────────────────
// Local files
// ──────────────────────────────────────────────

/// Reads `file://` URIs (or bare paths) with tokio's filesystem API.
/// The marker is the modification time.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileSource;

#[async_trait]
impl TextSource for FileSource {
    async fn fetch(&self, uri: &str, cancel: &CancellationToken) -> Result<Fetched, NakoError> {
        if cancel.is_cancelled() {
            return Err(cancelled(uri));
        }
        let path = PathBuf::from(uri_to_path(uri));
        let read = async {
            let text = tokio::fs::read_to_string(&path)
                .await
                .map_err(|source| NakoError::Io {
                    path: path.display().to_string(),
                    source,
                })?;
            let modified = tokio::fs::metadata(&path)
                .await
                .and_then(|m| m.modified())
                .ok();
            let marker = match modified {
                Some(t) => VersionMarker::Modified(t),
                None => VersionMarker::digest(&text),
            };
            Ok(Fetched { text, marker })
        };
        tokio::select! {
            _ = cancel.cancelled() => Err(cancelled(uri)),
            result = read => result,
        }
    }
}

// ──────────────────────────────────────────────
// HTTP
// ──────────────────────────────────────────────

/// Fetches `http(s)://` URIs. The marker is the `ETag`, else
/// `Last-Modified`, else a digest of the body.
#[derive(Clone)]
pub struct HttpSource {
    agent: ureq::Agent,
}

impl Default for HttpSource {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpSource {
    pub fn new() -> Self {
        HttpSource {
            agent: ureq::Agent::new_with_defaults(),
        }
    }
}

#[async_trait]
impl TextSource for HttpSource {
    async fn fetch(&self, uri: &str, cancel: &CancellationToken) -> Result<Fetched, NakoError> {
        if cancel.is_cancelled() {
            return Err(cancelled(uri));
        }
        // ureq is synchronous, so run it on the blocking pool
        let agent = self.agent.clone();
        let target = uri.to_owned();
        let task = tokio::task::spawn_blocking(move || fetch_blocking(&agent, &target));
        tokio::select! {
            _ = cancel.cancelled() => Err(cancelled(uri)),
            joined = task => joined.map_err(|e| NakoError::Fetch {
                uri: uri.to_owned(),
                message: format!("task join error: {}", e),
            })?,
        }
    }
}

fn fetch_blocking(agent: &ureq::Agent, uri: &str) -> Result<Fetched, NakoError> {
    let fetch_error = |message: String| NakoError::Fetch {
        uri: uri.to_owned(),
        message,
    };
    let response = agent
        .get(uri)
        .call()
        .map_err(|e| fetch_error(e.to_string()))?;
    let header = |name: &str| {
        response
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
    };
    let tag = header("etag").or_else(|| header("last-modified"));
    let text = response
        .into_body()
        .read_to_string()
        .map_err(|e| fetch_error(format!("error reading response body: {}", e)))?;
    let marker = match tag {
        Some(tag) => VersionMarker::Tag(tag),
        None => VersionMarker::digest(&text),
    };
    Ok(Fetched { text, marker })
}

// ──────────────────────────────────────────────
// Dispatch and in-memory
// ──────────────────────────────────────────────

/// Routes `http(s)://` URIs to [`HttpSource`] and everything else to
/// [`FileSource`].
#[derive(Clone, Default)]
pub struct AnySource {
    http: HttpSource,
    file: FileSource,
}

#[async_trait]
impl TextSource for AnySource {
    async fn fetch(&self, uri: &str, cancel: &CancellationToken) -> Result<Fetched, NakoError> {
        if uri.starts_with("http://") || uri.starts_with("https://") {
            self.http.fetch(uri, cancel).await
        } else {
            self.file.fetch(uri, cancel).await
        }
    }
}

/// Fixed texts keyed by URI; the marker is a digest of the text.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    files: BTreeMap<String, String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, uri: impl Into<String>, text: impl Into<String>) {
        self.files.insert(uri.into(), text.into());
    }

    pub fn with(mut self, uri: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(uri, text);
        self
    }
}

#[async_trait]
impl TextSource for MemorySource {
    async fn fetch(&self, uri: &str, cancel: &CancellationToken) -> Result<Fetched, NakoError> {
        if cancel.is_cancelled() {
            return Err(cancelled(uri));
        }
        let text = self.files.get(uri).cloned().ok_or_else(|| NakoError::Fetch {
            uri: uri.to_owned(),
            message: "not found in memory".to_owned(),
        })?;
        let marker = VersionMarker::digest(&text);
        Ok(Fetched { text, marker })
    }
}
