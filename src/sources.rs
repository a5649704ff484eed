//! Source locations and metadata
//!
//! A [`Source`] pairs where to read from with the metadata every extractor
//! sees for that source's documents.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::Value;
use tracing::info;
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::{Format, Metadata};

const USER_AGENT: &str = concat!("doc-extract/", env!("CARGO_PKG_VERSION"));
const HTTP_TIMEOUT_SECS: u64 = 30;

/// Where a source's content lives
#[derive(Debug, Clone, PartialEq)]
pub enum Location {
    Path(PathBuf),
    Bytes(Vec<u8>),
    /// Fetched over HTTP(S) when read
    Url(url::Url),
    /// Several files read as one source (RDF graphs)
    Files(Vec<PathBuf>),
}

impl Location {
    /// Short name for error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Location::Path(_) => "file",
            Location::Bytes(_) => "byte",
            Location::Url(_) => "URL",
            Location::Files(_) => "multi-file",
        }
    }

    /// Full content of a single-unit location
    pub fn read_bytes(&self, format: Format) -> Result<Vec<u8>> {
        match self {
            Location::Path(path) => {
                info!(path = %path.display(), %format, "Reading source file");
                Ok(std::fs::read(path)?)
            }
            Location::Bytes(bytes) => Ok(bytes.clone()),
            Location::Url(url) => fetch(url),
            Location::Files(_) => Err(Error::UnsupportedSource {
                format,
                kind: self.kind(),
            }),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Path(path) => write!(f, "{}", path.display()),
            Location::Bytes(bytes) => write!(f, "<{} bytes>", bytes.len()),
            Location::Url(url) => write!(f, "{url}"),
            Location::Files(paths) => {
                let names: Vec<_> = paths.iter().map(|p| p.display().to_string()).collect();
                write!(f, "{}", names.join(", "))
            }
        }
    }
}

fn fetch(url: &url::Url) -> Result<Vec<u8>> {
    info!(%url, "Fetching source");
    let agent = ureq::Agent::new_with_config(
        ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(HTTP_TIMEOUT_SECS)))
            .user_agent(USER_AGENT)
            .build(),
    );
    let response = agent.get(url.as_str()).call()?;
    if !response.status().is_success() {
        return Err(Error::Http(format!("HTTP {} for {}", response.status(), url)));
    }
    Ok(response.into_body().read_to_vec()?)
}

/// One unit of input plus its metadata
#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    pub location: Location,
    pub metadata: Metadata,
}

impl Source {
    pub fn new(location: Location) -> Self {
        Source {
            location,
            metadata: Metadata::new(),
        }
    }

    pub fn path(path: impl Into<PathBuf>) -> Self {
        Source::new(Location::Path(path.into()))
    }

    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Source::new(Location::Bytes(bytes.into()))
    }

    /// A URL source; the address must parse
    pub fn url(url: &str) -> Result<Self> {
        let parsed = url::Url::parse(url).map_err(|e| Error::Config(format!("invalid URL `{url}`: {e}")))?;
        Ok(Source::new(Location::Url(parsed)))
    }

    pub fn files<P: Into<PathBuf>>(paths: impl IntoIterator<Item = P>) -> Self {
        Source::new(Location::Files(paths.into_iter().map(Into::into).collect()))
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Add one metadata entry
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

impl From<PathBuf> for Source {
    fn from(path: PathBuf) -> Self {
        Source::path(path)
    }
}

impl From<&Path> for Source {
    fn from(path: &Path) -> Self {
        Source::path(path)
    }
}

impl From<Vec<u8>> for Source {
    fn from(bytes: Vec<u8>) -> Self {
        Source::bytes(bytes)
    }
}

/// Every file under `dir` (optionally only with `extension`), sorted by path
///
/// Each source carries `filename` and `stem` metadata.
pub fn list_directory(dir: &Path, extension: Option<&str>) -> Result<Vec<Source>> {
    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| Error::Io(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let matches = match extension {
            Some(wanted) => entry.path().extension().map(|ext| ext == wanted).unwrap_or(false),
            None => true,
        };
        if matches {
            paths.push(entry.into_path());
        }
    }

    Ok(paths
        .into_iter()
        .map(|path| {
            let filename = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
            let stem = path.file_stem().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
            Source::path(path).with("filename", filename).with("stem", stem)
        })
        .collect())
}
