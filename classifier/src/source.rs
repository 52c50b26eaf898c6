use std::collections::HashMap;
use std::fmt::Debug;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use reqwest::Url;

use crate::errors::LoadError;

/// A fetched resource. `status` follows HTTP conventions for every source,
/// so "not found" is a response rather than a transport error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Asset {
    pub status: u16,
    pub body: Vec<u8>,
}

impl Asset {
    pub fn ok(body: Vec<u8>) -> Asset {
        Asset { status: 200, body }
    }

    pub fn not_found() -> Asset {
        Asset { status: 404, body: vec![] }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Where the model files live.
pub trait AssetSource: Debug {
    fn fetch(&self, name: &str) -> Result<Asset>;

    /// Human readable location of `name`, for diagnostics.
    fn locate(&self, name: &str) -> String;
}

/// Fetch `name` and turn transport failures and non-success statuses into
/// `LoadError`s.
pub fn fetch_success(source: &dyn AssetSource, name: &str) -> Result<Asset, LoadError> {
    debug!("Fetching {}", source.locate(name));
    let asset = source
        .fetch(name)
        .map_err(|source| LoadError::Fetch { asset: name.to_string(), source })?;
    if !asset.is_success() {
        return Err(LoadError::Status { asset: name.to_string(), status: asset.status });
    }
    debug!("Fetched {} ({} bytes)", name, asset.body.len());
    Ok(asset)
}

/// Pick a source from a location string: `http://` and `https://` prefixes
/// designate a remote base URL, anything else a local directory.
pub fn source_for(location: &str) -> Result<Box<dyn AssetSource>> {
    if location.starts_with("http://") || location.starts_with("https://") {
        Ok(Box::new(HttpSource::new(location)?))
    } else {
        Ok(Box::new(DirSource::new(location)))
    }
}

#[derive(Clone, Debug)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    pub fn new(root: impl AsRef<Path>) -> DirSource {
        DirSource { root: root.as_ref().to_path_buf() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AssetSource for DirSource {
    fn fetch(&self, name: &str) -> Result<Asset> {
        let path = self.root.join(name);
        if !path.is_file() {
            return Ok(Asset::not_found());
        }
        let body = fs_err::read(&path)?;
        Ok(Asset::ok(body))
    }

    fn locate(&self, name: &str) -> String {
        self.root.join(name).display().to_string()
    }
}

#[derive(Clone, Debug)]
pub struct HttpSource {
    base: Url,
    client: reqwest::blocking::Client,
}

impl HttpSource {
    pub fn new(base: &str) -> Result<HttpSource> {
        // Url::join replaces the last segment unless the base ends with a slash
        let base = if base.ends_with('/') { base.to_string() } else { format!("{base}/") };
        let base = Url::parse(&base).with_context(|| format!("Parsing model base url {base:?}"))?;
        Ok(HttpSource { base, client: reqwest::blocking::Client::new() })
    }

    pub fn url_for(&self, name: &str) -> Result<Url> {
        self.base.join(name).with_context(|| format!("Joining {name:?} to {}", self.base))
    }
}

impl AssetSource for HttpSource {
    fn fetch(&self, name: &str) -> Result<Asset> {
        let url = self.url_for(name)?;
        let response = self.client.get(url.clone()).send().with_context(|| format!("GET {url}"))?;
        let status = response.status().as_u16();
        let body = response.bytes().with_context(|| format!("Reading body of {url}"))?;
        Ok(Asset { status, body: body.to_vec() })
    }

    fn locate(&self, name: &str) -> String {
        self.url_for(name).map(|u| u.to_string()).unwrap_or_else(|_| name.to_string())
    }
}

/// In-memory assets, for embedding models in a binary or for tests.
#[derive(Clone, Debug, Default)]
pub struct MemorySource {
    assets: HashMap<String, Asset>,
}

impl MemorySource {
    pub fn with(mut self, name: impl Into<String>, body: impl Into<Vec<u8>>) -> MemorySource {
        self.assets.insert(name.into(), Asset::ok(body.into()));
        self
    }

    pub fn with_status(mut self, name: impl Into<String>, status: u16) -> MemorySource {
        self.assets.insert(name.into(), Asset { status, body: vec![] });
        self
    }
}

impl AssetSource for MemorySource {
    fn fetch(&self, name: &str) -> Result<Asset> {
        Ok(self.assets.get(name).cloned().unwrap_or_else(Asset::not_found))
    }

    fn locate(&self, name: &str) -> String {
        format!("memory:{name}")
    }
}
