use serde::{Deserialize, Serialize};

use crate::errors::LoadError;
use crate::source::{AssetSource, fetch_success};

pub const METADATA_ASSET: &str = "metadata.json";

/// Labels of the model outputs, in output order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub labels: Vec<String>,
}

impl Metadata {
    pub fn from_slice(json: &[u8]) -> Result<Metadata, LoadError> {
        Ok(serde_json::from_slice(json)?)
    }
}

pub fn load_metadata(source: &dyn AssetSource, name: &str) -> Result<Metadata, LoadError> {
    let asset = fetch_success(source, name)?;
    let metadata = Metadata::from_slice(&asset.body)?;
    info!("Loaded {} labels: {:?}", metadata.labels.len(), metadata.labels);
    Ok(metadata)
}
