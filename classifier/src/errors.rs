/// Failure to bring the page to its loaded state. Terminal for an `App`.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Failed to load {asset} (HTTP {status})")]
    Status { asset: String, status: u16 },
    #[error("Failed to fetch {asset}: {source:#}")]
    Fetch {
        asset: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("Invalid metadata: {0}")]
    Metadata(#[from] serde_json::Error),
    #[error("{0:#}")]
    Model(#[source] anyhow::Error),
}

/// Failure of a single inference run. The page stays loaded.
#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("Model not loaded yet!")]
    ModelNotLoaded,
    #[error("Please select an image first!")]
    NoFile,
    #[error("Invalid preview source: {0}")]
    Preview(String),
    #[error("Could not decode image: {0}")]
    Image(#[from] image::ImageError),
    #[error("Model produced {outputs} values for {labels} labels")]
    LabelMismatch { labels: usize, outputs: usize },
    #[error("{0:#}")]
    Runtime(#[source] anyhow::Error),
}
