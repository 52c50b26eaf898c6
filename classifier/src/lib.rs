//! # Image classifier
//!
//! Drives an image classification page on top of tract: label metadata and
//! model are fetched from an asset source, the selected image is previewed,
//! resized to the model input and normalized to `[-1, 1]`, then the model
//! output is ranked against the labels and rendered as progress bars.
//!
//! ```no_run
//! use classifier::prelude::*;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = Config::default();
//! let mut app = App::new(config.preprocessor())?;
//! app.load(&*config.source()?, &config.metadata, &config.loader())?;
//! for item in app.classify_path("grace_hopper.jpg")? {
//!     println!("{} {}%", item.label, item.percentage());
//! }
//! # Ok(())
//! # }
//! ```

#[macro_use]
extern crate log;

pub mod app;
pub mod config;
pub mod errors;
pub mod metadata;
pub mod model;
pub mod page;
pub mod preprocess;
pub mod preview;
pub mod render;
pub mod results;
pub mod source;
pub mod tensors;

pub use tract_core;

pub mod prelude {
    pub use crate::app::{App, Selection, Session};
    pub use crate::config::{Config, load_config};
    pub use crate::errors::{InferenceError, LoadError};
    pub use crate::metadata::{METADATA_ASSET, Metadata};
    pub use crate::model::{ClassifierModel, ModelFormat, ModelLoader, Predictor, TractLoader};
    pub use crate::page::Page;
    pub use crate::preprocess::{DEFAULT_INPUT_SIZE, Preprocessor};
    pub use crate::results::ResultItem;
    pub use crate::source::{AssetSource, DirSource, HttpSource, MemorySource, source_for};
}

#[cfg(test)]
#[allow(dead_code)]
fn setup_test_logger() {
    let _ = env_logger::Builder::from_env("CLASSIFY_LOG").try_init();
}
