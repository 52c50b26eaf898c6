use std::path::Path;

use classifier::config::Config;
use classifier::tract_core::prelude::*;
use image::{Rgb, RgbImage};

pub fn setup_test_logger() {
    let _ = env_logger::Builder::from_env("CLASSIFY_LOG").try_init();
}

/// An identity NNEF model over one RGB pixel, with one label per channel.
pub fn write_identity_model(dir: &Path) -> TractResult<()> {
    let mut model = TypedModel::default();
    let input = model.add_source("input", f32::fact([1, 1, 1, 3]))?;
    model.set_output_outlets(&[input])?;
    let file = std::fs::File::create(dir.join("model.nnef.tar"))?;
    tract_nnef::nnef().with_tract_core().write_to_tar(&model, file)?;
    std::fs::write(dir.join("metadata.json"), r#"{"labels":["red","green","blue"]}"#)?;
    Ok(())
}

pub fn config(dir: &Path) -> Config {
    Config {
        model: dir.display().to_string(),
        model_file: "model.nnef.tar".into(),
        input_size: 1,
        ..Config::default()
    }
}

pub fn write_png(path: &Path, pixel: [u8; 3]) {
    RgbImage::from_pixel(4, 4, Rgb(pixel)).save(path).unwrap();
}
