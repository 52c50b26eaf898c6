use std::path::PathBuf;

use anyhow::{Context, bail};
use classifier::prelude::*;

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    /// Directory or base url holding metadata.json and the model
    #[arg(long)]
    model: Option<String>,

    /// Model file name, relative to the model location
    #[arg(long)]
    model_file: Option<String>,

    /// Write the final page to this file
    #[arg(long)]
    html: Option<PathBuf>,

    /// Images to classify
    #[arg(required = true)]
    images: Vec<PathBuf>,
}

pub fn handle(mut config: Config, args: RunArgs) -> anyhow::Result<()> {
    if let Some(model) = args.model {
        config.model = model;
    }
    if let Some(model_file) = args.model_file {
        config.model_file = model_file;
    }
    config.validate()?;

    let mut app = App::new(config.preprocessor())?;
    let source = config.source()?;
    let loaded = app.load(&*source, &config.metadata, &config.loader());
    if loaded.is_ok() {
        let failures = classify_all(&mut app, &args.images);
        write_page(&app, args.html.as_ref())?;
        if failures > 0 {
            bail!("{} of {} images failed", failures, args.images.len());
        }
        Ok(())
    } else {
        write_page(&app, args.html.as_ref())?;
        loaded.with_context(|| format!("Loading model from {}", config.model))
    }
}

fn classify_all(app: &mut App, images: &[PathBuf]) -> usize {
    let mut failures = 0;
    for image in images {
        if images.len() > 1 {
            println!("{}", image.display());
        }
        match app.classify_path(image) {
            Ok(items) => {
                for item in items {
                    println!("{} {}%", item.label, item.percentage());
                }
            }
            Err(e) => {
                error!("{}: {}", image.display(), e);
                failures += 1;
            }
        }
    }
    failures
}

fn write_page(app: &App, path: Option<&PathBuf>) -> anyhow::Result<()> {
    if let Some(path) = path {
        let html = app.document()?;
        fs_err::write(path, html)?;
        info!("Wrote page to {:?}", path);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn failed_images_are_counted_and_page_is_written() {
        fixtures::setup_test_logger();
        let dir = tempfile::tempdir().unwrap();
        fixtures::write_identity_model(dir.path()).unwrap();
        let good = dir.path().join("teal.png");
        fixtures::write_png(&good, [0, 255, 255]);
        let bad = dir.path().join("broken.png");
        std::fs::write(&bad, "not a png").unwrap();
        let html = dir.path().join("page.html");

        let args = RunArgs {
            model: None,
            model_file: None,
            html: Some(html.clone()),
            images: vec![good, bad],
        };
        let err = handle(fixtures::config(dir.path()), args).unwrap_err();
        assert_eq!(err.to_string(), "1 of 2 images failed");

        let page = std::fs::read_to_string(&html).unwrap();
        assert!(page.contains("Model loaded successfully!"));
        assert!(page.contains("Error during inference"));
    }

    #[test]
    fn all_images_classified() {
        let dir = tempfile::tempdir().unwrap();
        fixtures::write_identity_model(dir.path()).unwrap();
        let image = dir.path().join("red.png");
        fixtures::write_png(&image, [255, 0, 0]);
        let args = RunArgs { model: None, model_file: None, html: None, images: vec![image] };
        handle(fixtures::config(dir.path()), args).unwrap();
    }

    #[test]
    fn load_failure_still_writes_page() {
        fixtures::setup_test_logger();
        let dir = tempfile::tempdir().unwrap();
        let html = dir.path().join("page.html");
        let image = dir.path().join("red.png");
        fixtures::write_png(&image, [255, 0, 0]);
        let args = RunArgs {
            model: Some(dir.path().join("nowhere").display().to_string()),
            model_file: None,
            html: Some(html.clone()),
            images: vec![image],
        };
        let err = handle(fixtures::config(dir.path()), args).unwrap_err();
        assert!(err.to_string().starts_with("Loading model from"));
        assert!(format!("{err:#}").contains("Failed to load metadata.json (HTTP 404)"));

        let page = std::fs::read_to_string(&html).unwrap();
        assert!(page.contains("Error loading model"));
        assert!(page.contains(r#"<div id="input-container" style="display: none">"#));
    }

    #[test]
    fn empty_model_file_override_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let args = RunArgs {
            model: None,
            model_file: Some(String::new()),
            html: None,
            images: vec![dir.path().join("red.png")],
        };
        assert!(handle(fixtures::config(dir.path()), args).is_err());
    }
}
