use std::path::{Path, PathBuf};

use anyhow::format_err;
use tract_core::prelude::IntoTValue;

use crate::errors::{InferenceError, LoadError};
use crate::metadata::{Metadata, load_metadata};
use crate::model::{ModelLoader, Predictor};
use crate::page::*;
use crate::preprocess::Preprocessor;
use crate::preview::{decode_data_url, read_as_data_url};
use crate::render::{InferencePhase, ModelPhase, Renderer};
use crate::results::{ResultItem, rank};
use crate::source::AssetSource;
use crate::tensors::{PooledTensor, TensorPool};

/// Labels and model, present once loading succeeded.
#[derive(Debug)]
pub struct Session {
    pub metadata: Metadata,
    pub model: Box<dyn Predictor>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selection {
    pub path: PathBuf,
    pub data_url: String,
}

/// The classification page: owns its state and the page it renders to.
#[derive(Debug)]
pub struct App {
    renderer: Renderer,
    preprocessor: Preprocessor,
    pool: TensorPool,
    page: Page,
    session: Option<Session>,
    selection: Option<Selection>,
}

impl App {
    pub fn new(preprocessor: Preprocessor) -> anyhow::Result<App> {
        Ok(App {
            renderer: Renderer::new()?,
            preprocessor,
            pool: TensorPool::new(),
            page: Page::new(),
            session: None,
            selection: None,
        })
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn pool(&self) -> &TensorPool {
        &self.pool
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn is_loaded(&self) -> bool {
        self.session.is_some()
    }

    pub fn document(&self) -> anyhow::Result<String> {
        self.renderer.document(&self.page)
    }

    /// Fetch metadata then model. The input form is only shown once both
    /// are there; a failure is terminal for this `App`.
    pub fn load(
        &mut self,
        source: &dyn AssetSource,
        metadata: &str,
        loader: &dyn ModelLoader,
    ) -> Result<(), LoadError> {
        self.render_model_status(ModelPhase::Loading).map_err(LoadError::Model)?;
        info!("Starting model load from {}", source.locate(metadata));
        let loaded = load_metadata(source, metadata)
            .and_then(|metadata| Ok(Session { metadata, model: loader.load_model(source)? }));
        match loaded {
            Ok(session) => {
                info!("Model loaded successfully: {:?}", session.model);
                self.session = Some(session);
                self.render_model_status(ModelPhase::Loaded).map_err(LoadError::Model)?;
                self.page.show(INPUT_CONTAINER);
                Ok(())
            }
            Err(e) => {
                error!("Error loading model: {}", e);
                self.render_model_status(ModelPhase::Failed(&e.to_string()))
                    .map_err(LoadError::Model)?;
                Err(e)
            }
        }
    }

    fn render_model_status(&mut self, phase: ModelPhase) -> anyhow::Result<()> {
        let fragment = self.renderer.model_status(phase)?;
        if let Some(class) = fragment.class {
            self.page.set_class(MODEL_STATUS, class);
        }
        self.page.set_inner_html(MODEL_STATUS, fragment.html);
        Ok(())
    }

    /// File input change. Ignored until the model is loaded. The content is
    /// not validated: a file that is not an image only fails at inference.
    pub fn select_file(&mut self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        if !self.is_loaded() {
            debug!("Ignoring selection of {:?}, model is not loaded", path);
            return Ok(());
        }
        match read_as_data_url(path) {
            Ok(data_url) => {
                let name = path.file_name().map(|n| n.to_string_lossy().into_owned());
                self.page.set_value(IMAGE_INPUT, name);
                self.page.set_src(PREVIEW_IMAGE, Some(data_url.clone()));
                self.page.show(PREVIEW_IMAGE);
                self.selection = Some(Selection { path: path.to_path_buf(), data_url });
                Ok(())
            }
            Err(e) => {
                error!("Reading {:?}: {:#}", path, e);
                self.clear_selection();
                Err(e)
            }
        }
    }

    /// Empty the file input. The preview keeps showing the last image.
    pub fn clear_selection(&mut self) {
        self.page.set_value(IMAGE_INPUT, None);
        self.selection = None;
    }

    /// Classify the selected image and render the ranked labels.
    pub fn run_inference(&mut self) -> Result<Vec<ResultItem>, InferenceError> {
        let Some(session) = self.session.as_ref() else {
            self.page.alert(InferenceError::ModelNotLoaded.to_string());
            return Err(InferenceError::ModelNotLoaded);
        };
        let Some(selection) = self.selection.as_ref() else {
            self.page.alert(InferenceError::NoFile.to_string());
            return Err(InferenceError::NoFile);
        };

        let running =
            self.renderer.inference(InferencePhase::Running).map_err(InferenceError::Runtime)?;
        self.page.set_inner_html(INFERENCE_RESULT, running.html);
        self.page.show(RESULT_CONTAINER);

        info!("Running inference on {:?}", selection.path);
        let outcome = classify(session, selection, &self.preprocessor, &self.pool);
        let fragment = match &outcome {
            Ok(items) => self.renderer.inference(InferencePhase::Done(items)),
            Err(e) => {
                error!("Error during inference: {}", e);
                self.renderer.inference(InferencePhase::Failed(&e.to_string()))
            }
        }
        .map_err(InferenceError::Runtime)?;
        self.page.set_inner_html(INFERENCE_RESULT, fragment.html);
        outcome
    }

    pub fn classify_path(
        &mut self,
        path: impl AsRef<Path>,
    ) -> Result<Vec<ResultItem>, InferenceError> {
        self.select_file(path).map_err(InferenceError::Runtime)?;
        self.run_inference()
    }
}

fn classify(
    session: &Session,
    selection: &Selection,
    preprocessor: &Preprocessor,
    pool: &TensorPool,
) -> Result<Vec<ResultItem>, InferenceError> {
    let image = decode_data_url(&selection.data_url)?;
    let input = preprocessor.tensor(&image).map_err(InferenceError::Runtime)?;
    let input = pool.adopt(input.into_tvalue());
    let outputs: Vec<PooledTensor> = session
        .model
        .predict(input.value())
        .map_err(InferenceError::Runtime)?
        .into_iter()
        .map(|t| pool.adopt(t))
        .collect();
    let output = outputs
        .first()
        .ok_or_else(|| InferenceError::Runtime(format_err!("Model has no output")))?;
    let probabilities = output.cast_to::<f32>().map_err(InferenceError::Runtime)?;
    let probabilities = probabilities.as_slice::<f32>().map_err(InferenceError::Runtime)?;
    debug!("Inference result: {:?}", probabilities);
    rank(&session.metadata.labels, probabilities)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelLoader;
    use crate::source::MemorySource;
    use anyhow::{bail, ensure};
    use image::{Rgb, RgbImage};
    use std::cell::Cell;
    use std::rc::Rc;
    use tract_core::prelude::{TValue, TVec, TractResult, tensor1, tvec};

    /// Returns fixed probabilities and counts calls.
    #[derive(Debug, Clone)]
    struct Fixed {
        probabilities: Vec<f32>,
        calls: Rc<Cell<usize>>,
    }

    impl Predictor for Fixed {
        fn predict(&self, input: TValue) -> TractResult<TVec<TValue>> {
            self.calls.set(self.calls.get() + 1);
            ensure!(input.shape() == &[1, 224, 224, 3]);
            let n = self.probabilities.len();
            Ok(tvec!(tensor1(&self.probabilities).into_shape(&[1, n])?.into_tvalue()))
        }
    }

    #[derive(Debug, Clone)]
    struct Failing;

    impl Predictor for Failing {
        fn predict(&self, _input: TValue) -> TractResult<TVec<TValue>> {
            bail!("kernel exploded")
        }
    }

    struct Loader<P: Predictor + Clone + 'static>(P);

    impl<P: Predictor + Clone + 'static> ModelLoader for Loader<P> {
        fn load_model(&self, _source: &dyn AssetSource) -> Result<Box<dyn Predictor>, LoadError> {
            Ok(Box::new(self.0.clone()))
        }
    }

    fn fixed(probabilities: &[f32]) -> (Loader<Fixed>, Rc<Cell<usize>>) {
        let calls = Rc::new(Cell::new(0));
        (Loader(Fixed { probabilities: probabilities.to_vec(), calls: calls.clone() }), calls)
    }

    fn cat_and_dog() -> MemorySource {
        MemorySource::default().with("metadata.json", r#"{"labels":["cat","dog"]}"#)
    }

    fn image_file(dir: &Path) -> PathBuf {
        let path = dir.join("pet.png");
        let image = RgbImage::from_fn(32, 24, |x, y| Rgb([x as u8 * 8, y as u8 * 10, 128]));
        image.save(&path).unwrap();
        path
    }

    fn loaded(probabilities: &[f32]) -> (App, Rc<Cell<usize>>) {
        crate::setup_test_logger();
        let (loader, calls) = fixed(probabilities);
        let mut app = App::new(Preprocessor::default()).unwrap();
        app.load(&cat_and_dog(), "metadata.json", &loader).unwrap();
        (app, calls)
    }

    #[test]
    fn load_success_shows_form() {
        let (app, _) = loaded(&[0.3, 0.7]);
        assert!(app.is_loaded());
        assert!(app.page().is_visible(INPUT_CONTAINER));
        assert_eq!(app.page().class(MODEL_STATUS), "alert alert-success");
        assert!(app.page().inner_html(MODEL_STATUS).contains("Model loaded successfully!"));
        assert_eq!(app.session().unwrap().metadata.labels.len(), 2);
    }

    #[test]
    fn metadata_404_keeps_form_hidden() {
        crate::setup_test_logger();
        let (loader, _) = fixed(&[0.3, 0.7]);
        let mut app = App::new(Preprocessor::default()).unwrap();
        let err = app.load(&MemorySource::default(), "metadata.json", &loader).unwrap_err();
        assert!(matches!(err, LoadError::Status { status: 404, .. }));
        assert!(!app.is_loaded());
        assert!(!app.page().is_visible(INPUT_CONTAINER));
        assert_eq!(app.page().class(MODEL_STATUS), "alert alert-danger");
        assert!(
            app.page()
                .inner_html(MODEL_STATUS)
                .contains("Error loading model: Failed to load metadata.json")
        );
    }

    #[test]
    fn model_failure_keeps_form_hidden() {
        struct Broken;
        impl ModelLoader for Broken {
            fn load_model(&self, _: &dyn AssetSource) -> Result<Box<dyn Predictor>, LoadError> {
                Err(LoadError::Model(format_err!("unsupported operator")))
            }
        }
        let mut app = App::new(Preprocessor::default()).unwrap();
        assert!(app.load(&cat_and_dog(), "metadata.json", &Broken).is_err());
        assert!(!app.page().is_visible(INPUT_CONTAINER));
        assert!(app.page().inner_html(MODEL_STATUS).contains("unsupported operator"));
    }

    #[test]
    fn cat_and_dog_ranked() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, calls) = loaded(&[0.3, 0.7]);
        app.select_file(image_file(dir.path())).unwrap();
        assert!(app.page().is_visible(PREVIEW_IMAGE));
        let src = app.page().element(PREVIEW_IMAGE).unwrap().src.clone().unwrap();
        assert!(src.starts_with("data:image/png;base64,"));

        let items = app.run_inference().unwrap();
        assert_eq!(calls.get(), 1);
        assert_eq!(items.iter().map(|i| &*i.label).collect::<Vec<_>>(), vec!["dog", "cat"]);
        assert_eq!(items.iter().map(|i| i.percentage()).collect::<Vec<_>>(), vec!["70.00", "30.00"]);

        let html = app.page().inner_html(INFERENCE_RESULT);
        assert_eq!(html.matches(r#"class="progress-bar""#).count(), 2);
        assert!(html.find("dog").unwrap() < html.find("cat").unwrap());
        assert!(app.page().is_visible(RESULT_CONTAINER));
        assert_eq!(app.pool().live(), 0);
    }

    #[test]
    fn no_file_alerts_without_calling_model() {
        let (mut app, calls) = loaded(&[0.3, 0.7]);
        let before = app.page().clone();
        let err = app.run_inference().unwrap_err();
        assert!(matches!(err, InferenceError::NoFile));
        assert_eq!(calls.get(), 0);
        assert_eq!(app.page().alerts(), &["Please select an image first!".to_string()]);
        assert_eq!(app.page().inner_html(INFERENCE_RESULT), before.inner_html(INFERENCE_RESULT));
        assert!(!app.page().is_visible(RESULT_CONTAINER));
    }

    #[test]
    fn not_loaded_alerts() {
        let mut app = App::new(Preprocessor::default()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        app.select_file(image_file(dir.path())).unwrap();
        assert!(app.selection().is_none());
        assert!(matches!(app.run_inference(), Err(InferenceError::ModelNotLoaded)));
        assert_eq!(app.page().alerts(), &["Model not loaded yet!".to_string()]);
    }

    #[test]
    fn label_mismatch_renders_error() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _) = loaded(&[0.2, 0.3, 0.5]);
        let err = app.classify_path(image_file(dir.path())).unwrap_err();
        assert!(matches!(err, InferenceError::LabelMismatch { labels: 2, outputs: 3 }));
        let html = app.page().inner_html(INFERENCE_RESULT);
        assert!(html.contains("alert alert-danger"));
        assert!(html.contains("Error during inference: Model produced 3 values for 2 labels"));
        assert_eq!(app.pool().live(), 0);
    }

    #[test]
    fn failures_release_tensors() {
        crate::setup_test_logger();
        let dir = tempfile::tempdir().unwrap();
        let mut app = App::new(Preprocessor::default()).unwrap();
        app.load(&cat_and_dog(), "metadata.json", &Loader(Failing)).unwrap();
        let before = app.pool().live();
        let err = app.classify_path(image_file(dir.path())).unwrap_err();
        assert!(err.to_string().contains("kernel exploded"));
        assert_eq!(app.pool().live(), before);
        assert!(app.page().inner_html(INFERENCE_RESULT).contains("kernel exploded"));
    }

    #[test]
    fn undecodable_file_fails_at_inference() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cat.png");
        std::fs::write(&path, "definitely not a png").unwrap();
        let (mut app, calls) = loaded(&[0.3, 0.7]);
        app.select_file(&path).unwrap();
        assert!(app.page().is_visible(PREVIEW_IMAGE));
        assert!(matches!(app.run_inference(), Err(InferenceError::Image(_))));
        assert_eq!(calls.get(), 0);
        assert!(app.page().inner_html(INFERENCE_RESULT).contains("Error during inference"));
    }

    #[test]
    fn unreadable_file_clears_selection() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _) = loaded(&[0.3, 0.7]);
        app.select_file(image_file(dir.path())).unwrap();
        assert!(app.select_file(dir.path().join("gone.png")).is_err());
        assert!(app.selection().is_none());
        assert!(matches!(app.run_inference(), Err(InferenceError::NoFile)));
    }

    #[test]
    fn repeated_runs_are_identical() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, calls) = loaded(&[0.3, 0.7]);
        let path = image_file(dir.path());
        let first = app.classify_path(&path).unwrap();
        let html = app.page().inner_html(INFERENCE_RESULT).to_string();
        let second = app.classify_path(&path).unwrap();
        assert_eq!(first, second);
        assert_eq!(app.page().inner_html(INFERENCE_RESULT), html);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn document_after_run() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _) = loaded(&[0.3, 0.7]);
        app.classify_path(image_file(dir.path())).unwrap();
        let html = app.document().unwrap();
        assert!(html.contains(r#"data-file="pet.png""#));
        assert!(html.contains("70.00%"));
    }
}
