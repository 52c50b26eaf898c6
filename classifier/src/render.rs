use anyhow::Context;
use liquid::model::Value;
use liquid::{Object, Template};
use tract_core::internal::*;

use crate::page::*;
use crate::results::ResultItem;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelPhase<'a> {
    Loading,
    Loaded,
    Failed(&'a str),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InferencePhase<'a> {
    Running,
    Done(&'a [ResultItem]),
    Failed(&'a str),
}

/// A rendered region: the class to set on the element, if any, and its
/// inner HTML.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fragment {
    pub class: Option<&'static str>,
    pub html: String,
}

const MODEL_LOADING: &str = r#"<div class="spinner-border spinner-border-sm me-2" role="status"></div>Loading model..."#;

const MODEL_LOADED: &str = r#"<i class="bi bi-check-circle me-2"></i>Model loaded successfully!"#;

const MODEL_FAILED: &str =
    r#"<i class="bi bi-exclamation-triangle me-2"></i>Error loading model: {{ message | escape }}"#;

const RUNNING: &str = r#"<div class="text-center"><div class="spinner-border text-primary" role="status"><span class="visually-hidden">Analyzing...</span></div><p class="mt-2">Analyzing image...</p></div>"#;

const RESULTS: &str = r#"{% for result in results %}
<div class="mb-3">
    <div class="d-flex justify-content-between align-items-center mb-1">
        <span class="fw-bold">{{ result.label | escape }}</span>
        <span class="badge bg-primary">{{ result.percentage }}%</span>
    </div>
    <div class="progress">
        <div class="progress-bar" role="progressbar"
             style="width: {{ result.percentage }}%"
             aria-valuenow="{{ result.percentage }}"
             aria-valuemin="0"
             aria-valuemax="100">
        </div>
    </div>
</div>
{% endfor %}"#;

const INFERENCE_FAILED: &str = r#"
<div class="alert alert-danger">
    <i class="bi bi-exclamation-triangle me-2"></i>
    Error during inference: {{ message | escape }}
</div>"#;

const DOCUMENT: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Image classification</title>
<link href="https://cdn.jsdelivr.net/npm/bootstrap@5.3.0/dist/css/bootstrap.min.css" rel="stylesheet">
<link href="https://cdn.jsdelivr.net/npm/bootstrap-icons@1.10.5/font/bootstrap-icons.css" rel="stylesheet">
</head>
<body>
<div class="container py-4">
<div id="model-status" class="{{ status.class }}"{{ status.style }}>{{ status.html }}</div>
<div id="input-container"{{ input.style }}>
<input type="file" class="form-control" id="image-input" accept="image/*"{% if file %} data-file="{{ file | escape }}"{% endif %}>
<img id="preview-image" class="img-fluid mt-3" alt="preview"{% if preview.src %} src="{{ preview.src }}"{% endif %}{{ preview.style }}>
</div>
<div id="result-container"{{ results.style }}>
<div id="inference-result"{{ inference.style }}>{{ inference.html }}</div>
</div>
</div>
</body>
</html>
"#;

const ABOUT: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>About</title>
<link href="https://cdn.jsdelivr.net/npm/bootstrap@5.3.0/dist/css/bootstrap.min.css" rel="stylesheet">
</head>
<body>
<div class="container py-4">
<h1>About</h1>
<p>Image classification with a pre-trained model. Pick an image on the
<a href="/inference">inference page</a> to see the probability of each label.</p>
<p>Model files are served from <code>/model/</code>.</p>
</div>
</body>
</html>
"#;

/// Parsed templates for every region of the page.
pub struct Renderer {
    model_loading: Template,
    model_loaded: Template,
    model_failed: Template,
    running: Template,
    results: Template,
    inference_failed: Template,
    document: Template,
    about: Template,
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "Renderer")
    }
}

impl Renderer {
    pub fn new() -> TractResult<Renderer> {
        let parser = liquid::ParserBuilder::with_stdlib().build()?;
        let parse = |name: &str, source: &str| -> TractResult<Template> {
            parser.parse(source).with_context(|| format!("Parsing {name} template"))
        };
        Ok(Renderer {
            model_loading: parse("model loading", MODEL_LOADING)?,
            model_loaded: parse("model loaded", MODEL_LOADED)?,
            model_failed: parse("model failed", MODEL_FAILED)?,
            running: parse("running", RUNNING)?,
            results: parse("results", RESULTS)?,
            inference_failed: parse("inference failed", INFERENCE_FAILED)?,
            document: parse("document", DOCUMENT)?,
            about: parse("about", ABOUT)?,
        })
    }

    pub fn model_status(&self, phase: ModelPhase) -> TractResult<Fragment> {
        let (class, template, globals) = match phase {
            ModelPhase::Loading => ("alert alert-info", &self.model_loading, Object::new()),
            ModelPhase::Loaded => ("alert alert-success", &self.model_loaded, Object::new()),
            ModelPhase::Failed(message) => {
                ("alert alert-danger", &self.model_failed, message_globals(message))
            }
        };
        Ok(Fragment { class: Some(class), html: template.render(&globals)? })
    }

    pub fn inference(&self, phase: InferencePhase) -> TractResult<Fragment> {
        let html = match phase {
            InferencePhase::Running => self.running.render(&Object::new())?,
            InferencePhase::Done(items) => self.results.render(&results_globals(items))?,
            InferencePhase::Failed(message) => {
                self.inference_failed.render(&message_globals(message))?
            }
        };
        Ok(Fragment { class: None, html })
    }

    /// The whole page as a standalone HTML document.
    pub fn document(&self, page: &Page) -> TractResult<String> {
        let mut globals = Object::new();
        for (key, id) in [
            ("status", MODEL_STATUS),
            ("input", INPUT_CONTAINER),
            ("preview", PREVIEW_IMAGE),
            ("results", RESULT_CONTAINER),
            ("inference", INFERENCE_RESULT),
        ] {
            globals.insert(key.into(), element_value(page.element(id)));
        }
        let file = page.element(IMAGE_INPUT).and_then(|e| e.value.clone());
        globals.insert("file".into(), file.map(Value::scalar).unwrap_or(Value::Nil));
        Ok(self.document.render(&globals)?)
    }

    pub fn about(&self) -> TractResult<String> {
        Ok(self.about.render(&Object::new())?)
    }
}

fn message_globals(message: &str) -> Object {
    let mut globals = Object::new();
    globals.insert("message".into(), Value::scalar(message.to_string()));
    globals
}

fn results_globals(items: &[ResultItem]) -> Object {
    let results = items
        .iter()
        .map(|item| {
            let mut object = Object::new();
            object.insert("label".into(), Value::scalar(item.label.clone()));
            object.insert("percentage".into(), Value::scalar(item.percentage()));
            Value::Object(object)
        })
        .collect();
    let mut globals = Object::new();
    globals.insert("results".into(), Value::Array(results));
    globals
}

fn element_value(element: Option<&Element>) -> Value {
    let e = element.cloned().unwrap_or_default();
    let mut object = Object::new();
    object.insert("class".into(), Value::scalar(e.class));
    object.insert("html".into(), Value::scalar(e.inner_html));
    let style = if e.visible { "" } else { r#" style="display: none""# };
    object.insert("style".into(), Value::scalar(style));
    object.insert("src".into(), e.src.map(Value::scalar).unwrap_or(Value::Nil));
    Value::Object(object)
}
