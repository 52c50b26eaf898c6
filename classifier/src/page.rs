//! In-memory model of the page elements the classifier drives.

use std::collections::BTreeMap;

pub const MODEL_STATUS: &str = "model-status";
pub const INPUT_CONTAINER: &str = "input-container";
pub const IMAGE_INPUT: &str = "image-input";
pub const PREVIEW_IMAGE: &str = "preview-image";
pub const RESULT_CONTAINER: &str = "result-container";
pub const INFERENCE_RESULT: &str = "inference-result";

pub const ELEMENT_IDS: [&str; 6] =
    [MODEL_STATUS, INPUT_CONTAINER, IMAGE_INPUT, PREVIEW_IMAGE, RESULT_CONTAINER, INFERENCE_RESULT];

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Element {
    pub class: String,
    pub inner_html: String,
    pub visible: bool,
    pub src: Option<String>,
    pub value: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Page {
    elements: BTreeMap<&'static str, Element>,
    alerts: Vec<String>,
}

impl Default for Page {
    fn default() -> Page {
        Page::new()
    }
}

impl Page {
    /// Initial state: status visible, everything else hidden.
    pub fn new() -> Page {
        let mut elements: BTreeMap<&'static str, Element> =
            ELEMENT_IDS.iter().map(|id| (*id, Element::default())).collect();
        for id in [MODEL_STATUS, IMAGE_INPUT, INFERENCE_RESULT] {
            if let Some(e) = elements.get_mut(id) {
                e.visible = true;
            }
        }
        Page { elements, alerts: vec![] }
    }

    pub fn element(&self, id: &str) -> Option<&Element> {
        self.elements.get(id)
    }

    pub fn elements(&self) -> impl Iterator<Item = (&'static str, &Element)> {
        self.elements.iter().map(|(id, e)| (*id, e))
    }

    fn element_mut(&mut self, id: &'static str) -> &mut Element {
        self.elements.entry(id).or_default()
    }

    pub fn is_visible(&self, id: &str) -> bool {
        self.element(id).is_some_and(|e| e.visible)
    }

    pub fn class(&self, id: &str) -> &str {
        self.element(id).map(|e| &*e.class).unwrap_or("")
    }

    pub fn inner_html(&self, id: &str) -> &str {
        self.element(id).map(|e| &*e.inner_html).unwrap_or("")
    }

    pub fn set_class(&mut self, id: &'static str, class: impl Into<String>) {
        self.element_mut(id).class = class.into();
    }

    pub fn set_inner_html(&mut self, id: &'static str, html: impl Into<String>) {
        self.element_mut(id).inner_html = html.into();
    }

    pub fn set_src(&mut self, id: &'static str, src: Option<String>) {
        self.element_mut(id).src = src;
    }

    pub fn set_value(&mut self, id: &'static str, value: Option<String>) {
        self.element_mut(id).value = value;
    }

    pub fn show(&mut self, id: &'static str) {
        self.element_mut(id).visible = true;
    }

    pub fn hide(&mut self, id: &'static str) {
        self.element_mut(id).visible = false;
    }

    pub fn alert(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("alert: {}", message);
        self.alerts.push(message);
    }

    pub fn alerts(&self) -> &[String] {
        &self.alerts
    }
}
