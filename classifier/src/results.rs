use serde::Serialize;

use crate::errors::InferenceError;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResultItem {
    pub label: String,
    pub probability: f32,
}

impl ResultItem {
    /// Probability as a percentage with two decimals, without the sign.
    pub fn percentage(&self) -> String {
        format!("{:.2}", f64::from(self.probability) * 100.0)
    }

    /// The percentage as displayed, back to a number.
    fn displayed(&self) -> f64 {
        self.percentage().parse().unwrap_or(f64::NAN)
    }
}

/// Pair labels with probabilities and sort them, most likely first, on the
/// displayed two-decimal value. The sort is stable: items showing the same
/// percentage keep the label order.
pub fn rank(labels: &[String], probabilities: &[f32]) -> Result<Vec<ResultItem>, InferenceError> {
    if labels.len() != probabilities.len() {
        return Err(InferenceError::LabelMismatch {
            labels: labels.len(),
            outputs: probabilities.len(),
        });
    }
    let mut items: Vec<(f64, ResultItem)> = labels
        .iter()
        .zip(probabilities)
        .map(|(label, &probability)| {
            let item = ResultItem { label: label.clone(), probability };
            (item.displayed(), item)
        })
        .collect();
    items.sort_by(|a, b| b.0.total_cmp(&a.0));
    Ok(items.into_iter().map(|(_, item)| item).collect())
}
