//! Classification + posture rules merged into one response.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PostureError, Result};
use crate::model::{ClassificationResult, InferenceEngine};
use crate::pose::FEATURES_PER_FRAME;
use crate::rules::{self, FormFlag, RuleResult};

/// Final response for one window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostureResponse {
    pub predicted_class: String,
    pub score: f32,
    pub probabilities: Vec<f32>,
    pub class_names: Vec<String>,
    pub form_confidence: Option<f32>,
    pub flags: Vec<FormFlag>,
    pub messages: Vec<String>,
}

/// Merge the two halves. Pure, no validation.
pub fn assemble(classification: ClassificationResult, rules: RuleResult) -> PostureResponse {
    let form_confidence = classification.form_confidence();
    PostureResponse {
        predicted_class: classification.predicted_class,
        score: classification.score,
        probabilities: classification.probabilities,
        class_names: classification.class_names,
        form_confidence,
        flags: rules.flags.into_iter().collect(),
        messages: rules.messages,
    }
}

/// Stateless analysis pipeline shared by every caller
pub struct PostureService {
    engine: Option<InferenceEngine>,
}

impl PostureService {
    pub fn new(engine: InferenceEngine) -> Self {
        Self {
            engine: Some(engine),
        }
    }

    /// Service with no model loaded; every call fails with `ModelDisabled`
    pub fn disabled() -> Self {
        Self { engine: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.engine.is_some()
    }

    pub fn engine(&self) -> Option<&InferenceEngine> {
        self.engine.as_ref()
    }

    /// Validate the window, classify it and run the rules for the predicted class
    /// on its last frame.
    pub fn analyze(&self, window: Option<&[Vec<Vec<f32>>]>) -> Result<PostureResponse> {
        let raw = window.ok_or(PostureError::MissingWindow)?;
        let engine = self.engine.as_ref().ok_or(PostureError::ModelDisabled)?;

        let window = engine.assemble_window(raw)?;
        let last_frame = window.last_frame().ok_or(PostureError::InvalidShape {
            expected: [1, engine.sequence_length(), FEATURES_PER_FRAME],
            actual: window.shape(),
        })?;

        let output = engine.classify(window)?;
        let classification = ClassificationResult::from_raw(output, engine.config())?;
        let rule_result = rules::evaluate(&classification.predicted_class, &last_frame);

        debug!(
            "classified {} (score={:.3}, flags={:?})",
            classification.predicted_class,
            classification.score,
            rule_result.flag_names()
        );
        Ok(assemble(classification, rule_result))
    }
}
