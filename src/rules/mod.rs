//! Exercise-specific posture rules evaluated on the last frame of a window.

pub mod exercise;
pub mod geometry;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::pose::Frame;

pub use exercise::Exercise;

/// Detected form fault
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormFlag {
    DepthLow,
    KneesIn,
    ChestUp,
    Pike,
    Sag,
    LowRom,
}

impl FormFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormFlag::DepthLow => "depth_low",
            FormFlag::KneesIn => "knees_in",
            FormFlag::ChestUp => "chest_up",
            FormFlag::Pike => "pike",
            FormFlag::Sag => "sag",
            FormFlag::LowRom => "low_rom",
        }
    }
}

/// Flags (deduplicated) and coaching messages in evaluation order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleResult {
    pub flags: BTreeSet<FormFlag>,
    pub messages: Vec<String>,
}

impl RuleResult {
    /// Record a triggered rule
    pub fn flag(&mut self, flag: FormFlag, message: &str) {
        self.flags.insert(flag);
        self.messages.push(message.to_string());
    }

    /// Message that does not correspond to a fault
    pub fn note(&mut self, message: &str) {
        self.messages.push(message.to_string());
    }

    pub fn contains(&self, flag: FormFlag) -> bool {
        self.flags.contains(&flag)
    }

    pub fn flag_names(&self) -> Vec<String> {
        self.flags.iter().map(|f| f.as_str().to_string()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty() && self.messages.is_empty()
    }
}

/// Evaluate the rules for `predicted_class` on one frame.
/// Classes without rules yield an empty result.
pub fn evaluate(predicted_class: &str, frame: &Frame) -> RuleResult {
    let mut result = RuleResult::default();
    match Exercise::from_class_name(predicted_class) {
        Some(exercise) => {
            exercise.apply(frame, &mut result);
            debug!("{} rules: flags={:?}", exercise.as_str(), result.flag_names());
        }
        None => debug!("no rules for class {:?}", predicted_class),
    }
    result
}
