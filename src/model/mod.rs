pub mod config;
pub mod engine;
pub mod onnx;
pub mod softmax;

pub use config::{ModelConfig, DEFAULT_SEQUENCE_LENGTH, UNKNOWN_CLASS};
pub use engine::{
    ClassificationResult, FormScore, InferenceBackend, InferenceEngine, RawOutput, REST_CLASS,
};
pub use onnx::{OnnxBackend, SessionOptions};
pub use softmax::{argmax, softmax};
