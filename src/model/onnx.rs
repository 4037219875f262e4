use std::fs;
use std::path::Path;
use std::sync::Mutex;

use ndarray::Array3;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::{DynValue, Tensor};
use tracing::{debug, info, warn};

use super::engine::{FormScore, InferenceBackend, RawOutput};
use crate::error::{PostureError, Result};

/// セッション構築オプション
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// グラフ最適化レベル (0〜3)
    pub optimization_level: u8,
    /// intra-op スレッド数（None でランタイム任せ）
    pub intra_threads: Option<usize>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            optimization_level: 3,
            intra_threads: None,
        }
    }
}

fn optimization_level(level: u8) -> GraphOptimizationLevel {
    match level {
        0 => GraphOptimizationLevel::Disable,
        1 => GraphOptimizationLevel::Level1,
        2 => GraphOptimizationLevel::Level2,
        _ => GraphOptimizationLevel::Level3,
    }
}

/// モデルのバイト列からセッションを構築
pub fn build_session(model_bytes: &[u8], options: &SessionOptions) -> ort::Result<Session> {
    let builder = Session::builder()?
        .with_optimization_level(optimization_level(options.optimization_level))?;

    let builder = match options.intra_threads {
        Some(n) => builder.with_intra_threads(n)?,
        None => builder,
    };

    builder.commit_from_memory(model_bytes)
}

/// ONNX Runtime による推論バックエンド
///
/// `Session::run` は `&mut self` を要求するため、run と出力の取り出しだけを
/// Mutex で直列化する。入力テンソルの構築はロックの外で行う。
pub struct OnnxBackend {
    session: Mutex<Session>,
    input_name: String,
    output_names: Vec<String>,
}

impl OnnxBackend {
    /// モデルファイルを読み込んでセッションを構築
    pub fn load(model_path: &Path, options: &SessionOptions) -> Result<Self> {
        let bytes = fs::read(model_path).map_err(|e| {
            PostureError::ModelLoad(format!("failed to read {}: {}", model_path.display(), e))
        })?;
        let session = build_session(&bytes, options)
            .map_err(|e| PostureError::ModelLoad(format!("failed to build session: {}", e)))?;

        // 入力名はエクスポート差異を吸収するためメタデータから取得する
        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .ok_or_else(|| PostureError::ModelLoad("ONNX model has no inputs".to_string()))?;
        let output_names: Vec<String> = session.outputs.iter().map(|o| o.name.clone()).collect();
        if output_names.is_empty() {
            return Err(PostureError::ModelLoad("ONNX model has no outputs".to_string()));
        }

        info!(
            "ONNX model loaded: {} (outputs={:?})",
            model_path.display(),
            output_names
        );

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            output_names,
        })
    }

    pub fn input_name(&self) -> &str {
        &self.input_name
    }

    pub fn has_form_output(&self) -> bool {
        self.output_names.len() > 1
    }
}

impl InferenceBackend for OnnxBackend {
    fn run(&self, input: Array3<f32>) -> Result<RawOutput> {
        let input_tensor = Tensor::from_array(input)
            .map_err(|e| PostureError::Inference(format!("failed to build input tensor: {}", e)))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| PostureError::Inference("session lock poisoned".to_string()))?;
        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input_tensor])
            .map_err(|e| PostureError::Inference(e.to_string()))?;

        // 第1出力: [1, numClasses] のロジット
        let logits = read_logits(&outputs[self.output_names[0].as_str()])?;

        // 第2出力: [1, 1] のフォーム信頼度（読めなくても分類は返す）
        let form = match self.output_names.get(1) {
            Some(name) => read_form_score(&outputs[name.as_str()]),
            None => FormScore::NotProvided,
        };

        Ok(RawOutput { logits, form })
    }
}

impl Drop for OnnxBackend {
    fn drop(&mut self) {
        debug!("ONNX session released (input={})", self.input_name);
    }
}

fn read_logits(value: &DynValue) -> Result<Vec<f32>> {
    let array = value
        .try_extract_array::<f32>()
        .map_err(|e| PostureError::Inference(format!("failed to extract logits: {}", e)))?;
    // [1, numClasses] 以外は受け付けない
    if array.ndim() != 2 || array.shape()[0] != 1 {
        return Err(PostureError::Inference(format!(
            "unexpected logits shape {:?}",
            array.shape()
        )));
    }
    Ok(array.iter().copied().collect())
}

fn read_form_score(value: &DynValue) -> FormScore {
    match value.try_extract_array::<f32>() {
        Ok(array) => match array.iter().next() {
            Some(&raw) => FormScore::from_raw(raw),
            None => {
                warn!("form confidence output is empty");
                FormScore::Unreadable
            }
        },
        Err(e) => {
            warn!("could not extract form confidence: {}", e);
            FormScore::Unreadable
        }
    }
}
