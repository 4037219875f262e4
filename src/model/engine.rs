use std::path::Path;

use ndarray::Array3;
use tracing::{debug, info, warn};

use super::config::ModelConfig;
use super::onnx::{OnnxBackend, SessionOptions};
use super::softmax::{argmax, softmax};
use crate::error::{PostureError, Result};
use crate::pose::{Window, FEATURES_PER_FRAME};

/// form confidence を持たないクラス
pub const REST_CLASS: &str = "rest";

/// 第2出力（フォーム信頼度）の状態
///
/// null になる理由を区別するため Option ではなく列挙型で持つ。
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FormScore {
    /// [0, 1] にクランプ済みの値
    Value(f32),
    /// モデルが第2出力を持たない
    NotProvided,
    /// 第2出力の読み取りに失敗
    Unreadable,
    /// 予測クラスが rest
    NotApplicable,
}

impl FormScore {
    /// 生の出力値から作成（NaN は読み取り失敗扱い）
    pub fn from_raw(raw: f32) -> Self {
        if raw.is_nan() {
            Self::Unreadable
        } else {
            Self::Value(raw.clamp(0.0, 1.0))
        }
    }

    pub fn value(&self) -> Option<f32> {
        match *self {
            Self::Value(v) => Some(v),
            _ => None,
        }
    }
}

/// 推論バックエンドの生出力
#[derive(Debug, Clone, PartialEq)]
pub struct RawOutput {
    /// 第1出力 [1, numClasses] のロジット
    pub logits: Vec<f32>,
    pub form: FormScore,
}

/// 推論ランタイムの境界
///
/// 複数スレッドから同時に呼ばれるため、実装は自身で排他を行う。
pub trait InferenceBackend: Send + Sync {
    fn run(&self, input: Array3<f32>) -> Result<RawOutput>;
}

/// 分類結果
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    pub predicted_class: String,
    /// predicted_class の確率
    pub score: f32,
    pub probabilities: Vec<f32>,
    pub class_names: Vec<String>,
    pub form: FormScore,
}

impl ClassificationResult {
    /// ロジットを正規化し、クラス名と form confidence を決定する
    pub fn from_raw(raw: RawOutput, config: &ModelConfig) -> Result<Self> {
        let probabilities = softmax(&raw.logits);
        let best = argmax(&probabilities)
            .ok_or_else(|| PostureError::Inference("model returned no logits".to_string()))?;

        if probabilities.len() != config.num_classes() {
            warn!(
                "model returned {} logits but config lists {} classes",
                probabilities.len(),
                config.num_classes()
            );
        }

        let predicted_class = config.class_name(best).to_string();
        let form = if predicted_class.eq_ignore_ascii_case(REST_CLASS) {
            FormScore::NotApplicable
        } else {
            raw.form
        };

        Ok(Self {
            score: probabilities[best],
            predicted_class,
            probabilities,
            class_names: config.class_names.clone(),
            form,
        })
    }

    pub fn form_confidence(&self) -> Option<f32> {
        self.form.value()
    }
}

/// モデルと設定を保持する推論エンジン（プロセス内で1つ）
pub struct InferenceEngine {
    backend: Box<dyn InferenceBackend>,
    config: ModelConfig,
}

impl InferenceEngine {
    /// ONNXモデルと設定を読み込んで初期化
    ///
    /// 設定の読み込みに失敗した場合、構築済みのセッションはここで解放される。
    pub fn load<P: AsRef<Path>, Q: AsRef<Path>>(
        model_path: P,
        config_path: Q,
        options: &SessionOptions,
    ) -> Result<Self> {
        let backend = OnnxBackend::load(model_path.as_ref(), options)?;
        let config = ModelConfig::load(config_path)?;
        info!(
            "model ready: input={}, form_output={}, sequence_length={}, classes={:?}",
            backend.input_name(),
            backend.has_form_output(),
            config.sequence_length,
            config.class_names
        );
        Ok(Self::with_backend(backend, config))
    }

    pub fn with_backend<B: InferenceBackend + 'static>(backend: B, config: ModelConfig) -> Self {
        Self {
            backend: Box::new(backend),
            config,
        }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn sequence_length(&self) -> usize {
        self.config.sequence_length
    }

    /// 生配列を設定の形状で検証してウィンドウにする
    pub fn assemble_window(&self, raw: &[Vec<Vec<f32>>]) -> Result<Window> {
        Window::from_nested(raw, self.config.sequence_length)
    }

    /// ウィンドウを推論し、ロジットと form score を返す
    pub fn classify(&self, window: Window) -> Result<RawOutput> {
        let expected = [1, self.config.sequence_length, FEATURES_PER_FRAME];
        let actual = window.shape();
        if actual != expected {
            return Err(PostureError::InvalidShape { expected, actual });
        }

        let output = self.backend.run(window.into_tensor())?;
        if output.logits.is_empty() {
            return Err(PostureError::Inference("model returned no logits".to_string()));
        }
        debug!("logits={:?} form={:?}", output.logits, output.form);
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{Frame, Landmark, LandmarkIndex};

    struct FixedBackend(RawOutput);

    impl InferenceBackend for FixedBackend {
        fn run(&self, _input: Array3<f32>) -> Result<RawOutput> {
            Ok(self.0.clone())
        }
    }

    struct FailingBackend;

    impl InferenceBackend for FailingBackend {
        fn run(&self, _input: Array3<f32>) -> Result<RawOutput> {
            Err(PostureError::Inference("session corrupted".to_string()))
        }
    }

    fn config() -> ModelConfig {
        ModelConfig::new(
            3,
            vec!["rest".to_string(), "squat".to_string(), "push_up".to_string()],
        )
    }

    fn window(steps: usize) -> Window {
        Window::from_frames(&vec![Frame::default(); steps])
    }

    #[test]
    fn test_form_score_clamped() {
        assert_eq!(FormScore::from_raw(1.7), FormScore::Value(1.0));
        assert_eq!(FormScore::from_raw(-0.2), FormScore::Value(0.0));
        assert_eq!(FormScore::from_raw(0.42).value(), Some(0.42));
        assert_eq!(FormScore::from_raw(f32::NAN), FormScore::Unreadable);
        assert_eq!(FormScore::NotProvided.value(), None);
    }

    #[test]
    fn test_from_raw_picks_argmax() {
        let raw = RawOutput {
            logits: vec![0.1, 3.0, 0.5],
            form: FormScore::Value(0.8),
        };
        let result = ClassificationResult::from_raw(raw, &config()).unwrap();
        assert_eq!(result.predicted_class, "squat");
        assert_eq!(result.score, result.probabilities[1]);
        assert_eq!(result.form_confidence(), Some(0.8));
        assert!((result.probabilities.iter().sum::<f32>() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_rest_has_no_form_confidence() {
        let raw = RawOutput {
            logits: vec![5.0, 0.0, 0.0],
            form: FormScore::Value(0.9),
        };
        let result = ClassificationResult::from_raw(raw, &config()).unwrap();
        assert_eq!(result.predicted_class, "rest");
        assert_eq!(result.form, FormScore::NotApplicable);
        assert_eq!(result.form_confidence(), None);
    }

    #[test]
    fn test_out_of_range_index_is_unknown() {
        let raw = RawOutput {
            logits: vec![0.0, 0.0, 0.0, 9.0],
            form: FormScore::NotProvided,
        };
        let result = ClassificationResult::from_raw(raw, &config()).unwrap();
        assert_eq!(result.predicted_class, "unknown");
        assert_eq!(result.probabilities.len(), 4);
    }

    #[test]
    fn test_empty_logits_is_inference_error() {
        let raw = RawOutput {
            logits: vec![],
            form: FormScore::NotProvided,
        };
        assert!(matches!(
            ClassificationResult::from_raw(raw, &config()),
            Err(PostureError::Inference(_))
        ));
    }

    #[test]
    fn test_classify_returns_backend_output() {
        let expected = RawOutput {
            logits: vec![1.0, 2.0, 3.0],
            form: FormScore::Unreadable,
        };
        let engine = InferenceEngine::with_backend(FixedBackend(expected.clone()), config());
        assert_eq!(engine.classify(window(3)).unwrap(), expected);
    }

    #[test]
    fn test_classify_rejects_wrong_length_window() {
        let engine = InferenceEngine::with_backend(
            FixedBackend(RawOutput {
                logits: vec![1.0],
                form: FormScore::NotProvided,
            }),
            config(),
        );
        assert!(matches!(
            engine.classify(window(2)),
            Err(PostureError::InvalidShape { .. })
        ));
    }

    #[test]
    fn test_classify_propagates_backend_failure() {
        let engine = InferenceEngine::with_backend(FailingBackend, config());
        assert!(matches!(
            engine.classify(window(3)),
            Err(PostureError::Inference(_))
        ));
    }

    #[test]
    fn test_assemble_window_uses_configured_length() {
        let engine = InferenceEngine::with_backend(FailingBackend, config());
        let mut frame = Frame::default();
        frame.set(LandmarkIndex::LeftHip, Landmark::new(0.5, 0.5, 0.0, 1.0));
        let row = frame.to_features().to_vec();

        assert!(engine.assemble_window(&[vec![row.clone(); 3]]).is_ok());
        assert!(engine.assemble_window(&[vec![row; 4]]).is_err());
    }
}
