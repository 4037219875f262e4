use thiserror::Error;

/// 姿勢解析パイプラインのエラー
#[derive(Debug, Error)]
pub enum PostureError {
    /// 入力ウィンドウの形状が [1, T, 132] と一致しない
    #[error(
        "input window must be shaped [{}, {}, {}] but got [{}, {}, {}]",
        expected[0], expected[1], expected[2], actual[0], actual[1], actual[2]
    )]
    InvalidShape {
        expected: [usize; 3],
        actual: [usize; 3],
    },

    #[error("window data is missing")]
    MissingWindow,

    /// モデルの読み込み失敗（起動時のみ）
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    #[error("invalid model config: {0}")]
    ModelConfig(String),

    /// 推論実行の失敗
    #[error("inference failed: {0}")]
    Inference(String),

    #[error("posture model is disabled")]
    ModelDisabled,
}

impl PostureError {
    /// クライアント側の入力に起因するエラーか
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidShape { .. } | Self::MissingWindow)
    }

    /// クライアントに返すメッセージ
    /// 形状エラー以外は内部状態を含めない
    pub fn public_message(&self) -> String {
        if self.is_client_error() {
            self.to_string()
        } else {
            "Error processing posture".to_string()
        }
    }
}

pub type Result<T> = std::result::Result<T, PostureError>;
