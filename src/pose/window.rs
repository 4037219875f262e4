use ndarray::{s, Array3};

use super::landmark::{Frame, FEATURES_PER_FRAME};
use crate::error::{PostureError, Result};

/// バッチ次元（1固定）
pub const BATCH_SIZE: usize = 1;

/// 推論1回分の入力ウィンドウ
///
/// 形状は常に [1, T, 132]。T はモデル設定の sequence length。
/// 構築時に検証済みなので、保持している限り形状は保証される。
#[derive(Debug, Clone)]
pub struct Window {
    data: Array3<f32>,
}

impl Window {
    /// ネストされた生配列 `[1][T][132]` を検証してウィンドウを構築
    ///
    /// 不一致は切り詰めもパディングもせず `InvalidShape` を返す。
    pub fn from_nested(raw: &[Vec<Vec<f32>>], sequence_length: usize) -> Result<Self> {
        let expected = [BATCH_SIZE, sequence_length, FEATURES_PER_FRAME];

        let steps = raw.first().map_or(0, |b| b.len());
        let features = raw
            .first()
            .and_then(|b| b.iter().map(Vec::len).find(|&n| n != FEATURES_PER_FRAME))
            .or_else(|| raw.first().and_then(|b| b.first()).map(Vec::len))
            .unwrap_or(0);
        let actual = [raw.len(), steps, features];

        if actual != expected {
            return Err(PostureError::InvalidShape { expected, actual });
        }

        let mut data = Array3::<f32>::zeros((BATCH_SIZE, sequence_length, FEATURES_PER_FRAME));
        for (t, row) in raw[0].iter().enumerate() {
            for (f, &value) in row.iter().enumerate() {
                data[[0, t, f]] = value;
            }
        }

        Ok(Self { data })
    }

    /// 時系列順のフレーム列からウィンドウを構築
    pub fn from_frames(frames: &[Frame]) -> Self {
        let mut data = Array3::<f32>::zeros((BATCH_SIZE, frames.len(), FEATURES_PER_FRAME));
        for (t, frame) in frames.iter().enumerate() {
            for (f, value) in frame.to_features().into_iter().enumerate() {
                data[[0, t, f]] = value;
            }
        }
        Self { data }
    }

    pub fn sequence_length(&self) -> usize {
        self.data.shape()[1]
    }

    pub fn shape(&self) -> [usize; 3] {
        let s = self.data.shape();
        [s[0], s[1], s[2]]
    }

    /// 最終タイムステップをフレームとして取り出す（ルール評価用）
    ///
    /// タイムステップが0のウィンドウでは None
    pub fn last_frame(&self) -> Option<Frame> {
        let last = self.sequence_length().checked_sub(1)?;
        let row = self.data.slice(s![0, last, ..]);
        let features: Vec<f32> = row.iter().copied().collect();
        Frame::from_features(&features)
    }

    pub fn as_array(&self) -> &Array3<f32> {
        &self.data
    }

    /// 推論用テンソルとして取り出す
    pub fn into_tensor(self) -> Array3<f32> {
        self.data
    }
}
