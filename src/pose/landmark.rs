use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// 1ランドマークあたりの値の数 (x, y, z, visibility)
pub const VALUES_PER_LANDMARK: usize = 4;

/// 1フレームあたりの特徴量数 (33 × 4)
pub const FEATURES_PER_FRAME: usize = LandmarkIndex::COUNT * VALUES_PER_LANDMARK;

/// 33 ランドマークのインデックス（外部契約のため番号は変更しない）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum LandmarkIndex {
    Nose = 0,
    LeftEyeInner = 1,
    LeftEye = 2,
    LeftEyeOuter = 3,
    RightEyeInner = 4,
    RightEye = 5,
    RightEyeOuter = 6,
    LeftEar = 7,
    RightEar = 8,
    MouthLeft = 9,
    MouthRight = 10,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
    LeftThumb = 21,
    RightThumb = 22,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
    LeftHeel = 29,
    RightHeel = 30,
    LeftFootIndex = 31,
    RightFootIndex = 32,
}

impl LandmarkIndex {
    pub const COUNT: usize = 33;

    const ALL: [LandmarkIndex; Self::COUNT] = [
        Self::Nose,
        Self::LeftEyeInner,
        Self::LeftEye,
        Self::LeftEyeOuter,
        Self::RightEyeInner,
        Self::RightEye,
        Self::RightEyeOuter,
        Self::LeftEar,
        Self::RightEar,
        Self::MouthLeft,
        Self::MouthRight,
        Self::LeftShoulder,
        Self::RightShoulder,
        Self::LeftElbow,
        Self::RightElbow,
        Self::LeftWrist,
        Self::RightWrist,
        Self::LeftPinky,
        Self::RightPinky,
        Self::LeftIndex,
        Self::RightIndex,
        Self::LeftThumb,
        Self::RightThumb,
        Self::LeftHip,
        Self::RightHip,
        Self::LeftKnee,
        Self::RightKnee,
        Self::LeftAnkle,
        Self::RightAnkle,
        Self::LeftHeel,
        Self::RightHeel,
        Self::LeftFootIndex,
        Self::RightFootIndex,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// 単一ランドマーク
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Landmark {
    /// 正規化されたX座標
    pub x: f32,
    /// 正規化されたY座標（画像下方向が正）
    pub y: f32,
    /// 奥行き
    pub z: f32,
    /// 検出信頼度 (0.0〜1.0)
    pub visibility: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32, visibility: f32) -> Self {
        Self { x, y, z, visibility }
    }

    /// 3D位置（visibilityは含まない）
    pub fn position(&self) -> Vector3<f32> {
        Vector3::new(self.x, self.y, self.z)
    }
}

/// 33ランドマークからなる1フレーム
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub landmarks: [Landmark; LandmarkIndex::COUNT],
}

impl Frame {
    pub fn new(landmarks: [Landmark; LandmarkIndex::COUNT]) -> Self {
        Self { landmarks }
    }

    /// 132個の平坦化された特徴量から復元
    ///
    /// `4*i + {0,1,2,3}` がランドマーク i の `{x, y, z, visibility}` に対応する。
    /// 長さが132でない場合は None。
    pub fn from_features(features: &[f32]) -> Option<Self> {
        if features.len() != FEATURES_PER_FRAME {
            return None;
        }
        let mut landmarks = [Landmark::default(); LandmarkIndex::COUNT];
        for (lm, chunk) in landmarks
            .iter_mut()
            .zip(features.chunks_exact(VALUES_PER_LANDMARK))
        {
            *lm = Landmark::new(chunk[0], chunk[1], chunk[2], chunk[3]);
        }
        Some(Self { landmarks })
    }

    /// 132個の特徴量に平坦化
    pub fn to_features(&self) -> [f32; FEATURES_PER_FRAME] {
        let mut out = [0.0; FEATURES_PER_FRAME];
        for (i, lm) in self.landmarks.iter().enumerate() {
            let base = i * VALUES_PER_LANDMARK;
            out[base] = lm.x;
            out[base + 1] = lm.y;
            out[base + 2] = lm.z;
            out[base + 3] = lm.visibility;
        }
        out
    }

    /// インデックスでランドマークを取得
    pub fn get(&self, index: LandmarkIndex) -> &Landmark {
        &self.landmarks[index as usize]
    }

    pub fn set(&mut self, index: LandmarkIndex, landmark: Landmark) {
        self.landmarks[index as usize] = landmark;
    }

    /// 全ランドマークの平均信頼度
    pub fn average_visibility(&self) -> f32 {
        let sum: f32 = self.landmarks.iter().map(|l| l.visibility).sum();
        sum / LandmarkIndex::COUNT as f32
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self {
            landmarks: [Landmark::default(); LandmarkIndex::COUNT],
        }
    }
}
