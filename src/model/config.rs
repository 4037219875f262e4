use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{PostureError, Result};

/// sequence length の設定が見つからない場合の既定値
pub const DEFAULT_SEQUENCE_LENGTH: usize = 45;

/// 範囲外のクラスインデックスに割り当てる名前
pub const UNKNOWN_CLASS: &str = "unknown";

/// sequence length の探索順（先頭ほど新しいレイアウト）
const SEQUENCE_LENGTH_KEYS: &[&[&str]] = &[
    &["model", "sequence_length"],
    &["sequenceLength"],
    &["time_steps"],
];

/// クラス名の探索順
const CLASS_NAME_KEYS: &[&[&str]] = &[
    &["classes", "pose_classes"],
    &["classNames"],
    &["class_names"],
];

/// モデル付属の設定（起動時に一度だけ読み込む）
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub sequence_length: usize,
    pub class_names: Vec<String>,
}

impl ModelConfig {
    pub fn new(sequence_length: usize, class_names: Vec<String>) -> Self {
        Self {
            sequence_length,
            class_names,
        }
    }

    /// JSONファイルから読み込み
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            PostureError::ModelConfig(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(content)
            .map_err(|e| PostureError::ModelConfig(format!("malformed JSON: {}", e)))?;
        Self::from_value(&value)
    }

    /// 複数のキーレイアウトを優先順に試し、最初に成功したものを採用する
    /// 異なるレイアウトの値をマージすることはない
    pub fn from_value(value: &Value) -> Result<Self> {
        let sequence_length = first_match(value, SEQUENCE_LENGTH_KEYS, parse_sequence_length)
            .unwrap_or_else(|| {
                debug!("no sequence length key found, using {}", DEFAULT_SEQUENCE_LENGTH);
                DEFAULT_SEQUENCE_LENGTH
            });
        if sequence_length == 0 {
            return Err(PostureError::ModelConfig(
                "sequence length must be positive".to_string(),
            ));
        }

        let class_names = first_match(value, CLASS_NAME_KEYS, parse_class_names).ok_or_else(|| {
            PostureError::ModelConfig(
                "class names not found (classes.pose_classes, classNames or class_names)"
                    .to_string(),
            )
        })?;
        if class_names.is_empty() {
            return Err(PostureError::ModelConfig("class names are empty".to_string()));
        }

        Ok(Self {
            sequence_length,
            class_names,
        })
    }

    pub fn num_classes(&self) -> usize {
        self.class_names.len()
    }

    /// クラスインデックス → クラス名（範囲外は "unknown"）
    pub fn class_name(&self, index: usize) -> &str {
        self.class_names
            .get(index)
            .map(String::as_str)
            .unwrap_or(UNKNOWN_CLASS)
    }
}

fn lookup<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |node, key| node.get(key))
}

fn first_match<T>(
    value: &Value,
    strategies: &[&[&str]],
    parse: fn(&Value) -> Option<T>,
) -> Option<T> {
    for path in strategies {
        let Some(node) = lookup(value, path) else {
            continue;
        };
        match parse(node) {
            Some(parsed) => return Some(parsed),
            None => warn!("ignoring unparsable model config key {}", path.join(".")),
        }
    }
    None
}

/// 整数値の浮動小数（30.0 など）も受け付ける
fn parse_sequence_length(node: &Value) -> Option<usize> {
    let n = match node.as_u64() {
        Some(n) => n,
        None => {
            let f = node.as_f64()?;
            if f < 0.0 || f.fract() != 0.0 || f > u32::MAX as f64 {
                return None;
            }
            f as u64
        }
    };
    usize::try_from(n).ok()
}

fn parse_class_names(node: &Value) -> Option<Vec<String>> {
    node.as_array()?
        .iter()
        .map(|v| v.as_str().map(str::to_string))
        .collect()
}
