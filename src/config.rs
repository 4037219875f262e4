use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::model::SessionOptions;

/// posture_server.toml
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    #[serde(default)]
    pub model: ModelSection,
    #[serde(default)]
    pub log: LogSection,
    /// 1メッセージの最大サイズ（バイト）
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelSection {
    /// false ならモデルを読み込まずに起動する
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// ONNXモデルのパス
    #[serde(default = "default_model_path")]
    pub path: String,
    /// モデル付属の設定 (sequence length, class names)
    #[serde(default = "default_model_config_path")]
    pub config_path: String,
    /// グラフ最適化レベル (0〜3)
    #[serde(default = "default_optimization_level")]
    pub optimization_level: u8,
    #[serde(default)]
    pub intra_threads: Option<usize>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogSection {
    /// ログファイルの出力先ディレクトリ
    #[serde(default = "default_log_dir")]
    pub dir: String,
    #[serde(default)]
    pub verbose: bool,
}

fn default_listen_addr() -> String { "0.0.0.0:9100".to_string() }
fn default_max_frame_bytes() -> usize { 16 * 1024 * 1024 }
fn default_enabled() -> bool { true }
fn default_model_path() -> String { "models/model.onnx".to_string() }
fn default_model_config_path() -> String { "models/model_config.json".to_string() }
fn default_optimization_level() -> u8 { 3 }
fn default_log_dir() -> String { "logs".to_string() }

impl Default for ModelSection {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            path: default_model_path(),
            config_path: default_model_config_path(),
            optimization_level: default_optimization_level(),
            intra_threads: None,
        }
    }
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
            verbose: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            model: ModelSection::default(),
            log: LogSection::default(),
            max_frame_bytes: default_max_frame_bytes(),
        }
    }
}

impl ModelSection {
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            optimization_level: self.optimization_level,
            intra_threads: self.intra_threads,
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// ファイルが無ければ既定値
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}
