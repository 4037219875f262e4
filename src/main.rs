use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use stathis_posture::config::Config;
use stathis_posture::logging;
use stathis_posture::model::InferenceEngine;
use stathis_posture::PostureService;
use tracing::info;

const CONFIG_PATH: &str = "posture_server.toml";

/// {"window": [[[f32; 132]; T]]}
#[derive(Debug, Deserialize)]
struct WindowRequest {
    #[serde(default)]
    window: Option<Vec<Vec<Vec<f32>>>>,
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: classify_window <request.json> [config.toml]");
        bail!("missing request file");
    }
    let request_path = &args[1];
    let config_path = args.get(2).map(String::as_str).unwrap_or(CONFIG_PATH);

    let config = Config::load_or_default(config_path)?;
    logging::init(Path::new(&config.log.dir), "classify_window", config.log.verbose)?;

    let content = fs::read_to_string(request_path)
        .with_context(|| format!("failed to read {}", request_path))?;
    let request: WindowRequest = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse {}", request_path))?;

    let service = if config.model.enabled {
        let engine = InferenceEngine::load(
            &config.model.path,
            &config.model.config_path,
            &config.model.session_options(),
        )?;
        info!(
            "Model loaded: T={} classes={:?}",
            engine.sequence_length(),
            engine.config().class_names
        );
        PostureService::new(engine)
    } else {
        PostureService::disabled()
    };

    let response = service.analyze(request.window.as_deref())?;
    println!("{}", serde_json::to_string_pretty(&response)?);

    Ok(())
}
