use std::time::Instant;

use anyhow::{bail, Result};
use stathis_posture::config::Config;
use stathis_posture::model::InferenceEngine;
use stathis_posture::pose::{Frame, FrameBuffer, Landmark, LandmarkIndex, Window};
use stathis_posture::PostureService;

const CONFIG_PATH: &str = "posture_server.toml";
const WARMUP: usize = 5;
const ITERATIONS: usize = 100;

/// 立った姿勢を少しずつ揺らした合成フレーム
fn synthetic_frame(step: usize) -> Frame {
    let sway = (step as f32 * 0.1).sin() * 0.02;
    let mut frame = Frame::default();
    for i in 0..LandmarkIndex::COUNT {
        let Some(index) = LandmarkIndex::from_index(i) else {
            continue;
        };
        let x = 0.5 + sway + ((i % 2) as f32 - 0.5) * 0.1;
        let y = 0.1 + i as f32 / LandmarkIndex::COUNT as f32 * 0.8;
        frame.set(index, Landmark::new(x, y, 0.0, 0.95));
    }
    frame
}

fn to_nested(window: &Window) -> Vec<Vec<Vec<f32>>> {
    window
        .as_array()
        .outer_iter()
        .map(|batch| batch.outer_iter().map(|row| row.to_vec()).collect())
        .collect()
}

fn main() -> Result<()> {
    let config = Config::load_or_default(CONFIG_PATH)?;
    if !config.model.enabled {
        bail!("model is disabled in {}", CONFIG_PATH);
    }

    let engine = InferenceEngine::load(
        &config.model.path,
        &config.model.config_path,
        &config.model.session_options(),
    )?;
    let sequence_length = engine.sequence_length();
    let service = PostureService::new(engine);

    let mut buffer = FrameBuffer::new(sequence_length);
    let mut step = 0;
    while !buffer.is_ready() {
        buffer.push(synthetic_frame(step));
        step += 1;
    }

    // ウォームアップ
    for _ in 0..WARMUP {
        buffer.push(synthetic_frame(step));
        step += 1;
        if let Some(window) = buffer.window() {
            service.analyze(Some(&to_nested(&window)))?;
        }
    }

    let mut total_ms = 0.0;
    let mut max_ms: f64 = 0.0;
    let mut last_class = String::new();
    for _ in 0..ITERATIONS {
        buffer.push(synthetic_frame(step));
        step += 1;
        let Some(window) = buffer.window() else {
            continue;
        };
        let nested = to_nested(&window);

        let start = Instant::now();
        let response = service.analyze(Some(&nested))?;
        let ms = start.elapsed().as_secs_f64() * 1000.0;
        total_ms += ms;
        max_ms = max_ms.max(ms);
        last_class = response.predicted_class;
    }

    let avg_ms = total_ms / ITERATIONS as f64;
    println!(
        "Posture analysis (T={}): {:.2}ms/window avg, {:.2}ms max = {:.1} windows/s",
        sequence_length,
        avg_ms,
        max_ms,
        1000.0 / avg_ms
    );
    println!("Last prediction: {}", last_class);

    Ok(())
}
