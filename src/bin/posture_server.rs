//! Posture server: receives landmark windows over TCP, classifies the exercise
//! with the ONNX model and evaluates form rules on the last frame.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::{TcpListener, TcpStream};
use tracing::{error, info, warn};

use stathis_posture::config::Config;
use stathis_posture::logging;
use stathis_posture::model::InferenceEngine;
use stathis_posture::protocol::{self, ClientMessage, ServerMessage};
use stathis_posture::PostureService;

const CONFIG_PATH: &str = "posture_server.toml";

// ===========================================================================
// Startup
// ===========================================================================

fn load_service(config: &Config) -> Result<PostureService> {
    if !config.model.enabled {
        warn!("Model disabled in config, classify requests will be refused");
        return Ok(PostureService::disabled());
    }
    info!("Model: {}", config.model.path);
    info!("Model config: {}", config.model.config_path);
    let engine = InferenceEngine::load(
        &config.model.path,
        &config.model.config_path,
        &config.model.session_options(),
    )
    .context("failed to initialize inference engine")?;
    Ok(PostureService::new(engine))
}

fn model_info(service: &PostureService) -> ServerMessage {
    match service.engine() {
        Some(engine) => ServerMessage::ModelInfo {
            enabled: true,
            sequence_length: engine.sequence_length(),
            class_names: engine.config().class_names.clone(),
        },
        None => ServerMessage::ModelInfo {
            enabled: false,
            sequence_length: 0,
            class_names: Vec::new(),
        },
    }
}

// ===========================================================================
// Connection handling
// ===========================================================================

async fn handle_client(
    socket: TcpStream,
    service: Arc<PostureService>,
    max_frame_bytes: usize,
) -> Result<()> {
    let mut stream = protocol::message_stream(socket, max_frame_bytes);

    while let Some(msg) = protocol::recv_message::<ClientMessage>(&mut stream).await? {
        let reply = match msg {
            ClientMessage::Classify { request_id, window } => {
                // Inference is CPU-bound; keep it off the async workers
                let worker = Arc::clone(&service);
                let result =
                    tokio::task::spawn_blocking(move || worker.analyze(window.as_deref())).await?;

                if let Err(e) = &result {
                    if e.is_client_error() {
                        warn!("[{}] rejected: {}", request_id, e);
                    } else {
                        error!("[{}] failed: {}", request_id, e);
                    }
                }
                ServerMessage::from_result(request_id, result)
            }
            ClientMessage::DescribeModel => model_info(&service),
        };
        protocol::send_message(&mut stream, &reply).await?;
    }
    Ok(())
}

// ===========================================================================
// Main
// ===========================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args().nth(1).unwrap_or_else(|| CONFIG_PATH.to_string());
    let config = Config::load_or_default(&config_path)?;
    let log_path = logging::init(Path::new(&config.log.dir), "posture_server", config.log.verbose)?;

    info!("Posture Server ({})", env!("CARGO_PKG_VERSION"));
    info!("Config: {}", config_path);
    info!("Log: {}", log_path.display());
    if config.log.verbose {
        info!("Verbose mode: ON");
    }

    let service = Arc::new(load_service(&config)?);

    let listener = TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    info!("Listening on {}", config.listen_addr);

    let max_frame_bytes = config.max_frame_bytes;
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (socket, addr) = match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        warn!("accept failed: {}", e);
                        continue;
                    }
                };
                if let Err(e) = socket.set_nodelay(true) {
                    warn!("set_nodelay failed for {}: {}", addr, e);
                }
                info!("Client connected: {}", addr);

                let service = Arc::clone(&service);
                tokio::spawn(async move {
                    if let Err(e) = handle_client(socket, service, max_frame_bytes).await {
                        warn!("Client {} error: {}", addr, e);
                    }
                    info!("Client disconnected: {}", addr);
                });
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
        }
    }

    // The session is released once in-flight connections drop their handles
    drop(service);
    Ok(())
}
