// Command-line interface for the relay binary

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Default, Clone)]
#[command(name = "framewatch-server")]
#[command(about = "Real-time object detection relay over WebSocket", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Configuration file path (TOML)
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Address to bind
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(long, short)]
    pub port: Option<u16>,

    /// Path to the ONNX detection model
    #[arg(long, short)]
    pub model: Option<PathBuf>,

    /// Number of inference workers
    #[arg(long, short)]
    pub workers: Option<usize>,

    /// Minimum confidence for reported detections
    #[arg(long)]
    pub confidence: Option<f32>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    pub json_logs: bool,
}
