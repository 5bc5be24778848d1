//! Binary for fetching detection weights ahead of deployment

use clap::Parser;
use framewatch_eye::config::ModelConfig;
use framewatch_eye::error::VisionError;
use framewatch_eye::models::ModelManager;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "download_model")]
#[command(about = "Download ONNX detection weights for framewatch", long_about = None)]
struct Args {
    /// HTTPS URL of the exported ONNX model
    url: String,

    /// Destination file (defaults to the relay's default model path)
    #[arg(long, short)]
    out: Option<PathBuf>,

    /// Expected SHA-256 of the file, hex encoded
    #[arg(long)]
    sha256: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), VisionError> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .init();

    let args = Args::parse();
    let mut config = ModelConfig::default();
    if let Some(out) = args.out {
        config.path = out;
    }
    config.url = Some(args.url.clone());
    config.sha256 = args.sha256.clone();
    config.validate().map_err(VisionError::Config)?;

    let path = config.path.clone();
    let manager = ModelManager::new(Arc::new(config));
    let saved = manager.download(&args.url, &path, args.sha256.as_deref()).await?;
    println!("Model downloaded to: {:?}", saved);

    Ok(())
}
