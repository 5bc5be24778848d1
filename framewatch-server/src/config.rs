// Layered relay configuration: defaults, file, environment, command line

use crate::cli::Cli;
use crate::error::ServerError;
use config::{Config, Environment, File, FileFormat};
use framewatch_eye::{ModelConfig, DEFAULT_CONFIDENCE_THRESHOLD};
use serde::{Deserialize, Serialize};

/// Environment variable prefix, e.g. `FRAMEWATCH__SERVER__PORT=9000`
pub const ENV_PREFIX: &str = "FRAMEWATCH";
const ENV_SEPARATOR: &str = "__";
const MAX_WORKERS: usize = 256;

/// Listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

/// Inference dispatch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Size of the blocking worker pool
    pub workers: usize,
    /// Detections below this confidence are never sent
    pub confidence_threshold: f32,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Complete relay configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub inference: InferenceConfig,
    pub logging: LoggingConfig,
}

impl RelayConfig {
    /// Load configuration from the process environment and the given flags
    pub fn load(cli: &Cli) -> Result<Self, ServerError> {
        Self::load_with_env(cli, Self::environment())
    }

    /// Environment source used by [`load`](Self::load)
    pub fn environment() -> Environment {
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator(ENV_SEPARATOR)
            .separator(ENV_SEPARATOR)
            .try_parsing(true)
    }

    /// Load configuration using an explicit environment source.
    /// Later layers override earlier ones: file, environment, flags.
    pub fn load_with_env(cli: &Cli, env: Environment) -> Result<Self, ServerError> {
        let mut builder = Config::builder();

        if let Some(path) = &cli.config {
            builder = builder.add_source(
                File::from(path.as_path())
                    .format(FileFormat::Toml)
                    .required(true),
            );
        }

        builder = builder
            .add_source(env)
            .set_override_option("server.host", cli.host.clone())?
            .set_override_option("server.port", cli.port.map(i64::from))?
            .set_override_option(
                "model.path",
                cli.model.as_ref().map(|p| p.to_string_lossy().into_owned()),
            )?
            .set_override_option("inference.workers", cli.workers.map(|w| w as i64))?
            .set_override_option("inference.confidence_threshold", cli.confidence.map(f64::from))?
            .set_override_option("logging.level", cli.log_level.clone())?;

        if cli.json_logs {
            builder = builder.set_override("logging.json", true)?;
        }

        let config: RelayConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ServerError> {
        if self.server.port == 0 {
            return Err(ServerError::Config("Port must be non-zero".to_string()));
        }

        if self.server.host.trim().is_empty() {
            return Err(ServerError::Config("Host must not be empty".to_string()));
        }

        if self.inference.workers == 0 || self.inference.workers > MAX_WORKERS {
            return Err(ServerError::Config(format!(
                "Workers must be between 1 and {}",
                MAX_WORKERS
            )));
        }

        if !(0.0..=1.0).contains(&self.inference.confidence_threshold) {
            return Err(ServerError::Config(
                "Confidence threshold must be between 0 and 1".to_string(),
            ));
        }

        self.model.validate().map_err(ServerError::Config)
    }
}
