pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod http;
pub mod logging;
pub mod metrics;
pub mod websocket;

pub use config::RelayConfig;
pub use error::ServerError;
pub use http::{create_router, serve, AppState};
