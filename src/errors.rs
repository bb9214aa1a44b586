use miette::Diagnostic;
use thiserror::Error;

use crate::policy::errors::StoreError;

#[derive(Debug, Error, Diagnostic)]
pub enum GateError {
    #[error("I/O error: {0}")]
    #[diagnostic(code(gatehouse::io))]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    #[diagnostic(
        code(gatehouse::config),
        help("Check the TOML file and GATEHOUSE__* environment variables")
    )]
    Config(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(gatehouse::serde))]
    Serde(#[from] serde_json::Error),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error("Bad listen address: {0}")]
    #[diagnostic(code(gatehouse::listen_addr))]
    ListenAddr(String),
}
