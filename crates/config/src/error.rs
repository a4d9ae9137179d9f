use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {message}")]
    Invalid { message: String },

    #[error("Environment variable {name} not found")]
    MissingEnvVar { name: String },
}
