use thiserror::Error;

#[derive(Debug, Error)]
pub enum GryagError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("locale bundle error: {0}")]
    I18n(String),

    #[error("persona error: {0}")]
    Persona(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, GryagError>;
