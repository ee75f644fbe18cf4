use std::path::PathBuf;

/// Every failure the editor, the codecs, and the transport can report.
#[derive(Debug, thiserror::Error)]
pub enum WebConfError {
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// Unsupported method, missing `HTTP/` marker, or an oversized request head.
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    #[error("missing field '{0}'")]
    FieldNotFound(String),

    /// The path resolved but the value could not be decoded into the field's type.
    #[error("invalid value '{value}' for field '{field}'")]
    InvalidValue { field: String, value: String },

    #[error("persistence failure on {}: {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("persisted data truncated at offset {offset}: {needed} more bytes required")]
    Truncated { offset: usize, needed: usize },

    #[error("corrupt persisted data at offset {offset}: {reason}")]
    Corrupt { offset: usize, reason: String },

    #[error("duplicate registry entry '{0}'")]
    DuplicateEntry(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl WebConfError {
    pub fn persistence(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        WebConfError::Persistence {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, WebConfError>;
