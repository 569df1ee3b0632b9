use thiserror::Error;

/// Failures of the outer surfaces: fixture loading, config, CLI output.
/// Protocol paths degrade instead of returning these.
#[derive(Debug, Error)]
pub enum OverlayError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid fixture: {0}")]
    InvalidFixture(String),
}

impl OverlayError {
    pub fn io(path: &str, source: std::io::Error) -> Self {
        OverlayError::Io {
            path: path.to_string(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, OverlayError>;
