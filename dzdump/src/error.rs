use thiserror::Error;

#[derive(Debug, Error)]
pub enum DumpError {
    /// API/session/resolution failure from the client layer.
    #[error(transparent)]
    Api(#[from] deezer_api::DeezerError),

    /// File or stream I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DumpError>;
