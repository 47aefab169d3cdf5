pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid file request: {0}")]
    InvalidPath(String),

    #[error("empty query")]
    EmptyQuery,

    #[error("invalid section: {0}")]
    InvalidSection(String),

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("document is password protected")]
    Locked,

    #[error("conversion failed: `{command}` exited with {status}")]
    ConversionFailed {
        command: String,
        status: String,
        output: String,
    },
}

impl Error {
    /// Whether the error was caused by the request rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidPath(_)
                | Error::EmptyQuery
                | Error::InvalidSection(_)
                | Error::UnsupportedFormat(_)
                | Error::Locked
        )
    }
}
