use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] ::csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("schema error: {0}")]
    Schema(String),

    #[error("not implemented: {0}")]
    Unimplemented(&'static str),

    #[error("other error: {0}")]
    Other(String),
}

impl Error {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        let ctx = context.into();
        match self {
            // Keep the kind so retry classification still sees it.
            Error::Io(e) => Error::Io(std::io::Error::new(e.kind(), format!("{}: {}", ctx, e))),
            Error::Schema(msg) => Error::Schema(format!("{}: {}", ctx, msg)),
            Error::Other(msg) => Error::Other(format!("{}: {}", ctx, msg)),
            other => Error::Other(format!("{}: {}", ctx, other)),
        }
    }
}

impl From<parx_core::error::Error> for Error {
    fn from(e: parx_core::error::Error) -> Self {
        Error::Other(e.to_string())
    }
}
