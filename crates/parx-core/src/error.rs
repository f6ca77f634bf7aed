use thiserror::Error;

/// Canonical result for core.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Cache lookup for an id that was never inserted, was removed or
    /// evicted, or belongs to another cache.
    #[error("partition set '{0}' not found in cache")]
    NotFound(String),

    /// Plan execution failed partway; `source` carries the backend cause.
    #[error("execution failed: {message}")]
    Execution {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Id generation kept colliding. Guarded by retries inside `put`; seeing
    /// this means the id source is broken.
    #[error("cache id collision persisted after {0} attempts")]
    CacheIdCollision(usize),

    #[error("execution was cancelled")]
    Cancelled,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Internal invariant failed: {0}")]
    Invariant(String),

    /// Error with context chain for better debugging
    #[error("Error in {context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl Error {
    /// Build an `Execution` error around a backend cause.
    pub fn execution(
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Error::Execution {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Add context to an error, creating an error chain.
    ///
    /// # Example
    /// ```rust,no_run
    /// use parx_core::error::Error;
    /// let err = Error::NotFound("4f2a".into());
    /// let err = err.with_context("while resolving scan input");
    /// ```
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Error::Context {
            context: context.into(),
            source: Box::new(self) as Box<dyn std::error::Error + Send + Sync>,
        }
    }

    /// True if this error, or any `Error` it wraps as context, is `NotFound`.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::NotFound(_) => true,
            Error::Context { source, .. } => source
                .downcast_ref::<Error>()
                .map(Error::is_not_found)
                .unwrap_or(false),
            _ => false,
        }
    }

    /// Get suggestions for common errors.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Error::NotFound(_) => vec![
                "Check that the id was issued by this runner's cache".into(),
                "The entry may have been removed or evicted; re-run the plan".into(),
            ],
            Error::Config(msg) => {
                if msg.contains("buffer") {
                    vec!["results_buffer_size must be at least 1".into()]
                } else if msg.contains("worker") {
                    vec!["num_workers must be at least 1".into(),
                         "Unset PARX_NUM_WORKERS to use available parallelism".into()]
                } else {
                    vec![]
                }
            }
            Error::Execution { .. } => vec![
                "Inspect the error source chain for the failing partition".into(),
            ],
            _ => vec![],
        }
    }
}
