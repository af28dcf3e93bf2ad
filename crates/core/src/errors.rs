use std::path::PathBuf;

/// Result type alias for mdsync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for mdsync operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The external CLI process could not be started
    #[error("failed to spawn '{command}': {message}")]
    Spawn {
        command: String,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Command stdout did not contain locatable, valid JSON
    #[error("failed to parse command output: {message}")]
    Parse {
        message: String,
        /// The raw stdout, preserved verbatim for diagnostics
        raw: String,
    },

    /// The operation was cancelled before it reached a terminal state
    #[error("operation '{operation}' was cancelled")]
    Cancelled { operation: String },

    /// Configuration errors
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// File system operations
    #[error("file system {operation} operation failed for '{}': {source}", path.display())]
    FileSystem {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        // Callers that know the path use `Error::file_system` instead.
        Error::FileSystem {
            path: PathBuf::new(),
            operation: "io".to_string(),
            source: error,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::Json {
            message: error.to_string(),
            source: error,
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(error: anyhow::Error) -> Self {
        Error::Configuration {
            message: format!("internal error: {error}"),
        }
    }
}

// Helper methods for creating errors with context
impl Error {
    /// Create a spawn failure error
    #[must_use]
    pub fn spawn(command: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Spawn {
            command: command.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create a spawn failure error carrying the underlying io error
    #[must_use]
    pub fn spawn_with_source(
        command: impl Into<String>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Error::Spawn {
            command: command.into(),
            message: message.into(),
            source: Some(source),
        }
    }

    /// Create a parse failure error, preserving the raw output
    #[must_use]
    pub fn parse(message: impl Into<String>, raw: impl Into<String>) -> Self {
        Error::Parse {
            message: message.into(),
            raw: raw.into(),
        }
    }

    /// Create a cancellation error
    #[must_use]
    pub fn cancelled(operation: impl Into<String>) -> Self {
        Error::Cancelled {
            operation: operation.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }

    /// Create a file system error with context
    #[must_use]
    pub fn file_system(
        path: impl Into<PathBuf>,
        operation: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Error::FileSystem {
            path: path.into(),
            operation: operation.into(),
            source,
        }
    }
}

/// Attach a short "what were we doing" prefix to any convertible error.
pub trait ResultExt<T> {
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Like [`ResultExt::context`], but the message is built only on the
    /// error path
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<Error>,
{
    fn context(self, message: impl Into<String>) -> Result<T> {
        let message = message.into();
        self.with_context(|| message)
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| Error::Configuration {
            message: format!("{}: {}", f(), e.into()),
        })
    }
}
