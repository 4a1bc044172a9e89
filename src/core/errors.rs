//! Shared error types for the application

use thiserror::Error;

/// Main error type for lambdamap operations
#[derive(Debug, Error)]
pub enum Error {
    /// A node candidate could not be stored in the graph
    #[error("Invalid node: {0}")]
    InvalidNode(String),

    /// A metadata collaborator (identity, listing, location lookup) failed
    #[error("{operation} failed: {message}")]
    Provider { operation: String, message: String },

    /// A deployment package could not be downloaded
    #[error("Download of {url} failed: {reason}")]
    Download { url: String, reason: String },

    /// A deployment package exceeded the absolute size ceiling
    #[error("Package size {size} bytes exceeds the {limit} byte ceiling")]
    PackageTooLarge { size: u64, limit: u64 },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Generic errors with context
    #[error("{context}: {message}")]
    WithContext { context: String, message: String },

    /// Archive errors
    #[error(transparent)]
    Archive(#[from] zip::result::ZipError),

    /// HTTP client errors
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// IO errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a collaborator failure for the named operation
    pub fn provider(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a download failure for a package URL
    pub fn download(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Download {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            message: self.to_string(),
        }
    }
}

/// Result type alias using our error type
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_display() {
        let err = Error::provider("ListFunctions", "access denied");
        assert_eq!(err.to_string(), "ListFunctions failed: access denied");
    }

    #[test]
    fn test_package_too_large_display() {
        let err = Error::PackageTooLarge {
            size: 2048,
            limit: 1024,
        };
        assert_eq!(
            err.to_string(),
            "Package size 2048 bytes exceeds the 1024 byte ceiling"
        );
    }

    #[test]
    fn test_result_context_wraps_message() {
        let result: Result<()> = Err(Error::download("https://x", "timed out"));
        let err = result.context("fetching orders-api").unwrap_err();
        assert_eq!(
            err.to_string(),
            "fetching orders-api: Download of https://x failed: timed out"
        );
    }
}
