//! Error handling for vision-rs
//!
//! This module defines the crate-wide error type and a Result alias.
//! Per-frame transform failures use [`crate::filters::TransformError`]
//! instead; those never leave a worker thread.

use thiserror::Error;

/// Main error type for vision-rs operations
#[derive(Error, Debug)]
pub enum VisionError {
    /// A processor was started before a callback was registered
    #[error("Callback not registered for processor '{processor}'")]
    CallbackNotRegistered { processor: String },

    /// A task's worker thread was already spawned
    #[error("Task '{0}' is already started")]
    TaskAlreadyStarted(String),

    /// A task name that the orchestrator does not know
    #[error("Unknown task: {0}")]
    UnknownTask(String),

    /// Errors related to capture devices
    #[error("Capture error: {0}")]
    Capture(String),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// Image decoding/encoding errors
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<VisionError>,
    },
}

impl VisionError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        VisionError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

impl From<serde_json::Error> for VisionError {
    fn from(err: serde_json::Error) -> Self {
        VisionError::Serialization(err.to_string())
    }
}

/// Result type alias for vision-rs operations
pub type Result<T> = std::result::Result<T, VisionError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| VisionError::Io(e).with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| VisionError::Io(e).with_context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = VisionError::CallbackNotRegistered {
            processor: "Grayscale".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Callback not registered for processor 'Grayscale'"
        );
    }

    #[test]
    fn test_error_with_context() {
        let err = VisionError::Capture("device gone".to_string());
        let with_ctx = err.with_context("Failed to start capture");
        assert!(with_ctx.to_string().contains("Failed to start capture"));
        assert!(with_ctx.to_string().contains("device gone"));
    }

    #[test]
    fn test_io_result_context() {
        let result: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "missing",
        ));
        let err = result.context("Opening frames").unwrap_err();
        assert!(matches!(err, VisionError::WithContext { .. }));
        assert!(err.to_string().starts_with("Opening frames"));
    }
}
