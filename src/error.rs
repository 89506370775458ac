//! Error handling for SA-Analyzer
//!
//! This module defines custom error types and a Result alias for use
//! throughout the crate. Per-tick paths (decoding, playback, pose updates)
//! do not return these; they report skipped work through counters instead.

use thiserror::Error;

/// Main error type for SA-Analyzer operations
#[derive(Error, Debug)]
pub enum SaError {
    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A track index past the end of the stored tracks
    #[error("No track {index}, {count} tracks stored")]
    NoTrack { index: usize, count: usize },

    /// A segment name that is not part of the skeleton
    #[error("Unknown segment: {0}")]
    UnknownSegment(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<SaError>,
    },
}

impl SaError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        SaError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

/// Result type alias for SA-Analyzer operations
pub type Result<T> = std::result::Result<T, SaError>;

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
        self.map_err(|e| SaError::from(e).with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| SaError::from(e).with_context(f()))
    }
}
