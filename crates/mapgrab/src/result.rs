//! Result and error types for MapGrab.

use thiserror::Error;

/// Result type for MapGrab operations
pub type MapGrabResult<T> = Result<T, MapGrabError>;

/// Errors that can occur in MapGrab
#[derive(Debug, Error)]
pub enum MapGrabError {
    /// Selector text contained no map, layer or filter part
    #[error("Invalid selector: a selector needs at least one of map[..], layer[..] or filter[..]")]
    InvalidSelector,

    /// Selector text could not be tokenized
    #[error("Failed to parse selector near `{fragment}`: {message}")]
    Parse {
        /// Offending part of the selector
        fragment: String,
        /// Error message
        message: String,
    },

    /// Layer predicate matched nothing in any loaded style
    #[error("No layer matching {requested} exists on map(s) {}", .map_ids.join(", "))]
    NoMatchingLayer {
        /// Maps whose loaded style was checked
        map_ids: Vec<String>,
        /// Rendered layer predicate
        requested: String,
    },

    /// Map id is not registered
    #[error("Map `{map_id}` is not registered")]
    MapNotFound {
        /// Requested map id
        map_id: String,
    },

    /// The rendering engine failed while answering a query
    #[error("Map `{map_id}` engine error: {message}")]
    Engine {
        /// Map the failure belongs to
        map_id: String,
        /// Error message
        message: String,
    },

    /// Locator resolved to nothing
    #[error("No feature matches `{selector}`")]
    ElementNotFound {
        /// Selector that was resolved
        selector: String,
    },

    /// Strict locator resolved to several features
    #[error("`{selector}` resolved to {count} features; use first(), last() or nth()")]
    TooManyElements {
        /// Selector that was resolved
        selector: String,
        /// Number of features found
        count: usize,
    },

    /// Feature is visible but no pixel of it hit-tests as the feature
    #[error("Feature for `{selector}` is visible but too small to interact with")]
    NotInteractable {
        /// Selector that was resolved
        selector: String,
    },

    /// Adapter does not support the requested operation
    #[error("Operation not supported by this map adapter: {operation}")]
    Unsupported {
        /// Operation name
        operation: String,
    },

    /// Operation timed out
    #[error("Operation timed out after {ms}ms")]
    Timeout {
        /// Timeout in milliseconds
        ms: u64,
    },

    /// Operation was cancelled through its token
    #[error("Operation cancelled")]
    Cancelled,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MapGrabError {
    /// Create a parse error for a selector fragment
    #[must_use]
    pub fn parse(fragment: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            fragment: fragment.into(),
            message: message.into(),
        }
    }

    /// Create an engine error for a map
    #[must_use]
    pub fn engine(map_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Engine {
            map_id: map_id.into(),
            message: message.into(),
        }
    }

    /// Create an unsupported-operation error
    #[must_use]
    pub fn unsupported(operation: impl Into<String>) -> Self {
        Self::Unsupported {
            operation: operation.into(),
        }
    }
}
