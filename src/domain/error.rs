//! Error types for the book-inquiry client.
//!
//! This module defines the centralized error type [`BookInquiryError`], the
//! dispatch routing error [`DispatchError`], and a type alias [`Result`] for
//! convenient error handling throughout the crate. All errors are implemented
//! using the `thiserror` crate for automatic `Error` trait implementation.

use thiserror::Error;

/// The main error type for book-inquiry operations.
///
/// Most variants describe a failure that the store turns into state (an
/// `error` flag, a clamped default) rather than propagating to the
/// presentation layer. Errors only escape as values from the lower-level
/// building blocks: state containers, the fetch capability, and configuration.
///
/// # Examples
///
/// ```
/// use book_inquiry::domain::BookInquiryError;
///
/// fn reject_derived(key: &str) -> Result<(), BookInquiryError> {
///     Err(BookInquiryError::DerivedValue(key.to_string()))
/// }
///
/// assert!(reject_derived("totalPages").is_err());
/// ```
#[derive(Debug, Error)]
pub enum BookInquiryError {
    /// The catalog proxy answered with a non-success HTTP status.
    #[error("HTTP error: status {status}")]
    Http {
        /// Status code of the failed response.
        status: u16,
    },

    /// The catalog proxy answered successfully but flagged an error in its payload.
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// The request never produced a response (connection refused, TLS, timeout).
    ///
    /// Automatically converts from `reqwest::Error` using the `#[from]` attribute.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A payload could not be decoded as JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// State was constructed from something other than a key/value mapping.
    ///
    /// The string describes the offending JSON type (array, null, number...).
    #[error("State shape error: expected an object, found {0}")]
    StateShape(String),

    /// A write targeted a computed (derived) property.
    #[error("Attempt to set derived value \"{0}\"")]
    DerivedValue(String),

    /// A computed property could not be evaluated from the current state.
    #[error("Computed property \"{property}\" failed: {reason}")]
    Computed {
        /// Name of the computed property.
        property: String,
        /// Why evaluation failed.
        reason: String,
    },

    /// Configuration is invalid or missing.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Filesystem or I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A URL could not be parsed.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

impl BookInquiryError {
    /// Builds a [`BookInquiryError::Computed`] for the given property.
    pub fn computed(property: &str, reason: impl Into<String>) -> Self {
        Self::Computed {
            property: property.to_string(),
            reason: reason.into(),
        }
    }
}

/// Reasons an action name could not be resolved to a handler.
///
/// `dispatch` never returns these to its caller; they are logged and the
/// dispatch yields `None`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// No module is registered under the namespace.
    #[error("Dispatch error: module \"{0}\" not found")]
    UnknownModule(String),

    /// The namespace exists but has nothing under that name.
    #[error("Dispatch error: action \"{0}\" not found")]
    UnknownAction(String),

    /// The name refers to a state property rather than an action.
    #[error("Dispatch error: action \"{0}\" is not a function")]
    NotAnAction(String),
}

/// A specialized `Result` type for book-inquiry operations.
pub type Result<T> = std::result::Result<T, BookInquiryError>;
