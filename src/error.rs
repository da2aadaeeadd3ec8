//! Errors reported by the probing tables.

use alloc::string::String;

use thiserror::Error;

/// Error type shared by every table variant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TableError {
    /// The requested key is not present in the table.
    #[error("key not found")]
    NotFound,

    /// An argument was rejected before the table was touched.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the rejected argument
        message: String,
    },
}

impl TableError {
    /// Creates an [`TableError::InvalidArgument`] with the given message.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        TableError::InvalidArgument {
            message: message.into(),
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = TableError> = core::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use alloc::string::ToString;

    use super::*;

    #[test]
    fn messages() {
        assert_eq!(TableError::NotFound.to_string(), "key not found");
        assert_eq!(
            TableError::invalid_argument("capacity must be positive").to_string(),
            "invalid argument: capacity must be positive"
        );
    }
}
