//! Configuration error types.

use thiserror::Error;

/// Errors raised while building a [`RouterConfig`](super::RouterConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A value was present but unusable.
    #[error("Invalid configuration for {field}: {message}")]
    Invalid {
        /// The offending setting.
        field: String,
        /// Why it was rejected.
        message: String,
    },

    /// An environment variable could not be interpreted.
    #[error("Environment variable {variable}: {message}")]
    Environment {
        /// The variable name.
        variable: String,
        /// Why it was rejected.
        message: String,
    },
}
