//! Error types for rosbuild.
//!
//! Everything here is a configuration-time failure: it aborts master
//! startup or reconfiguration before any job is registered. Runtime step
//! failures are owned by the executing framework, not this crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed source URL '{0}': expected git@<host>:<owner>/<repo>.git")]
    MalformedSourceUrl(String),

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("failed to render secret '{name}': {message}")]
    SecretRender { name: String, message: String },

    #[error("duplicate project name: {0}")]
    DuplicateProject(String),

    #[error("change source '{0}' has not been configured")]
    NotConfigured(String),

    #[error("http error: {0}")]
    Http(String),
}

pub type Result<T> = std::result::Result<T, Error>;
