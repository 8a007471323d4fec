use keyward::BackendError;
use thiserror::Error;

/// Errors that may occur when talking to Vault over HTTP
#[derive(Error, Debug)]
pub enum VaultBackendError {
    /// The configured address is not a usable base URL
    #[error("Invalid Vault address '{address}': {reason}")]
    InvalidAddress {
        /// The configured address
        address: String,
        /// Why it was rejected
        reason: String,
    },

    /// A configuration value could not be parsed
    #[error("Invalid configuration value for {name}: {reason}")]
    InvalidSetting {
        /// The setting's name
        name: String,
        /// Why it was rejected
        reason: String,
    },

    /// The HTTP client could not be built
    #[error("Failed to build HTTP client: {0}")]
    ClientFailed(String),

    /// Vault could not be reached
    #[error("Failed to connect to Vault: {0}")]
    ConnectionFailed(String),

    /// The request failed in transit
    #[error("Vault request failed: {0}")]
    RequestFailed(String),

    /// Vault refused the presented token
    #[error("Vault denied access to '{path}'")]
    PermissionDenied {
        /// Path the request addressed
        path: String,
    },

    /// Vault answered a write with 404
    #[error("Vault has nothing at '{path}'")]
    NotFound {
        /// Path the request addressed
        path: String,
    },

    /// Vault answered with a non-success status
    #[error("Vault answered '{path}' with status {status}: {}", .errors.join("; "))]
    Status {
        /// Path the request addressed
        path: String,
        /// HTTP status code
        status: u16,
        /// Errors listed in the response body
        errors: Vec<String>,
    },

    /// The response body could not be decoded
    #[error("Failed to decode Vault response from '{path}': {reason}")]
    DecodeFailed {
        /// Path the request addressed
        path: String,
        /// What went wrong
        reason: String,
    },

    /// A login succeeded without issuing a client token
    #[error("Vault login at '{0}' returned no client token")]
    MissingClientToken(String),
}

impl From<reqwest::Error> for VaultBackendError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_connect() || error.is_timeout() {
            VaultBackendError::ConnectionFailed(error.to_string())
        } else {
            VaultBackendError::RequestFailed(error.to_string())
        }
    }
}

impl From<VaultBackendError> for BackendError {
    fn from(error: VaultBackendError) -> Self {
        match error {
            VaultBackendError::ConnectionFailed(reason)
            | VaultBackendError::RequestFailed(reason) => BackendError::Unavailable(reason),
            VaultBackendError::PermissionDenied { path } => BackendError::PermissionDenied { path },
            VaultBackendError::NotFound { path } => BackendError::NotFound { path },
            VaultBackendError::Status {
                path,
                status,
                errors,
            } => BackendError::Rejected {
                path,
                status,
                errors,
            },
            VaultBackendError::DecodeFailed { path, reason } => {
                BackendError::MalformedResponse { path, reason }
            }
            other => BackendError::Other(other.to_string()),
        }
    }
}
