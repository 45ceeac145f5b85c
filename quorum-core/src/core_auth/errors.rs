//! Error types for the authorization subsystem

use thiserror::Error;

/// Errors that can occur in authentication or authorization checks
#[derive(Debug, Error)]
pub enum AuthError {
    /// No authenticated identity where one is required
    #[error("Authentication required")]
    AuthRequired,

    /// Identity present but lacks the required role or ownership
    #[error("Not permitted: {0}")]
    AuthzDenied(String),

    /// Secondary admin gate rejected the credential pair
    #[error("Invalid admin credentials")]
    AdminCredentialMismatch,

    /// The admin session flag could not be read or written
    #[error("Admin session persistence failed: {0}")]
    Persistence(String),
}

/// Result type for auth operations
pub type AuthResult<T> = Result<T, AuthError>;
