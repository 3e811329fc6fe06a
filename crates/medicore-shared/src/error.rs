use thiserror::Error;

#[derive(Error, Debug)]
pub enum MedicoreError {
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Session error: {0}")]
    Session(#[from] SessionDecodeError),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Failures reported by the auth endpoints. The display strings are shown
/// to the user verbatim.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Account is deactivated. Please contact administrator.")]
    AccountDeactivated,

    #[error("Email already registered")]
    EmailAlreadyRegistered,

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Email not found")]
    EmailNotFound,

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Request superseded by a newer one")]
    Superseded,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// A stored token could not be turned back into a session. Always recovered
/// by treating the caller as anonymous.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionDecodeError {
    #[error("Base64 decode error")]
    Base64Decode,

    #[error("Invalid token format")]
    InvalidFormat,

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Token has expired")]
    Expired,

    #[error("Token does not match the stored user")]
    UserMismatch,
}
