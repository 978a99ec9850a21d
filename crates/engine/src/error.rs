//! Error types for host collaborator setup

/// Error type for host setup operations
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// A pointer the host handed over was null
    #[error("Null pointer: {0}")]
    NullPointer(&'static str),

    /// Host globals already initialized
    #[error("Host already initialized")]
    AlreadyInitialized,

    /// Host globals not initialized yet
    #[error("Host not initialized")]
    NotInitialized,
}
