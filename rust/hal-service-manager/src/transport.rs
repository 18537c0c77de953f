//! Transport-level outcome of a HAL call.
//!
//! Every HAL method reports two independent things: whether the call itself
//! reached the server and came back ([`Return`]), and the server's own status
//! value carried inside the `Ok` payload. A non-zero HAL status is an ordinary
//! `Ok`; only a broken call path is a [`TransportError`].

/// Result of invoking a HAL method across the transport.
pub type Return<T> = Result<T, TransportError>;

/// The call never completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The server process (or object) is gone.
    DeadObject,
    /// The transaction could not be delivered or its reply was lost.
    FailedTransaction(String),
    /// The server does not implement the called method.
    UnknownTransaction { method: &'static str },
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::DeadObject => write!(f, "dead object"),
            TransportError::FailedTransaction(reason) => {
                write!(f, "failed transaction: {}", reason)
            }
            TransportError::UnknownTransaction { method } => {
                write!(f, "unknown transaction: {}", method)
            }
        }
    }
}

impl std::error::Error for TransportError {}
