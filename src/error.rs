//! Error types for a TFTP transfer.
//!
//! Every error ends the transfer it occurred in. Only timeouts are retried,
//! and only inside the state machine; once one surfaces here as
//! [`Error::TimeoutExceeded`] the retry budget is already spent.

use std::io;

use thiserror::Error;

use crate::packet::ErrorCode;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Why a transfer failed.
#[derive(Debug, Error)]
pub enum Error {
    /// A packet could not be encoded (embedded NUL, oversized payload).
    #[error("encoding error: {0}")]
    Encoding(String),

    /// The socket could not be bound, or a send or receive failed outright.
    #[error("transport error: {0}")]
    Transport(#[source] io::Error),

    /// No valid reply arrived within the retry budget.
    #[error("timed out after {retries} retransmissions")]
    TimeoutExceeded {
        /// How many times the last packet was resent before giving up.
        retries: usize,
    },

    /// The server sent an `Error` packet.
    #[error("remote error {code}: {}", describe_remote(.code, .message))]
    Remote {
        /// The raw error code.
        code: u16,
        /// The server's message, possibly empty.
        message: String,
    },

    /// Reading the local source or writing the local sink failed.
    #[error("local I/O error: {0}")]
    LocalIo(#[source] io::Error),

    /// The transfer was cancelled by the caller.
    #[error("transfer cancelled")]
    Cancelled,
}

impl Error {
    /// The standard code carried by a remote error, if any.
    pub fn remote_code(&self) -> Option<ErrorCode> {
        match self {
            Error::Remote { code, .. } => ErrorCode::from_u16(*code),
            _ => None,
        }
    }
}

/// Table text for the code, followed by the server's own words when they
/// add something.
fn describe_remote(code: &u16, message: &str) -> String {
    let table = ErrorCode::from_u16(*code)
        .unwrap_or(ErrorCode::NotDefined)
        .as_str();

    if message.is_empty() || message.eq_ignore_ascii_case(table) {
        table.to_string()
    } else {
        format!("{} ({})", table, message)
    }
}
