//! The `tftpc` crate is a client for the Trivial File Transfer Protocol
//! (RFC 1350). It provides:
//!
//! * Types that represent TFTP packets and encode/decode them to the exact
//!   RFC 1350 wire format.
//! * A transfer state machine that downloads or uploads one file in octet
//!   mode, retransmitting on timeout and ignoring stray traffic.
//! * A client that ties a UDP endpoint, the state machine and a local file
//!   (or any byte source/sink) together.
//!
//! For more information, please see [THE TFTP PROTOCOL (REVISION 2)](
//! https://tools.ietf.org/html/rfc1350).
//!
//! ## Try it out
//!
//! ```console
//! $ cargo run -- 192.168.1.10 get alice-in-wonderland.txt
//! [..] INFO  tftpc::transfer > requesting alice-in-wonderland.txt from 192.168.1.10:69
//! [..] INFO  tftpc::transfer > get complete: 174357 bytes in 341 blocks, 0 retransmissions
//! success
//! ```
//!
//! ## Using the library
//!
//! ```rust,no_run
//! use tftpc::client;
//!
//! let client = client::Builder::new()
//!     .connect_to("192.168.1.10:69")?
//!     .build()?;
//!
//! let mut contents = Vec::new();
//! client.get("alice-in-wonderland.txt", &mut contents)?;
//! # Ok::<(), tftpc::Error>(())
//! ```

#![deny(missing_docs)]

use std::time::Duration;

/// POD struct representing the configuration of the retransmission of packets
#[derive(Debug, Copy, Clone, Ord, PartialOrd, Eq, PartialEq)]
pub struct RetransmissionConfig {
    /// How long should we wait for a reply before retransmitting the last packet?
    timeout: Duration,

    /// How many times should we retransmit the last packet?
    ///
    /// Note that this is the number of *retransmissions*, not transmissions, so
    /// setting this to `0` means that the packet will still be sent once.
    max_retransmissions: usize,
}

impl RetransmissionConfig {
    /// Default reply timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Default retransmission budget.
    pub const DEFAULT_MAX_RETRANSMISSIONS: usize = 5;

    /// Creates a config. A zero timeout is raised to one millisecond.
    pub fn new(timeout: Duration, max_retransmissions: usize) -> Self {
        Self {
            timeout: timeout.max(Duration::from_millis(1)),
            max_retransmissions,
        }
    }

    /// How long to wait for a reply.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// How many times the last packet is resent before giving up.
    pub fn max_retransmissions(&self) -> usize {
        self.max_retransmissions
    }
}

impl Default for RetransmissionConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TIMEOUT, Self::DEFAULT_MAX_RETRANSMISSIONS)
    }
}

mod bytes;
pub mod client;
pub mod endpoint;
mod error;
pub mod packet;
pub mod stream;
pub mod transfer;
mod util;

pub use client::Client;
pub use error::{Error, Result};
pub use transfer::{Direction, FinalAck, TransferSummary};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retransmission_config() {
        let config = RetransmissionConfig::default();
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(config.max_retransmissions(), 5);

        let config = RetransmissionConfig::new(Duration::ZERO, 0);
        assert_eq!(config.timeout(), Duration::from_millis(1));
        assert_eq!(config.max_retransmissions(), 0);
    }
}
