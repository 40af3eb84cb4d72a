//! Describes the modes of operation for TFTP.
//!
//! Only `Octet` transfers are driven by this crate; the other modes are
//! understood on the wire so requests can be decoded faithfully.

use std::fmt;
use std::io::{self, ErrorKind, Result};
use std::str::FromStr;

use crate::bytes::{Bytes, FromBytes, IntoBytes};

/// The modes of operation for TFTP.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Mode {
    /// 8-bit ASCII.
    NetAscii,

    /// 8-bit binary.
    Octet,

    /// Deprecated.
    Mail,
}

impl Mode {
    /// The on-the-wire name of this mode.
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::NetAscii => "netascii",
            Mode::Octet => "octet",
            Mode::Mail => "mail",
        }
    }
}

impl Default for Mode {
    fn default() -> Self {
        Mode::Octet
    }
}

impl IntoBytes for Mode {
    fn into_bytes(self) -> Vec<u8> {
        Bytes::new(self.as_str().to_string()).into_bytes()
    }
}

impl FromBytes for Mode {
    type Error = io::Error;

    fn from_bytes<T: AsRef<[u8]>>(bytes: T) -> Result<Self> {
        let s = Bytes::<String>::from_bytes(bytes)?.into_inner();

        Mode::from_str(&s)
    }
}

impl FromStr for Mode {
    type Err = io::Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "netascii" => Mode::NetAscii,
            "octet" => Mode::Octet,
            "mail" => Mode::Mail,
            _ => return Err(ErrorKind::InvalidInput.into()),
        })
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
