//! Read and write requests share one body: a filename and a mode, both
//! NUL-terminated.

use std::io::{self, ErrorKind, Result};

use super::mode::Mode;
use crate::bytes::{Bytes, FromBytes, IntoBytes};
use crate::util::FirstNul;

/// The body of an `Rrq` or `Wrq` packet.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Request {
    /// Name of the file on the server.
    pub filename: String,

    /// Transfer mode.
    pub mode: Mode,
}

impl Request {
    /// Creates a new `Request`.
    pub fn new<T: AsRef<str>>(filename: T, mode: Mode) -> Self {
        Self {
            filename: filename.as_ref().to_string(),
            mode,
        }
    }
}

impl FromBytes for Request {
    type Error = io::Error;

    fn from_bytes<T: AsRef<[u8]>>(bytes: T) -> Result<Self> {
        let bytes = bytes.as_ref();

        let first_nul = match bytes.first_nul_idx() {
            Some(0) | None => return Err(ErrorKind::InvalidInput.into()),
            Some(idx) => idx,
        };

        /* want to include the nul byte of the filename in its slice */
        let (filename, mode) = bytes.split_at(first_nul + 1);
        let filename = Bytes::<String>::from_bytes(filename)?.into_inner();
        let mode = Mode::from_bytes(mode)?;

        Ok(Self { filename, mode })
    }
}

impl IntoBytes for Request {
    fn into_bytes(self) -> Vec<u8> {
        let mut bytes = Bytes::new(self.filename).into_bytes();
        bytes.append(&mut self.mode.into_bytes());
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bytes() {
        let rq = Request::from_bytes(b"hi.txt\0netascii\0").unwrap();

        assert_eq!(rq.filename, "hi.txt");
        assert_eq!(rq.mode, Mode::NetAscii);

        assert!(Request::from_bytes(b"\0octet\0").is_err());
        assert!(Request::from_bytes(b"hi.txt\0octet").is_err());
        assert!(Request::from_bytes(b"hi.txt").is_err());
        assert!(Request::from_bytes(b"hi.txt\0octet\0trailing").is_err());
    }

    #[test]
    fn test_into_bytes() {
        let bytes = Request::new("bye.txt", Mode::Octet).into_bytes();
        assert_eq!(bytes, b"bye.txt\0octet\0".to_vec());
    }
}
