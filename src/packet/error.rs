use std::fmt;
use std::io::{self, ErrorKind, Result};
use std::mem::size_of;

use crate::bytes::{Bytes, FromBytes, IntoBytes};
use crate::util::FirstNul;

/// `ErrorCode` represents the error conditions that can be reached during
/// a regular TFTP operation.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ErrorCode {
    /// Not defined, see error message (if any).
    NotDefined = 0,

    /// File not found.
    FileNotFound = 1,

    /// Access violation.
    AccessViolation = 2,

    /// Disk full or allocation exceeded.
    DiskFull = 3,

    /// Illegal TFTP operation.
    IllegalOperation = 4,

    /// Unknown transfer ID.
    UnknownTid = 5,

    /// File already exists.
    FileAlreadyExists = 6,

    /// No such user.
    NoSuchUser = 7,
}

impl ErrorCode {
    /// Looks up a code from the standard table.
    pub fn from_u16(val: u16) -> Option<Self> {
        Some(match val {
            0 => ErrorCode::NotDefined,
            1 => ErrorCode::FileNotFound,
            2 => ErrorCode::AccessViolation,
            3 => ErrorCode::DiskFull,
            4 => ErrorCode::IllegalOperation,
            5 => ErrorCode::UnknownTid,
            6 => ErrorCode::FileAlreadyExists,
            7 => ErrorCode::NoSuchUser,
            _ => return None,
        })
    }

    /// The standard description of this code.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::NotDefined => "Not defined",
            ErrorCode::FileNotFound => "File not found",
            ErrorCode::AccessViolation => "Access violation",
            ErrorCode::DiskFull => "Disk full or allocation exceeded",
            ErrorCode::IllegalOperation => "Illegal TFTP operation",
            ErrorCode::UnknownTid => "Unknown transfer ID",
            ErrorCode::FileAlreadyExists => "File already exists",
            ErrorCode::NoSuchUser => "No such user",
        }
    }

    /// Picks the code that best describes a local I/O failure.
    pub fn from_io_kind(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::NotFound => ErrorCode::FileNotFound,
            ErrorKind::PermissionDenied | ErrorKind::ReadOnlyFilesystem => {
                ErrorCode::AccessViolation
            }
            ErrorKind::AlreadyExists => ErrorCode::FileAlreadyExists,
            ErrorKind::StorageFull
            | ErrorKind::QuotaExceeded
            | ErrorKind::WriteZero
            | ErrorKind::OutOfMemory => ErrorCode::DiskFull,
            _ => ErrorCode::NotDefined,
        }
    }
}

impl From<ErrorCode> for u16 {
    fn from(code: ErrorCode) -> u16 {
        code as u16
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An `Error` packet is a courtesy packet that is sent prior to terminating
/// the TFTP connection due to an unrecoverable error.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ErrorPacket {
    /// The raw error code. Values outside 0-7 are passed through untouched.
    pub code: u16,

    /// A human readable description of the error.
    pub message: String,
}

impl ErrorPacket {
    /// Creates an error body from a standard code.
    pub fn new<S: Into<String>>(code: ErrorCode, message: S) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// The standard code, if the raw one is in the table.
    pub fn kind(&self) -> Option<ErrorCode> {
        ErrorCode::from_u16(self.code)
    }
}

impl FromBytes for ErrorPacket {
    type Error = io::Error;

    /// The message runs up to the first NUL, or to the end of the datagram
    /// if the peer forgot the terminator. Undecodable text becomes empty.
    fn from_bytes<T: AsRef<[u8]>>(bytes: T) -> Result<Self> {
        let bytes = bytes.as_ref();

        let split_at = size_of::<u16>();
        if split_at > bytes.len() {
            return Err(ErrorKind::InvalidInput.into());
        }

        let (code, rest) = bytes.split_at(split_at);
        let code = Bytes::<u16>::from_bytes(code)?.into_inner();

        let end = rest.first_nul_idx().unwrap_or(rest.len());
        let message = std::str::from_utf8(&rest[..end])
            .map(str::to_string)
            .unwrap_or_default();

        Ok(Self { code, message })
    }
}

impl IntoBytes for ErrorPacket {
    fn into_bytes(self) -> Vec<u8> {
        let mut bytes = Bytes::new(self.code).into_bytes();
        bytes.append(&mut Bytes::new(self.message).into_bytes());
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errorcode_conversions() {
        assert_eq!(u16::from(ErrorCode::NotDefined), 0);
        assert_eq!(u16::from(ErrorCode::FileNotFound), 1);
        assert_eq!(u16::from(ErrorCode::NoSuchUser), 7);

        for code in 0..=7 {
            assert_eq!(u16::from(ErrorCode::from_u16(code).unwrap()), code);
        }
        assert!(ErrorCode::from_u16(8).is_none());
        assert_eq!(ErrorCode::DiskFull.as_str(), "Disk full or allocation exceeded");
    }

    #[test]
    fn test_from_io_kind() {
        // ENOSPC, EROFS, ENOENT, EACCES
        let kind = |errno| io::Error::from_raw_os_error(errno).kind();
        assert_eq!(ErrorCode::from_io_kind(kind(28)), ErrorCode::DiskFull);
        assert_eq!(ErrorCode::from_io_kind(ErrorKind::QuotaExceeded), ErrorCode::DiskFull);
        assert_eq!(ErrorCode::from_io_kind(kind(30)), ErrorCode::AccessViolation);
        assert_eq!(ErrorCode::from_io_kind(kind(2)), ErrorCode::FileNotFound);
        assert_eq!(ErrorCode::from_io_kind(kind(13)), ErrorCode::AccessViolation);
        assert_eq!(ErrorCode::from_io_kind(ErrorKind::WriteZero), ErrorCode::DiskFull);
        assert_eq!(ErrorCode::from_io_kind(ErrorKind::Other), ErrorCode::NotDefined);
    }

    #[test]
    fn test_from_bytes() {
        let err = ErrorPacket::from_bytes(b"\x00\x01no such file\0").unwrap();
        assert_eq!(err.kind(), Some(ErrorCode::FileNotFound));
        assert_eq!(err.message, "no such file");

        let err = ErrorPacket::from_bytes(b"\x00\x02unterminated").unwrap();
        assert_eq!(err.message, "unterminated");

        let err = ErrorPacket::from_bytes(b"\x00\x00\xff\xfe\0").unwrap();
        assert_eq!(err.message, "");

        let err = ErrorPacket::from_bytes(b"\x00\x09").unwrap();
        assert_eq!(err.code, 9);
        assert!(err.kind().is_none());

        assert!(ErrorPacket::from_bytes([0u8]).is_err());
    }

    #[test]
    fn test_into_bytes() {
        let bytes = ErrorPacket::new(ErrorCode::UnknownTid, "go away").into_bytes();
        assert_eq!(bytes, b"\x00\x05go away\0".to_vec());
    }
}
