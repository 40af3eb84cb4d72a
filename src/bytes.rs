use std::convert::AsRef;
use std::io::{self, ErrorKind};
use std::mem::size_of;

use crate::util::FirstNul;

pub trait FromBytes: Sized {
    type Error;

    fn from_bytes<T: AsRef<[u8]>>(bytes: T) -> Result<Self, Self::Error>;
}

pub trait IntoBytes {
    fn into_bytes(self) -> Vec<u8>;
}

/// Wire representation of a primitive: big-endian integers and
/// NUL-terminated strings.
pub struct Bytes<T>(T);

impl<T> Bytes<T> {
    pub fn new(val: T) -> Self {
        Self(val)
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

impl FromBytes for Bytes<u16> {
    type Error = io::Error;

    fn from_bytes<T: AsRef<[u8]>>(bytes: T) -> io::Result<Self> {
        let bytes = bytes.as_ref();

        if bytes.len() != size_of::<u16>() {
            return Err(ErrorKind::InvalidInput.into());
        }

        let mut bs = [0u8; size_of::<u16>()];
        bs.copy_from_slice(bytes);

        Ok(Self(u16::from_be_bytes(bs)))
    }
}

impl IntoBytes for Bytes<u16> {
    fn into_bytes(self) -> Vec<u8> {
        self.0.to_be_bytes().to_vec()
    }
}

impl FromBytes for Bytes<String> {
    type Error = io::Error;

    /// Expects exactly one NUL byte, at the very end.
    fn from_bytes<T: AsRef<[u8]>>(bytes: T) -> io::Result<Self> {
        let bytes = bytes.as_ref();

        match bytes.first_nul_idx() {
            Some(idx) if idx + 1 == bytes.len() => {}
            _ => return Err(ErrorKind::InvalidInput.into()),
        }

        let s = std::str::from_utf8(&bytes[..bytes.len() - 1])
            .map_err(|_| io::Error::from(ErrorKind::InvalidInput))?;

        Ok(Self(s.to_string()))
    }
}

impl IntoBytes for Bytes<String> {
    fn into_bytes(self) -> Vec<u8> {
        let mut bytes = self.0.into_bytes();
        bytes.push(0);
        bytes
    }
}
