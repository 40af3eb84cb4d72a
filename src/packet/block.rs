//! Block numbers are 16-bit sequence counters that wrap at 65536.

use std::fmt;
use std::io::{self, Result};

use crate::bytes::{Bytes, FromBytes, IntoBytes};

/// The sequence number carried by `Data` and `Ack` packets.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct Block(pub(crate) u16);

impl Block {
    /// Wraps a raw block number.
    pub const fn new(val: u16) -> Self {
        Self(val)
    }

    /// The raw block number.
    pub const fn get(self) -> u16 {
        self.0
    }

    /// The block after this one; 65535 is followed by 0.
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }

    /// The block before this one; 0 is preceded by 65535.
    pub fn prev(self) -> Self {
        Self(self.0.wrapping_sub(1))
    }
}

impl From<u16> for Block {
    fn from(val: u16) -> Self {
        Self(val)
    }
}

impl FromBytes for Block {
    type Error = io::Error;

    fn from_bytes<T: AsRef<[u8]>>(bytes: T) -> Result<Self> {
        let val = Bytes::<u16>::from_bytes(bytes)?;
        Ok(Self(val.into_inner()))
    }
}

impl IntoBytes for Block {
    fn into_bytes(self) -> Vec<u8> {
        Bytes::new(self.0).into_bytes()
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wraparound() {
        assert_eq!(Block::new(65535).next(), Block::new(0));
        assert_eq!(Block::new(0).prev(), Block::new(65535));
        assert_eq!(Block::new(7).next().prev(), Block::new(7));
    }

    #[test]
    fn test_wire_format() {
        assert_eq!(Block::new(258).into_bytes(), vec![0x01, 0x02]);
        assert_eq!(Block::from_bytes([0xffu8, 0xff]).unwrap(), Block::new(65535));
    }
}
