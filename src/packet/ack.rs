use std::io::{self, ErrorKind, Result};
use std::mem::size_of;

use super::Block;
use crate::bytes::{FromBytes, IntoBytes};

/// Acknowledges a `Data` block, or a write request when `block` is 0.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Ack {
    /// The block being acknowledged.
    pub block: Block,
}

impl Ack {
    /// Creates a new `Ack` body.
    pub fn new(block: Block) -> Self {
        Self { block }
    }
}

impl FromBytes for Ack {
    type Error = io::Error;

    fn from_bytes<T: AsRef<[u8]>>(bytes: T) -> Result<Self> {
        let bytes = bytes.as_ref();

        if bytes.len() != size_of::<Block>() {
            return Err(ErrorKind::InvalidInput.into());
        }

        let block = Block::from_bytes(bytes)?;

        Ok(Self { block })
    }
}

impl IntoBytes for Ack {
    fn into_bytes(self) -> Vec<u8> {
        self.block.into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bytes() {
        assert_eq!(Ack::from_bytes([0u8, 12]).unwrap().block, Block(12));
        assert!(Ack::from_bytes([0u8]).is_err());
        assert!(Ack::from_bytes([0u8, 12, 0]).is_err());
    }

    #[test]
    fn test_into_bytes() {
        assert_eq!(Ack::new(Block(12)).into_bytes(), vec![0, 12]);
    }
}
