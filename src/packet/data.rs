use std::io::{self, ErrorKind, Result};
use std::mem::size_of;

use super::{Block, MAX_PAYLOAD_SIZE};
use crate::bytes::{FromBytes, IntoBytes};

/// A block of file contents.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Data {
    /// Sequence number of this block.
    pub block: Block,

    /// Between 0 and 512 bytes of payload.
    pub data: Vec<u8>,
}

impl Data {
    /// Creates a new `Data` body.
    pub fn new<T: AsRef<[u8]>>(block: Block, data: T) -> Self {
        Self {
            block,
            data: data.as_ref().to_vec(),
        }
    }

    /// A payload shorter than a full block ends the transfer.
    pub fn is_final(&self) -> bool {
        self.data.len() < MAX_PAYLOAD_SIZE
    }
}

impl FromBytes for Data {
    type Error = io::Error;

    fn from_bytes<T: AsRef<[u8]>>(bytes: T) -> Result<Self> {
        let bytes = bytes.as_ref();

        let split_at = size_of::<Block>();
        if split_at > bytes.len() || bytes.len() - split_at > MAX_PAYLOAD_SIZE {
            return Err(ErrorKind::InvalidInput.into());
        }

        let (block, data) = bytes.split_at(split_at);
        let block = Block::from_bytes(block)?;
        let data = data.to_vec();

        Ok(Self { block, data })
    }
}

impl IntoBytes for Data {
    fn into_bytes(self) -> Vec<u8> {
        let mut bytes = self.block.into_bytes();
        let mut data = self.data;
        bytes.append(&mut data);
        bytes
    }
}
