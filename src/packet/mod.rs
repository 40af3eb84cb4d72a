//! Types that represent TFTP packets and their wire format.
//!
//! Every packet begins with a two byte, big-endian [`Opcode`]. The body
//! that follows depends on the opcode:
//!
//! ```text
//!  RRQ/WRQ | 01/02 | filename | 0 | mode | 0 |
//!  DATA    | 03    | block    | 0-512 bytes  |
//!  ACK     | 04    | block    |
//!  ERROR   | 05    | code     | message | 0 |
//! ```
//!
//! Decoding never fails: anything that does not parse becomes
//! [`Packet::Malformed`] and the caller decides what to do with it.

use std::mem::size_of;

use crate::bytes::{FromBytes, IntoBytes};
use crate::error::{Error, Result};
use crate::util::FirstNul;

mod ack;
mod block;
mod data;
mod error;
mod mode;
mod opcode;
mod rq;

pub use ack::Ack;
pub use block::Block;
pub use data::Data;
pub use error::{ErrorCode, ErrorPacket};
pub use mode::Mode;
pub use opcode::Opcode;
pub use rq::Request;

/// The largest payload a `Data` packet may carry.
pub const MAX_PAYLOAD_SIZE: usize = 512;

/// The largest packet a peer may legally send us: opcode + block + payload.
pub const MAX_PACKET_SIZE: usize = size_of::<u16>() * 2 + MAX_PAYLOAD_SIZE;

/// A decoded TFTP packet.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Packet {
    /// Read request.
    Rrq(Request),

    /// Write request.
    Wrq(Request),

    /// A block of file contents.
    Data(Data),

    /// Acknowledgement of a block.
    Ack(Ack),

    /// The peer gave up on the transfer.
    Error(ErrorPacket),

    /// Bytes that are not a valid TFTP packet, kept verbatim.
    Malformed(Vec<u8>),
}

impl Packet {
    /// Builds a read request.
    pub fn rrq<S: AsRef<str>>(filename: S, mode: Mode) -> Self {
        Packet::Rrq(Request::new(filename, mode))
    }

    /// Builds a write request.
    pub fn wrq<S: AsRef<str>>(filename: S, mode: Mode) -> Self {
        Packet::Wrq(Request::new(filename, mode))
    }

    /// Builds a data packet.
    pub fn data<T: AsRef<[u8]>>(block: Block, data: T) -> Self {
        Packet::Data(Data::new(block, data))
    }

    /// Builds an acknowledgement.
    pub fn ack(block: Block) -> Self {
        Packet::Ack(Ack::new(block))
    }

    /// Builds an error packet.
    pub fn error<S: Into<String>>(code: ErrorCode, message: S) -> Self {
        Packet::Error(ErrorPacket::new(code, message))
    }

    /// The opcode of this packet, `None` for malformed bytes.
    pub fn opcode(&self) -> Option<Opcode> {
        Some(match self {
            Packet::Rrq(_) => Opcode::Rrq,
            Packet::Wrq(_) => Opcode::Wrq,
            Packet::Data(_) => Opcode::Data,
            Packet::Ack(_) => Opcode::Ack,
            Packet::Error(_) => Opcode::Error,
            Packet::Malformed(_) => return None,
        })
    }

    /// Parses a datagram.
    pub fn decode<B: AsRef<[u8]>>(bytes: B) -> Packet {
        let bytes = bytes.as_ref();
        let malformed = || Packet::Malformed(bytes.to_vec());

        if bytes.len() < size_of::<u16>() {
            return malformed();
        }

        let (opcode, body) = bytes.split_at(size_of::<u16>());
        let opcode = match Opcode::from_bytes(opcode) {
            Ok(op) => op,
            Err(_) => return malformed(),
        };

        let packet = match opcode {
            Opcode::Rrq => Request::from_bytes(body).map(Packet::Rrq),
            Opcode::Wrq => Request::from_bytes(body).map(Packet::Wrq),
            Opcode::Data => Data::from_bytes(body).map(Packet::Data),
            Opcode::Ack => Ack::from_bytes(body).map(Packet::Ack),
            Opcode::Error => ErrorPacket::from_bytes(body).map(Packet::Error),
        };

        packet.unwrap_or_else(|_| malformed())
    }
}

impl IntoBytes for Packet {
    fn into_bytes(self) -> Vec<u8> {
        let (opcode, mut body) = match self {
            Packet::Rrq(rq) => (Opcode::Rrq, rq.into_bytes()),
            Packet::Wrq(rq) => (Opcode::Wrq, rq.into_bytes()),
            Packet::Data(data) => (Opcode::Data, data.into_bytes()),
            Packet::Ack(ack) => (Opcode::Ack, ack.into_bytes()),
            Packet::Error(err) => (Opcode::Error, err.into_bytes()),
            Packet::Malformed(bytes) => return bytes,
        };

        let mut bytes = opcode.into_bytes();
        bytes.append(&mut body);
        bytes
    }
}

/// Encodes a read or write request.
///
/// The filename must be non-empty and printable: NUL terminates the field on
/// the wire, and no other control character is accepted either.
pub fn encode_request(opcode: Opcode, filename: &str, mode: Mode) -> Result<Vec<u8>> {
    let packet = match opcode {
        Opcode::Rrq => Packet::rrq(filename, mode),
        Opcode::Wrq => Packet::wrq(filename, mode),
        other => {
            return Err(Error::Encoding(format!(
                "{} is not a request opcode",
                other
            )))
        }
    };

    if filename.is_empty() {
        return Err(Error::Encoding("filename is empty".to_string()));
    }
    if filename.as_bytes().first_nul_idx().is_some() {
        return Err(Error::Encoding(format!(
            "filename {:?} contains a NUL byte",
            filename
        )));
    }
    if filename.chars().any(char::is_control) {
        return Err(Error::Encoding(format!(
            "filename {:?} contains a control character",
            filename
        )));
    }

    Ok(packet.into_bytes())
}

/// Encodes a data packet, refusing payloads over 512 bytes.
pub fn encode_data(block: Block, payload: &[u8]) -> Result<Vec<u8>> {
    if payload.len() > MAX_PAYLOAD_SIZE {
        return Err(Error::Encoding(format!(
            "payload of {} bytes exceeds the {} byte block size",
            payload.len(),
            MAX_PAYLOAD_SIZE
        )));
    }

    Ok(Packet::data(block, payload).into_bytes())
}

/// Encodes an acknowledgement.
pub fn encode_ack(block: Block) -> Vec<u8> {
    Packet::ack(block).into_bytes()
}

/// Encodes an error packet. Any NUL in the message truncates it.
pub fn encode_error(code: ErrorCode, message: &str) -> Vec<u8> {
    let end = message.as_bytes().first_nul_idx().unwrap_or(message.len());
    Packet::error(code, &message[..end]).into_bytes()
}
