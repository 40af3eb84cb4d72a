//! The lockstep TFTP transfer: one packet in flight, one reply awaited.
//!
//! A [`Transfer`] drives exactly one read (`get`) or write (`put`) request
//! to completion over a borrowed [`Endpoint`]. It owns sequencing,
//! retransmission and termination; opening and closing the endpoint, the
//! byte source and the byte sink is left to the caller.

use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, trace, warn};

use crate::endpoint::{Endpoint, Received};
use crate::error::{Error, Result};
use crate::packet::*;
use crate::stream::{ByteSink, ByteSource};
use crate::RetransmissionConfig;

/// Longest a receive may block before the cancellation flag is looked at.
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// When an upload counts as finished.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum FinalAck {
    /// As soon as the short final block has been sent.
    #[default]
    Optimistic,

    /// Once the server acknowledges the short final block. Waiting for it
    /// is bounded by the same retransmission budget as every other reply.
    Await,
}

/// Which way the file moves.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Direction {
    /// Download from the server.
    Get,

    /// Upload to the server.
    Put,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Get => f.write_str("get"),
            Direction::Put => f.write_str("put"),
        }
    }
}

/// Where a transfer is in its lifecycle.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum State {
    /// Nothing sent yet.
    Init,

    /// Request sent, the server's Transfer ID is not known yet.
    AwaitingFirstReply,

    /// Downloading.
    Receiving,

    /// Uploading.
    Sending,

    /// Finished successfully.
    Done,

    /// Finished unsuccessfully.
    Failed,
}

/// What a successful transfer moved.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct TransferSummary {
    /// Payload bytes sent or received.
    pub bytes: u64,

    /// Data blocks sent or received, the final short block included.
    pub blocks: u64,

    /// How many times a packet was resent after a timeout.
    pub retransmissions: usize,
}

/// Mutable state of one transfer.
struct Session {
    direction: Direction,
    state: State,
    server: SocketAddr,
    peer: SocketAddr,
    negotiated: bool,
    /// Get: the block expected next. Put: the block sent last.
    block: Block,
    last_packet: Vec<u8>,
    deadline: Instant,
    retries: usize,
    final_sent: bool,
    summary: TransferSummary,
}

impl Session {
    fn new(direction: Direction, server: SocketAddr) -> Self {
        Self {
            direction,
            state: State::Init,
            server,
            peer: server,
            negotiated: false,
            block: Block::new(0),
            last_packet: Vec::new(),
            deadline: Instant::now(),
            retries: 0,
            final_sent: false,
            summary: TransferSummary::default(),
        }
    }

    fn transition(&mut self, state: State) {
        if self.state != state {
            trace!("{} transfer: {:?} -> {:?}", self.direction, self.state, state);
            self.state = state;
        }
    }

    /// Before negotiation any port on the server's host may answer; after
    /// it, only the negotiated Transfer ID.
    fn accepts(&self, from: SocketAddr) -> bool {
        if self.negotiated {
            from == self.peer
        } else {
            from.ip() == self.server.ip()
        }
    }

    fn negotiate(&mut self, from: SocketAddr, next: State) {
        if !self.negotiated {
            debug!("server answered from {}, using it as transfer ID", from);
            self.peer = from;
            self.negotiated = true;
        }
        self.transition(next);
    }

    fn record(&mut self, nbytes: usize) {
        self.summary.bytes += nbytes as u64;
        self.summary.blocks += 1;
    }
}

/// Drives a single TFTP transfer.
pub struct Transfer<'a> {
    endpoint: &'a Endpoint,
    server: SocketAddr,
    config: RetransmissionConfig,
    final_ack: FinalAck,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'a> Transfer<'a> {
    /// Prepares a transfer with the server listening on `server`.
    pub fn new(endpoint: &'a Endpoint, server: SocketAddr, config: RetransmissionConfig) -> Self {
        Self {
            endpoint,
            server,
            config,
            final_ack: FinalAck::default(),
            cancel: None,
        }
    }

    /// Sets when an upload is considered complete.
    pub fn with_final_ack(mut self, final_ack: FinalAck) -> Self {
        self.final_ack = final_ack;
        self
    }

    /// Aborts the transfer with [`Error::Cancelled`] once `flag` is set.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Downloads `filename`, writing each block to `sink` exactly once.
    pub fn get<W: ByteSink + ?Sized>(&self, filename: &str, sink: &mut W) -> Result<TransferSummary> {
        let mut session = Session::new(Direction::Get, self.server);
        let result = self.run_get(&mut session, filename, sink);
        self.finish(&mut session, result)
    }

    /// Uploads the contents of `source` as `filename`.
    pub fn put<R: ByteSource + ?Sized>(
        &self,
        filename: &str,
        source: &mut R,
    ) -> Result<TransferSummary> {
        let mut session = Session::new(Direction::Put, self.server);
        let result = self.run_put(&mut session, filename, source);
        self.finish(&mut session, result)
    }

    fn run_get<W: ByteSink + ?Sized>(
        &self,
        s: &mut Session,
        filename: &str,
        sink: &mut W,
    ) -> Result<()> {
        let rrq = encode_request(Opcode::Rrq, filename, Mode::Octet)?;
        info!("requesting {} from {}", filename, self.server);
        self.send(s, rrq)?;
        s.block = Block::new(1);
        s.transition(State::AwaitingFirstReply);

        loop {
            let (packet, from) = self.next_packet(s)?;

            match packet {
                Packet::Data(data) if data.block == s.block => {
                    s.negotiate(from, State::Receiving);
                    sink.write(&data.data).map_err(Error::LocalIo)?;
                    s.record(data.data.len());
                    self.send(s, encode_ack(data.block))?;
                    trace!("acknowledged {} ({} bytes)", data.block, data.data.len());

                    if data.is_final() {
                        return Ok(());
                    }
                    s.block = s.block.next();
                }
                // Our Ack for the previous block was lost; the server is
                // repeating itself. Answer again, but don't write twice.
                Packet::Data(data) if s.negotiated && data.block == s.block.prev() => {
                    debug!("duplicate {}, acknowledging again", data.block);
                    self.endpoint.send_to(&encode_ack(data.block), s.peer)?;
                }
                Packet::Data(data) => {
                    debug!("ignoring {} while expecting {}", data.block, s.block);
                }
                Packet::Error(err) => return Err(remote(err)),
                other => ignore(&other),
            }
        }
    }

    fn run_put<R: ByteSource + ?Sized>(
        &self,
        s: &mut Session,
        filename: &str,
        source: &mut R,
    ) -> Result<()> {
        let wrq = encode_request(Opcode::Wrq, filename, Mode::Octet)?;
        info!("sending {} to {}", filename, self.server);
        self.send(s, wrq)?;
        s.block = Block::new(0);
        s.transition(State::AwaitingFirstReply);

        loop {
            let (packet, from) = self.next_packet(s)?;

            match packet {
                Packet::Ack(ack) if ack.block == s.block => {
                    s.negotiate(from, State::Sending);

                    if s.final_sent {
                        debug!("final {} acknowledged", ack.block);
                        return Ok(());
                    }

                    let chunk = source.read(MAX_PAYLOAD_SIZE).map_err(Error::LocalIo)?;
                    let block = s.block.next();
                    self.send(s, encode_data(block, &chunk)?)?;
                    s.block = block;
                    s.record(chunk.len());
                    trace!("sent {} ({} bytes)", block, chunk.len());

                    if chunk.len() < MAX_PAYLOAD_SIZE {
                        match self.final_ack {
                            FinalAck::Optimistic => return Ok(()),
                            FinalAck::Await => s.final_sent = true,
                        }
                    }
                }
                // Acks for blocks we've moved past are duplicates. Answering
                // them would double every packet from here on.
                Packet::Ack(ack) => {
                    debug!("ignoring stale ack for {}, last sent {}", ack.block, s.block);
                }
                Packet::Error(err) => return Err(remote(err)),
                other => ignore(&other),
            }
        }
    }

    /// Sends a packet that moves the transfer forward and arms the
    /// retransmission timer for it.
    fn send(&self, s: &mut Session, bytes: Vec<u8>) -> Result<()> {
        self.endpoint.send_to(&bytes, s.peer)?;
        s.last_packet = bytes;
        s.retries = 0;
        s.deadline = Instant::now() + self.config.timeout();
        Ok(())
    }

    fn retransmit(&self, s: &mut Session) -> Result<()> {
        let max = self.config.max_retransmissions();
        if s.retries >= max {
            warn!("no reply from {} after {} retransmissions", s.peer, s.retries);
            return Err(Error::TimeoutExceeded { retries: s.retries });
        }

        s.retries += 1;
        s.summary.retransmissions += 1;
        warn!(
            "timed out waiting for {}, retransmitting ({}/{})",
            s.peer, s.retries, max
        );

        self.endpoint.send_to(&s.last_packet, s.peer)?;
        s.deadline = Instant::now() + self.config.timeout();
        Ok(())
    }

    /// Waits for the next packet that belongs to this session, resending the
    /// last one whenever the timer runs out.
    ///
    /// Stray datagrams don't push the deadline back, so a noisy network
    /// cannot keep a dead transfer alive.
    fn next_packet(&self, s: &mut Session) -> Result<(Packet, SocketAddr)> {
        loop {
            if self.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let now = Instant::now();
            if now >= s.deadline {
                self.retransmit(s)?;
                continue;
            }

            let mut wait = s.deadline - now;
            if self.cancel.is_some() {
                wait = wait.min(CANCEL_POLL_INTERVAL);
            }

            match self.endpoint.receive(wait)? {
                Received::Timeout => continue,
                Received::Datagram(bytes, from) if s.accepts(from) => {
                    return Ok((Packet::decode(bytes), from));
                }
                Received::Datagram(_, from) => self.reject(s, from),
            }
        }
    }

    /// Tells a stranger it has the wrong Transfer ID. The session itself is
    /// not affected.
    fn reject(&self, s: &Session, from: SocketAddr) {
        if !s.negotiated {
            debug!("ignoring datagram from {} before the server answered", from);
            return;
        }

        debug!("datagram from unknown transfer ID {}", from);
        let bytes = encode_error(ErrorCode::UnknownTid, ErrorCode::UnknownTid.as_str());
        if let Err(e) = self.endpoint.send_to(&bytes, from) {
            debug!("could not notify {}: {}", from, e);
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map(|flag| flag.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    fn finish(&self, s: &mut Session, result: Result<()>) -> Result<TransferSummary> {
        match result {
            Ok(()) => {
                s.transition(State::Done);
                info!(
                    "{} complete: {} bytes in {} blocks, {} retransmissions",
                    s.direction, s.summary.bytes, s.summary.blocks, s.summary.retransmissions
                );
                Ok(s.summary)
            }
            Err(err) => {
                s.transition(State::Failed);
                debug!("{} failed: {}", s.direction, err);

                // The server can't be told anything until it has a port.
                if s.negotiated {
                    if let Some((code, message)) = courtesy(&err) {
                        let bytes = encode_error(code, &message);
                        if let Err(e) = self.endpoint.send_to(&bytes, s.peer) {
                            debug!("could not send error to {}: {}", s.peer, e);
                        }
                    }
                }
                Err(err)
            }
        }
    }
}

fn remote(err: ErrorPacket) -> Error {
    Error::Remote {
        code: err.code,
        message: err.message,
    }
}

fn ignore(packet: &Packet) {
    match packet {
        Packet::Malformed(bytes) => debug!("ignoring malformed datagram ({} bytes)", bytes.len()),
        other => {
            if let Some(opcode) = other.opcode() {
                debug!("ignoring unexpected {} packet", opcode);
            }
        }
    }
}

/// The Error packet to leave the server with when we give up.
fn courtesy(err: &Error) -> Option<(ErrorCode, String)> {
    match err {
        Error::LocalIo(e) => Some((ErrorCode::from_io_kind(e.kind()), e.to_string())),
        Error::TimeoutExceeded { .. } => {
            Some((ErrorCode::NotDefined, "exceeded max retransmissions".to_string()))
        }
        Error::Cancelled => Some((ErrorCode::NotDefined, "transfer cancelled".to_string())),
        Error::Encoding(message) => Some((ErrorCode::NotDefined, message.clone())),
        Error::Remote { .. } | Error::Transport(_) => None,
    }
}
