//! The client's UDP socket. Its local port is the client's Transfer ID.

use std::io::{self, ErrorKind};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
use std::time::Duration;

use log::{debug, trace, warn};
use rand::Rng;

use crate::error::{Error, Result};
use crate::packet::MAX_PACKET_SIZE;

/// Lowest port handed out as a Transfer ID.
pub const MIN_PORT_NUMBER: u16 = 1001;

/// How many random ports to try before giving up on binding.
const BIND_ATTEMPTS: usize = 16;

/// What a bounded receive produced.
#[derive(Debug, Eq, PartialEq)]
pub enum Received {
    /// A datagram and the address it came from.
    Datagram(Vec<u8>, SocketAddr),

    /// Nothing arrived in time.
    Timeout,
}

/// A connectionless socket bound to a random local port.
#[derive(Debug)]
pub struct Endpoint {
    socket: Option<UdpSocket>,
}

impl Endpoint {
    /// Binds an IPv4 endpoint on a random port.
    pub fn open() -> Result<Self> {
        Self::open_on(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
    }

    /// Binds an endpoint that can reach `peer`, matching its address family.
    pub fn open_for(peer: SocketAddr) -> Result<Self> {
        let ip = match peer {
            SocketAddr::V4(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            SocketAddr::V6(_) => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
        };

        Self::open_on(ip)
    }

    /// Generates a Transfer ID on `ip` and opens a `UdpSocket` for it.
    pub fn open_on(ip: IpAddr) -> Result<Self> {
        let mut rng = rand::thread_rng();
        let mut last_err = None;

        for _ in 0..BIND_ATTEMPTS {
            let port: u16 = rng.gen_range(MIN_PORT_NUMBER, u16::MAX);
            match UdpSocket::bind((ip, port)) {
                Ok(socket) => {
                    debug!("bound transfer endpoint to {}", SocketAddr::new(ip, port));
                    return Ok(Self {
                        socket: Some(socket),
                    });
                }
                Err(e) if e.kind() == ErrorKind::AddrInUse => {
                    trace!("port {} in use, trying another", port);
                    last_err = Some(e);
                }
                Err(e) => return Err(Error::Transport(e)),
            }
        }

        Err(Error::Transport(last_err.unwrap_or_else(|| {
            io::Error::new(ErrorKind::AddrInUse, "no free port found")
        })))
    }

    fn socket(&self) -> Result<&UdpSocket> {
        self.socket
            .as_ref()
            .ok_or_else(|| Error::Transport(ErrorKind::NotConnected.into()))
    }

    /// The locally bound address.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket()?.local_addr().map_err(Error::Transport)
    }

    /// Sends a datagram.
    ///
    /// A full send buffer is not an error: the datagram is dropped as if the
    /// network lost it, and the caller's retransmission covers for it.
    pub fn send_to(&self, bytes: &[u8], peer: SocketAddr) -> Result<()> {
        match self.socket()?.send_to(bytes, peer) {
            Ok(_) => Ok(()),
            Err(e) if is_transient(&e) => {
                warn!("dropped outgoing datagram to {}: {}", peer, e);
                Ok(())
            }
            Err(e) => Err(Error::Transport(e)),
        }
    }

    /// Waits up to `timeout` for one datagram.
    ///
    /// Datagrams larger than the largest legal TFTP packet are truncated to
    /// one byte past that size, so the codec still sees them as oversized.
    pub fn receive(&self, timeout: Duration) -> Result<Received> {
        let socket = self.socket()?;
        let timeout = timeout.max(Duration::from_millis(1));
        socket.set_read_timeout(Some(timeout)).map_err(Error::Transport)?;

        let mut buf = [0; MAX_PACKET_SIZE + 1];
        loop {
            match socket.recv_from(&mut buf) {
                Ok((nbytes, from)) => return Ok(Received::Datagram(buf[..nbytes].to_vec(), from)),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    return Ok(Received::Timeout)
                }
                // ICMP port unreachable from an earlier send surfaces here on
                // some platforms; it says nothing about the datagram we want.
                Err(e) if e.kind() == ErrorKind::ConnectionReset => {
                    debug!("ignoring {} while waiting for a reply", e);
                    return Ok(Received::Timeout);
                }
                Err(e) => return Err(Error::Transport(e)),
            }
        }
    }

    /// Releases the socket. Calling this more than once is harmless.
    pub fn close(&mut self) {
        if self.socket.take().is_some() {
            trace!("transfer endpoint closed");
        }
    }
}

fn is_transient(e: &io::Error) -> bool {
    // ENOBUFS has no stable `ErrorKind` of its own.
    const ENOBUFS: i32 = 105;

    matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted)
        || (cfg!(target_os = "linux") && e.raw_os_error() == Some(ENOBUFS))
}
