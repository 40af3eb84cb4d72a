//! A client-side session with a TFTP server.
//!
//! The [`Client`] owns the transport endpoint for one transfer. Whatever
//! happens during the transfer, the endpoint is released and the byte
//! source or sink is closed (or, for a failed download, discarded) before
//! the result is handed back.

use std::net::{SocketAddr, ToSocketAddrs};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use log::debug;

use crate::endpoint::Endpoint;
use crate::error::{Error, Result};
use crate::stream::{ByteSink, ByteSource, FileSink, FileSource};
use crate::transfer::{Direction, FinalAck, Transfer, TransferSummary};
use crate::RetransmissionConfig;

/// The initial state for building a `Client`.
pub struct New(());

/// An intermediate state for building a `Client`.
///
/// At this point, the `Builder` has all the information
/// it needs to construct a client.
pub struct ConnectTo {
    server: SocketAddr,
}

/// Builds a `Client`.
pub struct Builder<T> {
    data: T,
    retransmission_config: RetransmissionConfig,
    final_ack: FinalAck,
    cancel: Option<Arc<AtomicBool>>,
}

/// Represents a single transfer with a TFTP server.
pub struct Client {
    server: SocketAddr,
    endpoint: Endpoint,
    retransmission_config: RetransmissionConfig,
    final_ack: FinalAck,
    cancel: Option<Arc<AtomicBool>>,
}

impl Builder<New> {
    /// Starts with the default retransmission settings.
    pub fn new() -> Self {
        Builder {
            data: New(()),
            retransmission_config: RetransmissionConfig::default(),
            final_ack: FinalAck::default(),
            cancel: None,
        }
    }

    /// Stores the address of the server's request port (usually 69).
    ///
    /// When `server` resolves to several addresses the first one is used.
    pub fn connect_to<A: ToSocketAddrs>(self, server: A) -> Result<Builder<ConnectTo>> {
        let server = server
            .to_socket_addrs()
            .map_err(Error::Transport)?
            .next()
            .ok_or_else(|| {
                Error::Transport(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "server address did not resolve",
                ))
            })?;

        Ok(Builder {
            data: ConnectTo { server },
            retransmission_config: self.retransmission_config,
            final_ack: self.final_ack,
            cancel: self.cancel,
        })
    }
}

impl Default for Builder<New> {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder<ConnectTo> {
    /// Opens the endpoint and constructs the client.
    pub fn build(self) -> Result<Client> {
        let endpoint = Endpoint::open_for(self.data.server)?;

        Ok(Client {
            server: self.data.server,
            endpoint,
            retransmission_config: self.retransmission_config,
            final_ack: self.final_ack,
            cancel: self.cancel,
        })
    }
}

impl<T> Builder<T> {
    /// Set the future client's retransmission config
    pub fn with_retransmission_config(mut self, retransmission_config: RetransmissionConfig) -> Self {
        self.retransmission_config = retransmission_config;
        self
    }

    /// Set when an upload is considered complete.
    pub fn with_final_ack(mut self, final_ack: FinalAck) -> Self {
        self.final_ack = final_ack;
        self
    }

    /// Cancel the transfer once `flag` becomes `true`.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }
}

impl Client {
    /// The server's request address.
    pub fn server(&self) -> SocketAddr {
        self.server
    }

    fn transfer(&self) -> Transfer<'_> {
        let transfer = Transfer::new(&self.endpoint, self.server, self.retransmission_config)
            .with_final_ack(self.final_ack);

        match &self.cancel {
            Some(flag) => transfer.with_cancel_flag(flag.clone()),
            None => transfer,
        }
    }

    /// Retrieves a file from the remote server.
    ///
    /// `sink` is closed when the download completes and aborted when it
    /// doesn't.
    pub fn get<S: AsRef<str>, W: ByteSink>(mut self, file: S, mut sink: W) -> Result<TransferSummary> {
        let result = self.transfer().get(file.as_ref(), &mut sink);
        self.endpoint.close();

        match result {
            Ok(summary) => {
                sink.close().map_err(Error::LocalIo)?;
                Ok(summary)
            }
            Err(err) => {
                sink.abort();
                Err(err)
            }
        }
    }

    /// Stores a file on the remote server.
    pub fn put<S: AsRef<str>, R: ByteSource>(mut self, file: S, mut source: R) -> Result<TransferSummary> {
        let result = self.transfer().put(file.as_ref(), &mut source);
        self.endpoint.close();

        let closed = source.close();
        let summary = result?;
        closed.map_err(Error::LocalIo)?;
        Ok(summary)
    }

    /// Downloads `remote` into the file at `local`.
    ///
    /// The file only appears under `local` once the download has completed.
    pub fn get_file<S: AsRef<str>, P: AsRef<Path>>(self, remote: S, local: P) -> Result<TransferSummary> {
        let sink = FileSink::create(local.as_ref()).map_err(Error::LocalIo)?;
        debug!("saving {} to {}", remote.as_ref(), sink.path().display());
        self.get(remote, sink)
    }

    /// Uploads the file at `local` as `remote`.
    ///
    /// A missing local file is reported before the server is contacted.
    pub fn put_file<P: AsRef<Path>, S: AsRef<str>>(self, local: P, remote: S) -> Result<TransferSummary> {
        let source = FileSource::open(local.as_ref()).map_err(Error::LocalIo)?;
        debug!("reading {} for {}", local.as_ref().display(), remote.as_ref());
        self.put(remote, source)
    }

    /// Runs a file-backed transfer in the given direction.
    pub fn run<P: AsRef<Path>>(self, direction: Direction, remote: &str, local: P) -> Result<TransferSummary> {
        match direction {
            Direction::Get => self.get_file(remote, local),
            Direction::Put => self.put_file(local, remote),
        }
    }
}
