//! A minimal lockstep TFTP server for exercising the client end to end.

#![allow(dead_code)]

use std::net::{Ipv4Addr, SocketAddr, UdpSocket};
use std::thread;
use std::time::Duration;

use tftpc::packet::*;
use tftpc::RetransmissionConfig;

const SERVER_TIMEOUT: Duration = Duration::from_millis(500);

/// What the server saw during one transfer.
#[derive(Debug, Default)]
pub struct Log {
    pub request: Option<Packet>,
    pub received: Vec<Packet>,
    pub contents: Vec<u8>,
}

pub struct TestServer {
    listen: UdpSocket,
}

pub fn client_config() -> RetransmissionConfig {
    RetransmissionConfig::new(Duration::from_secs(1), 3)
}

impl TestServer {
    pub fn bind() -> Self {
        let listen = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        listen.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        Self { listen }
    }

    pub fn addr(&self) -> SocketAddr {
        self.listen.local_addr().unwrap()
    }

    /// Asserts that nothing was sent to the request port.
    pub fn assert_silent(&self) {
        self.listen.set_nonblocking(true).unwrap();
        self.listen.recv(&mut [0; MAX_PACKET_SIZE]).unwrap_err();
    }

    fn accept(&self) -> (Packet, SocketAddr, UdpSocket) {
        let mut buf = [0; MAX_PACKET_SIZE + 1];
        let (n, client) = self.listen.recv_from(&mut buf).unwrap();
        let tid = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        tid.set_read_timeout(Some(SERVER_TIMEOUT)).unwrap();
        (Packet::decode(&buf[..n]), client, tid)
    }

    /// Answers one read request with `contents`. The first Ack for
    /// `lose_ack_of` is thrown away, as if the network dropped it.
    pub fn serve_get(self, contents: Vec<u8>, lose_ack_of: Option<u16>) -> thread::JoinHandle<Log> {
        thread::spawn(move || {
            let (request, client, tid) = self.accept();
            let mut log = Log {
                request: Some(request),
                ..Log::default()
            };
            let mut lose = lose_ack_of.map(Block::new);

            let mut block = Block::new(1);
            let mut chunks = contents.chunks(MAX_PAYLOAD_SIZE).collect::<Vec<_>>();
            if contents.len() % MAX_PAYLOAD_SIZE == 0 {
                chunks.push(&[]);
            }

            for chunk in chunks {
                let data = encode_data(block, chunk).unwrap();
                tid.send_to(&data, client).unwrap();

                loop {
                    let mut buf = [0; MAX_PACKET_SIZE + 1];
                    match tid.recv_from(&mut buf) {
                        Ok((n, _)) => {
                            let packet = Packet::decode(&buf[..n]);
                            log.received.push(packet.clone());
                            match packet {
                                Packet::Ack(ack) if ack.block == block && lose == Some(block) => {
                                    lose = None;
                                    tid.send_to(&data, client).unwrap();
                                }
                                Packet::Ack(ack) if ack.block == block => break,
                                _ => {}
                            }
                        }
                        Err(_) => {
                            tid.send_to(&data, client).unwrap();
                        }
                    }
                }

                log.contents.extend_from_slice(chunk);
                block = block.next();
            }

            log
        })
    }

    /// Accepts one write request and collects the upload.
    pub fn serve_put(self) -> thread::JoinHandle<Log> {
        thread::spawn(move || {
            let (request, client, tid) = self.accept();
            let mut log = Log {
                request: Some(request),
                ..Log::default()
            };

            tid.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
            let mut expected = Block::new(1);
            tid.send_to(&encode_ack(Block::new(0)), client).unwrap();

            loop {
                let mut buf = [0; MAX_PACKET_SIZE + 1];
                let (n, _) = tid.recv_from(&mut buf).unwrap();
                let packet = Packet::decode(&buf[..n]);
                log.received.push(packet.clone());

                if let Packet::Data(data) = packet {
                    tid.send_to(&encode_ack(data.block), client).unwrap();
                    if data.block == expected {
                        log.contents.extend_from_slice(&data.data);
                        expected = expected.next();
                        if data.is_final() {
                            break;
                        }
                    }
                }
            }

            log
        })
    }

    /// Answers the first request with an error packet.
    pub fn refuse(self, code: ErrorCode, message: &'static str) -> thread::JoinHandle<Log> {
        thread::spawn(move || {
            let (request, client, tid) = self.accept();
            tid.send_to(&encode_error(code, message), client).unwrap();
            Log {
                request: Some(request),
                ..Log::default()
            }
        })
    }
}
