mod common;

use std::fs;
use std::io::ErrorKind;

use common::{client_config, TestServer};
use tftpc::packet::{ErrorCode, Mode, Packet};
use tftpc::stream::ReadSource;
use tftpc::{client, Error, FinalAck};

fn data_blocks(received: &[Packet]) -> Vec<(u16, usize)> {
    received
        .iter()
        .filter_map(|p| match p {
            Packet::Data(data) => Some((data.block.get(), data.data.len())),
            _ => None,
        })
        .collect()
}

#[test]
fn test_put_file() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("report.csv");
    let contents: Vec<u8> = (0..1300u32).map(|i| (i * 7) as u8).collect();
    fs::write(&src, &contents).unwrap();

    let server = TestServer::bind();
    let client = client::Builder::new()
        .with_retransmission_config(client_config())
        .connect_to(server.addr())
        .unwrap()
        .build()
        .unwrap();
    let server_thread = server.serve_put();

    let summary = client.put_file(&src, "report.csv").unwrap();
    let log = server_thread.join().unwrap();

    assert_eq!(log.request, Some(Packet::wrq("report.csv", Mode::Octet)));
    assert_eq!(log.contents, contents);
    assert_eq!(summary.bytes, 1300);
    assert_eq!(summary.blocks, 3);
}

#[test]
fn test_put_1024_bytes() {
    let contents = vec![0xab; 1024];

    let server = TestServer::bind();
    let client = client::Builder::new()
        .with_retransmission_config(client_config())
        .connect_to(server.addr())
        .unwrap()
        .build()
        .unwrap();
    let server_thread = server.serve_put();

    client
        .put("kilobyte.bin", ReadSource::new(&contents[..]))
        .unwrap();
    let log = server_thread.join().unwrap();

    assert_eq!(data_blocks(&log.received), vec![(1, 512), (2, 512), (3, 0)]);
    assert_eq!(log.contents, contents);
}

#[test]
fn test_put_empty_file() {
    let server = TestServer::bind();
    let client = client::Builder::new()
        .with_retransmission_config(client_config())
        .connect_to(server.addr())
        .unwrap()
        .build()
        .unwrap();
    let server_thread = server.serve_put();

    let summary = client.put("empty.txt", ReadSource::new(&b""[..])).unwrap();
    let log = server_thread.join().unwrap();

    assert_eq!(data_blocks(&log.received), vec![(1, 0)]);
    assert_eq!(summary.blocks, 1);
    assert_eq!(summary.bytes, 0);
}

#[test]
fn test_put_awaiting_final_ack() {
    let contents = vec![1; 700];

    let server = TestServer::bind();
    let client = client::Builder::new()
        .with_retransmission_config(client_config())
        .with_final_ack(FinalAck::Await)
        .connect_to(server.addr())
        .unwrap()
        .build()
        .unwrap();
    let server_thread = server.serve_put();

    let summary = client
        .put("await.bin", ReadSource::new(&contents[..]))
        .unwrap();
    let log = server_thread.join().unwrap();

    assert_eq!(log.contents, contents);
    assert_eq!(summary.retransmissions, 0);
}

#[test]
fn test_put_missing_local_file() {
    let dir = tempfile::tempdir().unwrap();

    let server = TestServer::bind();
    let client = client::Builder::new()
        .connect_to(server.addr())
        .unwrap()
        .build()
        .unwrap();

    match client.put_file(dir.path().join("nope.txt"), "nope.txt") {
        Err(Error::LocalIo(e)) => assert_eq!(e.kind(), ErrorKind::NotFound),
        other => panic!("expected a local I/O error, got {:?}", other),
    }

    // The server never heard about it.
    server.assert_silent();
}

#[test]
fn test_put_refused() {
    let server = TestServer::bind();
    let client = client::Builder::new()
        .with_retransmission_config(client_config())
        .connect_to(server.addr())
        .unwrap()
        .build()
        .unwrap();
    let server_thread = server.refuse(ErrorCode::AccessViolation, "read-only server");

    let err = client
        .put("denied.txt", ReadSource::new(&b"data"[..]))
        .unwrap_err();
    server_thread.join().unwrap();

    assert_eq!(err.remote_code(), Some(ErrorCode::AccessViolation));
    assert_eq!(
        err.to_string(),
        "remote error 2: Access violation (read-only server)"
    );
}
