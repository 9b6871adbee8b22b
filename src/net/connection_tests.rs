use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};

use super::connection::{Connection, ConnectionEvent};

async fn pair() -> (TcpStream, TcpStream) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let client = TcpStream::connect(addr).await.unwrap();
    let (server, _) = listener.accept().await.unwrap();
    (client, server)
}

#[tokio::test]
async fn test_data_delivered_in_order() {
    let (mut client, server) = pair().await;
    let (_handle, mut events) = Connection::open(server).unwrap();

    client.write_all(b"hello ").await.unwrap();
    client.write_all(b"world").await.unwrap();

    let mut received = Vec::new();
    while received.len() < 11 {
        match events.recv().await.unwrap() {
            ConnectionEvent::Data(data) => received.extend_from_slice(&data),
            ConnectionEvent::Closed => panic!("closed before all data arrived"),
        }
    }

    assert_eq!(received, b"hello world");
}

#[tokio::test]
async fn test_closed_delivered_once_on_remote_close() {
    let (client, server) = pair().await;
    let (_handle, mut events) = Connection::open(server).unwrap();

    drop(client);

    let mut closed = 0;
    while let Some(event) = events.recv().await {
        if matches!(event, ConnectionEvent::Closed) {
            closed += 1;
        }
    }

    assert_eq!(closed, 1);
}

#[tokio::test]
async fn test_close_is_idempotent() {
    let (_client, server) = pair().await;
    let (handle, mut events) = Connection::open(server).unwrap();

    handle.close();
    handle.close();
    handle.close();
    assert!(handle.is_closed());

    let mut closed = 0;
    while let Some(event) = events.recv().await {
        if matches!(event, ConnectionEvent::Closed) {
            closed += 1;
        }
    }
    assert_eq!(closed, 1);
}

#[tokio::test]
async fn test_queued_sends_flush_before_close() {
    use tokio::io::AsyncReadExt;

    let (mut client, server) = pair().await;
    let (handle, _events) = Connection::open(server).unwrap();

    handle.send(Bytes::from_static(b"RTSP/1.0 200 OK\r\n\r\n"));
    handle.close();

    let mut received = Vec::new();
    client.read_to_end(&mut received).await.unwrap();
    assert_eq!(received, b"RTSP/1.0 200 OK\r\n\r\n");
}

#[tokio::test]
async fn test_remote_addr_matches_peer() {
    let (client, server) = pair().await;
    let (handle, _events) = Connection::open(server).unwrap();

    assert_eq!(handle.remote_addr(), client.local_addr().unwrap());
}
