use super::*;
use crate::common::listener;

#[tokio::test]
async fn send() {
    // Run a TCP server.
    let address = "127.0.0.1:6100".parse::<SocketAddr>().unwrap();
    let message = Bytes::from("Hello, world!");
    let handle = listener(address, message.clone());

    // Make the network sender and send the message.
    let mut sender = ReliableSender::new(false);
    let cancel_handler = sender.send(address, &message).await.unwrap();

    // Ensure we get back an acknowledgement.
    assert_eq!(cancel_handler.await.unwrap(), Bytes::from("Ack"));

    // Ensure the server received the expected message (ie. it did not panic).
    assert!(handle.await.is_ok());
}

#[tokio::test]
async fn send_compressed() {
    let address = "127.0.0.1:6101".parse::<SocketAddr>().unwrap();
    let message = Bytes::from(vec![0u8; 4_096]);
    let handle = listener(address, message.clone());

    let mut sender = ReliableSender::new(true);
    let cancel_handler = sender.send(address, &message).await.unwrap();
    assert_eq!(cancel_handler.await.unwrap(), Bytes::from("Ack"));
    assert!(handle.await.is_ok());
}

#[tokio::test]
async fn retry_until_listener_is_up() {
    let address = "127.0.0.1:6102".parse::<SocketAddr>().unwrap();
    let message = Bytes::from("late");

    // Send before anybody listens; the connection keeps trying in the background.
    let mut sender = ReliableSender::new(false);
    let cancel_handler = sender.send(address, &message).await.unwrap();

    sleep(Duration::from_millis(200)).await;
    let handle = listener(address, message);

    assert_eq!(cancel_handler.await.unwrap(), Bytes::from("Ack"));
    assert!(handle.await.is_ok());
}

#[tokio::test]
async fn broken_connection_drops_handler() {
    // The server closes the connection without acknowledging anything.
    let address = "127.0.0.1:6103".parse::<SocketAddr>().unwrap();
    let server = tokio::spawn(async move {
        let listener = tokio::net::TcpListener::bind(&address).await.unwrap();
        let (socket, _) = listener.accept().await.unwrap();
        drop(socket);
    });

    let mut sender = ReliableSender::new(false);
    let cancel_handler = sender.send(address, b"lost").await.unwrap();
    assert!(cancel_handler.await.is_err());
    assert!(server.await.is_ok());
}
