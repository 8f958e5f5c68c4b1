use super::*;
use crate::frame::encode_frame;
use futures::sink::SinkExt as _;
use futures::stream::StreamExt as _;
use tokio::sync::mpsc::Sender;

#[derive(Clone)]
struct TestHandler {
    deliver: Sender<Bytes>,
}

#[async_trait]
impl MessageHandler for TestHandler {
    async fn dispatch(&self, writer: &mut Writer, message: Bytes) -> Result<(), Box<dyn Error>> {
        // Reply with an ACK.
        let _ = writer.send(Bytes::from("Ack")).await;

        // Deliver the message to the application.
        self.deliver.send(message).await.unwrap();
        Ok(())
    }
}

async fn connect(address: SocketAddr) -> Framed<TcpStream, LengthDelimitedCodec> {
    let stream = TcpStream::connect(address).await.unwrap();
    Framed::new(stream, LengthDelimitedCodec::new())
}

#[tokio::test]
async fn receive() {
    // Make the network receiver.
    let address = "127.0.0.1:0".parse::<SocketAddr>().unwrap();
    let (tx, mut rx) = tokio::sync::mpsc::channel(1);
    let address = Receiver::spawn(address, TestHandler { deliver: tx })
        .await
        .unwrap();

    // Send a raw and a compressed message.
    let mut transport = connect(address).await;
    for compress in [false, true] {
        let frame = encode_frame(b"block", compress).unwrap();
        transport.send(frame).await.unwrap();

        // Ensure the message gets passed to the channel and acknowledged.
        assert_eq!(rx.recv().await, Some(Bytes::from("block")));
        let ack = transport.next().await.unwrap().unwrap();
        assert_eq!(&ack[..], b"Ack");
    }
}

#[tokio::test]
async fn invalid_flag_closes_connection() {
    let address = "127.0.0.1:0".parse::<SocketAddr>().unwrap();
    let (tx, mut rx) = tokio::sync::mpsc::channel(1);
    let address = Receiver::spawn(address, TestHandler { deliver: tx })
        .await
        .unwrap();

    let mut transport = connect(address).await;
    transport.send(Bytes::from_static(&[0x07, 1, 2, 3])).await.unwrap();

    // Nothing is delivered and the receiver hangs up without acknowledging.
    assert!(transport.next().await.is_none());
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn bind_conflict() {
    let address = "127.0.0.1:0".parse::<SocketAddr>().unwrap();
    let (tx, _rx) = tokio::sync::mpsc::channel(1);
    let handler = TestHandler { deliver: tx };
    let bound = Receiver::spawn(address, handler.clone()).await.unwrap();
    assert!(matches!(
        Receiver::spawn(bound, handler).await,
        Err(NetworkError::FailedToBind(..))
    ));
}
