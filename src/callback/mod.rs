use crate::error::GatewayError;
use crate::pkt_line::write_pkt_line;
use async_stream::stream;
use bytes::Bytes;
use tokio::sync::mpsc::{Receiver, Sender};
use tokio_stream::Stream;

/// Sending half of a response body. Dropping every clone ends the body.
#[derive(Clone)]
pub struct CallBack {
    pub callback: Sender<Bytes>,
}

impl CallBack {
    pub fn new(size: usize) -> (Self, Receiver<Bytes>) {
        let (tx, rx) = tokio::sync::mpsc::channel(size);
        (Self { callback: tx }, rx)
    }

    /// Fails with [`GatewayError::ClientGone`] once the response body has been dropped.
    pub async fn send(&self, data: Bytes) -> Result<(), GatewayError> {
        self.callback
            .send(data)
            .await
            .map_err(|_| GatewayError::ClientGone)
    }

    pub async fn send_pkt_line(&self, line: &str) -> Result<(), GatewayError> {
        self.send(write_pkt_line(line).freeze()).await
    }

    pub async fn send_flush(&self) -> Result<(), GatewayError> {
        self.send_pkt_line("").await
    }
}

/// Adapts the receiving half into a body stream for `HttpResponse::streaming`.
pub fn body_stream(mut receiver: Receiver<Bytes>) -> impl Stream<Item = Result<Bytes, std::io::Error>> {
    stream! {
        while let Some(next) = receiver.recv().await {
            yield Ok::<_, std::io::Error>(next);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_stream::StreamExt;

    #[tokio::test]
    async fn test_stream_ends_when_senders_drop() {
        let (call_back, rx) = CallBack::new(4);
        call_back.send_pkt_line("# service=git-upload-pack\n").await.unwrap();
        call_back.send_flush().await.unwrap();
        drop(call_back);
        let chunks: Vec<Bytes> = body_stream(rx).map(|chunk| chunk.unwrap()).collect().await;
        assert_eq!(chunks.len(), 2);
        assert_eq!(&chunks[0][..], b"001e# service=git-upload-pack\n");
        assert_eq!(&chunks[1][..], b"0000");
    }

    #[tokio::test]
    async fn test_send_after_receiver_dropped() {
        let (call_back, rx) = CallBack::new(1);
        drop(rx);
        assert!(matches!(
            call_back.send(Bytes::from_static(b"x")).await,
            Err(GatewayError::ClientGone)
        ));
    }
}
