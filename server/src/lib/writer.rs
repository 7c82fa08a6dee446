use common::codec::{CodecError, TextCodec};
use common::message::Response;
use futures::{stream::SplitSink, SinkExt};
use thiserror::Error;
use tokio::{net::TcpStream, sync::mpsc::Receiver};
use tokio_util::codec::Framed;
use tracing::error;

#[derive(Debug, Error)]
pub enum WriterError {
    #[error("send error {0}")]
    SendError(CodecError),
}

/// Drains replies produced by the reader onto the socket. Stops once the
/// reader drops its sender.
pub struct Writer {
    sink: SplitSink<Framed<TcpStream, TextCodec>, Response>,
    rx: Receiver<Response>,
}

impl Writer {
    pub fn new(
        sink: SplitSink<Framed<TcpStream, TextCodec>, Response>,
        rx: Receiver<Response>,
    ) -> Self {
        Self { sink, rx }
    }

    pub async fn write(mut self) -> Result<(), WriterError> {
        while let Some(response) = self.rx.recv().await {
            if let Err(e) = self.sink.send(response).await {
                error!("Failed to send message: {}", e);
                return Err(WriterError::SendError(e));
            }
        }
        Ok(())
    }
}
