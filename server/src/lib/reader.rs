use std::sync::Arc;

use common::codec::{CodecError, TextCodec};
use common::message::{Command, Response};
use futures::{stream::SplitStream, StreamExt};
use thiserror::Error;
use tokio::{
    net::TcpStream,
    sync::mpsc::{error::SendError, Sender},
};
use tokio_util::codec::Framed;
use tracing::{debug, error, warn};

use crate::config::ConnectionOptions;
use crate::data_store::DataStore;

#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("request line exceeded {0} bytes")]
    LineTooLong(usize),

    #[error("read error {0}")]
    ReadError(CodecError),

    #[error("send to writer task error {0}")]
    SendToWriterTaskError(SendError<Response>),
}

/// Reads request lines, runs them against the store and hands each reply to
/// the writer task in request order.
pub struct Reader {
    stream: SplitStream<Framed<TcpStream, TextCodec>>,
    response_tx: Sender<Response>,
    store: Arc<DataStore>,
    options: ConnectionOptions,
}

impl Reader {
    pub fn new(
        stream: SplitStream<Framed<TcpStream, TextCodec>>,
        response_tx: Sender<Response>,
        store: Arc<DataStore>,
        options: ConnectionOptions,
    ) -> Self {
        Self {
            stream,
            response_tx,
            store,
            options,
        }
    }

    pub async fn run(mut self) -> Result<(), ReaderError> {
        while let Some(line) = self.stream.next().await {
            match line {
                Ok(line) => {
                    self.process_line(&line).await?;
                }
                Err(CodecError::LineTooLong) => {
                    warn!(
                        max = self.options.max_line_length,
                        "request line too long, dropping connection"
                    );
                    self.respond(Response::ERROR("line too long".to_string()))
                        .await?;
                    return Err(ReaderError::LineTooLong(self.options.max_line_length));
                }
                Err(e) => {
                    error!("Failed to read from socket: {}", e);
                    return Err(ReaderError::ReadError(e));
                }
            }
        }
        Ok(())
    }

    async fn process_line(&self, line: &str) -> Result<(), ReaderError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(());
        }

        let response = match Command::try_new(line) {
            Ok(command) => {
                debug!(?command, "executing");
                self.store
                    .execute(command, self.options.report_channel_errors)
            }
            Err(e) => Response::from(e),
        };
        self.respond(response).await
    }

    async fn respond(&self, response: Response) -> Result<(), ReaderError> {
        if let Err(e) = self.response_tx.send(response).await {
            error!("Error forwarding response: {}", e);
            return Err(ReaderError::SendToWriterTaskError(e));
        }
        Ok(())
    }
}
