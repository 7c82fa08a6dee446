pub mod channel_registry;
pub mod config;
pub mod data_store;
pub mod error;
pub mod kv_table;
pub mod reader;
pub mod server;
pub mod writer;

use std::sync::Arc;

use common::codec::TextCodec;
use common::message::Response;
use futures::StreamExt;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinError;
use tokio_util::codec::Framed;
use tracing::info;

use crate::config::ConnectionOptions;
use crate::data_store::DataStore;

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("peer address unavailable {0}")]
    PeerAddr(#[from] std::io::Error),

    #[error(transparent)]
    Reader(#[from] reader::ReaderError),

    #[error(transparent)]
    Writer(#[from] writer::WriterError),

    #[error("writer task failed {0}")]
    WriterTask(#[from] JoinError),
}

/// Serves one client until it disconnects.
pub async fn handle_connection(
    stream: TcpStream,
    store: Arc<DataStore>,
    options: ConnectionOptions,
) -> Result<(), ConnectionError> {
    let peer_addr = stream.peer_addr()?;
    info!("Accepted connection from {}", peer_addr);

    let framed = Framed::new(stream, TextCodec::with_max_length(options.max_line_length));
    // Split into writer (sink) and reader (stream) halves.
    let (writer_sink, reader_stream) = framed.split();

    // Replies flow from the reader to the writer task in request order.
    let (tx, rx) = mpsc::channel::<Response>(32);
    let reader = reader::Reader::new(reader_stream, tx, store, options);
    let writer = writer::Writer::new(writer_sink, rx);
    let writer_handle = tokio::spawn(writer.write());

    // The reader owns the only sender, so the writer drains and stops once
    // the reader returns.
    let read_result = reader.run().await;
    let write_result = writer_handle.await?;
    info!("Connection with {} closed", peer_addr);

    read_result?;
    write_result?;
    Ok(())
}
