use std::{future::Future, net::SocketAddr, sync::Arc};

use tokio::{
    net::{TcpListener, TcpStream},
    select,
};
use tracing::{info, warn};

use crate::config::ConnectionOptions;
use crate::data_store::DataStore;

/// Accept loop. Every connection gets its own task and a clone of the same
/// `Arc<DataStore>`.
pub struct Server {
    listener: TcpListener,
    store: Arc<DataStore>,
    options: ConnectionOptions,
}

impl Server {
    pub fn new(listener: TcpListener, store: Arc<DataStore>, options: ConnectionOptions) -> Self {
        Self {
            listener,
            store,
            options,
        }
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections until `shutdown` resolves. Connections already
    /// being served keep running on their own tasks.
    pub async fn run_until<F>(self, shutdown: F)
    where
        F: Future<Output = ()> + Send,
    {
        let Server {
            listener,
            store,
            options,
        } = self;
        tokio::pin!(shutdown);

        loop {
            select! {
                _ = &mut shutdown => {
                    info!("server shutting down");
                    break;
                }
                accept_result = listener.accept() => {
                    handle_accept_result(accept_result, &store, options);
                }
            }
        }
    }

    pub async fn run_until_ctrl_c(self) {
        self.run_until(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = ?err, "failed to install ctrl-c handler");
            }
        })
        .await
    }
}

fn handle_accept_result(
    result: std::io::Result<(TcpStream, SocketAddr)>,
    store: &Arc<DataStore>,
    options: ConnectionOptions,
) {
    match result {
        Ok((stream, peer)) => spawn_connection_handler(stream, peer, store, options),
        Err(err) => warn!(error = ?err, "failed to accept connection"),
    }
}

fn spawn_connection_handler(
    stream: TcpStream,
    peer: SocketAddr,
    store: &Arc<DataStore>,
    options: ConnectionOptions,
) {
    let store = Arc::clone(store);
    tokio::spawn(async move {
        if let Err(err) = crate::handle_connection(stream, store, options).await {
            warn!(peer = %peer, error = %err, "connection closed with error");
        }
    });
}
