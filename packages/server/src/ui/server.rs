//! Server execution logic.

use std::{future::Future, io, net::SocketAddr, sync::Arc, time::Duration};

use tokio::{
    io::AsyncWriteExt,
    net::{TcpListener, TcpStream},
    sync::Semaphore,
};

use crate::domain::message;

use super::{error::ServerError, session::ClientSession, signal::shutdown_signal, state::AppState};

/// Pause after a failed accept before trying again.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// TCP chat server
///
/// # Example
///
/// ```ignore
/// let server = Server::new(app_state).with_max_connections(Some(1024));
/// server.run("127.0.0.1", 8080).await?;
/// ```
pub struct Server {
    /// AppState（ユースケースと接続ごとの設定）
    app: Arc<AppState>,
    /// 同時接続数の上限（None なら無制限）
    max_connections: Option<usize>,
}

impl Server {
    pub fn new(app: Arc<AppState>) -> Self {
        Self {
            app,
            max_connections: None,
        }
    }

    pub fn with_max_connections(mut self, max_connections: Option<usize>) -> Self {
        self.max_connections = max_connections;
        self
    }

    /// Bind the listener without accepting yet.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the address cannot be bound.
    pub async fn bind(self, host: &str, port: u16) -> Result<ListeningServer, ServerError> {
        let addr = format!("{}:{}", host, port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;

        Ok(ListeningServer {
            listener,
            app: self.app,
            limiter: self.max_connections.map(|n| Arc::new(Semaphore::new(n))),
        })
    }

    /// Run the chat server until Ctrl+C or SIGTERM
    ///
    /// # Arguments
    ///
    /// * `host` - The host address to bind to (e.g., "127.0.0.1")
    /// * `port` - The port number to bind to (e.g., 8080)
    pub async fn run(self, host: &str, port: u16) -> Result<(), ServerError> {
        let server = self.bind(host, port).await?;

        match server.local_addr() {
            Ok(addr) => {
                tracing::info!("Chat server listening on {}", addr);
                tracing::info!("Connect with: hiroba-client --address {}", addr);
            }
            Err(e) => tracing::warn!("Could not read local address: {}", e),
        }
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        server.serve(shutdown_signal()).await;
        Ok(())
    }
}

/// A bound server, ready to accept.
pub struct ListeningServer {
    listener: TcpListener,
    app: Arc<AppState>,
    limiter: Option<Arc<Semaphore>>,
}

impl ListeningServer {
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until `shutdown` resolves.
    ///
    /// Every connection runs in its own task; the loop never waits on one.
    pub async fn serve<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => self.spawn_session(stream, peer),
                    Err(e) => {
                        tracing::warn!("Failed to accept connection: {}", e);
                        tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                    }
                },
            }
        }

        tracing::info!("Server shutdown complete");
    }

    fn spawn_session(&self, stream: TcpStream, peer: SocketAddr) {
        let permit = match &self.limiter {
            Some(limiter) => match limiter.clone().try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    tracing::warn!("Rejecting {}: connection limit reached", peer);
                    self.reject(stream);
                    return;
                }
            },
            None => None,
        };

        let id = self.app.session_ids.allocate();
        tracing::info!("Accepted {} as {}", peer, id);

        let app = self.app.clone();
        tokio::spawn(async move {
            let _permit = permit;
            let (reader, writer) = stream.into_split();
            ClientSession::new(id, reader, writer, app).run().await;
        });
    }

    fn reject(&self, mut stream: TcpStream) {
        let write_timeout = self.app.settings.write_timeout;
        tokio::spawn(async move {
            let notice = async {
                stream.write_all(message::SERVER_FULL.as_bytes()).await?;
                stream.shutdown().await
            };
            match tokio::time::timeout(write_timeout, notice).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::debug!("Failed to send rejection notice: {}", e),
                Err(_) => tracing::debug!("Rejection notice timed out"),
            }
        });
    }
}
