//! ProxyServer struct and accept loop.

use super::handler::ForwardHandler;
use super::network::create_listener;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

/// The proxy server: one listen address, one forwarding handler for the
/// process lifetime.
pub struct ProxyServer {
    listen: SocketAddr,
    handler: Arc<ForwardHandler>,
}

impl ProxyServer {
    pub fn new(listen: SocketAddr, handler: ForwardHandler) -> Self {
        Self {
            listen,
            handler: Arc::new(handler),
        }
    }

    /// Bind the listen socket and serve until the process exits.
    pub async fn run(self) -> Result<(), anyhow::Error> {
        let listener = create_listener(self.listen)?;
        info!("Listening on http://{}", self.listen);
        info!("Forwarding to {}", self.handler.destination());
        if self.handler.rewrite_rule_count() > 0 {
            info!(
                "Loaded {} path rewrite rules",
                self.handler.rewrite_rule_count()
            );
        }
        self.serve(listener).await
    }

    /// Serve connections from an already-bound listener.
    ///
    /// One task per connection; the handler is shared read-only. Dropping a
    /// connection cancels its in-flight upstream request.
    pub async fn serve(self, listener: TcpListener) -> Result<(), anyhow::Error> {
        loop {
            let (stream, remote_addr) = listener.accept().await?;
            let handler = Arc::clone(&self.handler);

            tokio::spawn(async move {
                let io = TokioIo::new(stream);
                let service = service_fn(move |req| {
                    let handler = Arc::clone(&handler);
                    async move { handler.handle(req).await }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    error!("Error serving connection from {}: {}", remote_addr, err);
                }
            });
        }
    }
}
