//! Listener and worker pool
//!
//! One acceptor thread hands connections to a fixed set of workers over a
//! bounded channel. Each worker serves one request per connection.

use crate::http::{HttpError, HttpRequest, HttpResponse};
use crate::routes::Router;
use crossbeam::channel;
use reflector_core::ManifestSource;
use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Read/write timeout applied to client sockets
pub const CLIENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Pending connections buffered per worker before accept blocks
const QUEUE_PER_WORKER: usize = 16;

/// Listener settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind, e.g. `127.0.0.1:8080`
    pub bind: String,
    /// Worker thread count; 0 means one per CPU
    pub workers: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            workers: 0,
        }
    }
}

impl ServerConfig {
    /// Effective worker count
    pub fn worker_count(&self) -> usize {
        if self.workers == 0 {
            num_cpus::get()
        } else {
            self.workers
        }
    }
}

pub struct Server {
    listener: TcpListener,
    workers: usize,
}

impl Server {
    pub fn bind(config: &ServerConfig) -> io::Result<Self> {
        let listener = TcpListener::bind(&config.bind)?;
        Ok(Self {
            listener,
            workers: config.worker_count(),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until the listener fails
    pub fn run<S>(self, router: Arc<Router<S>>) -> io::Result<()>
    where
        S: ManifestSource + 'static,
    {
        let (tx, rx) = channel::bounded::<TcpStream>(self.workers * QUEUE_PER_WORKER);

        let mut handles: Vec<JoinHandle<()>> = Vec::with_capacity(self.workers);
        for id in 0..self.workers {
            let rx = rx.clone();
            let router = Arc::clone(&router);
            let handle = thread::Builder::new()
                .name(format!("reflector-worker-{}", id))
                .spawn(move || {
                    for stream in rx.iter() {
                        handle_connection(stream, &router);
                    }
                })?;
            handles.push(handle);
        }
        drop(rx);

        for conn in self.listener.incoming() {
            match conn {
                Ok(stream) => {
                    if tx.send(stream).is_err() {
                        tracing::error!("all workers exited, stopping listener");
                        break;
                    }
                }
                Err(e) => tracing::warn!(error = %e, "failed to accept connection"),
            }
        }

        drop(tx);
        for handle in handles {
            let _ = handle.join();
        }
        Ok(())
    }
}

/// Serve a single request on `stream`
pub fn handle_connection<S: ManifestSource>(stream: TcpStream, router: &Router<S>) {
    let peer = stream.peer_addr().ok();
    if let Err(e) = stream
        .set_read_timeout(Some(CLIENT_TIMEOUT))
        .and_then(|_| stream.set_write_timeout(Some(CLIENT_TIMEOUT)))
    {
        tracing::warn!(?peer, error = %e, "failed to set socket timeouts");
    }

    let response = match HttpRequest::read_from(&stream) {
        Ok(request) => {
            let response = router.handle(&request);
            tracing::info!(
                ?peer,
                method = %request.method,
                path = %request.path,
                status = response.status,
                "request"
            );
            response
        }
        Err(HttpError::Io(e)) => {
            tracing::debug!(?peer, error = %e, "client closed connection before sending a request");
            return;
        }
        Err(e) => {
            tracing::debug!(?peer, error = %e, "malformed request");
            HttpResponse::text(400, e.to_string())
        }
    };

    if let Err(e) = response.write_to(&stream) {
        tracing::debug!(?peer, error = %e, "client went away before the response was written");
    }
}
