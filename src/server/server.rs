//! TCP Server
//!
//! Accepts connections and dispatches them to worker threads.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Receiver};
use parking_lot::Mutex;

use crate::config::Config;
use crate::error::{MoverError, Result};
use crate::wheel::FilterWheel;

use super::connection::{Connection, ConnectionEnd};
use super::handler::Handler;

/// How often the acceptor wakes up to check for shutdown
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Pending connections allowed per worker before accept blocks
const QUEUE_DEPTH_PER_WORKER: usize = 4;

/// Cloneable handle that stops a running server
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandle(Arc<AtomicBool>);

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_shutdown(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Clones of the streams workers are serving, closed on shutdown
#[derive(Debug, Default)]
struct OpenConnections {
    next_id: AtomicU64,
    streams: Mutex<HashMap<u64, TcpStream>>,
}

impl OpenConnections {
    fn register(&self, stream: &TcpStream) -> Result<u64> {
        let clone = stream.try_clone()?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.streams.lock().insert(id, clone);
        Ok(id)
    }

    fn release(&self, id: u64) {
        self.streams.lock().remove(&id);
    }

    /// Shut down every registered socket so blocked reads return
    fn close_all(&self) {
        let streams: Vec<TcpStream> = self.streams.lock().drain().map(|(_, s)| s).collect();
        if !streams.is_empty() {
            tracing::info!("Closing {} open connection(s)", streams.len());
        }
        for stream in streams {
            if let Err(e) = stream.shutdown(Shutdown::Both) {
                tracing::debug!("Closing connection failed: {}", e);
            }
        }
    }
}

/// TCP server for the filter wheel
pub struct Server {
    config: Config,
    handler: Arc<Handler>,
    listener: TcpListener,
    shutdown: ShutdownHandle,
    open: Arc<OpenConnections>,
}

impl Server {
    /// Bind the configured listen address
    pub fn bind(config: Config, wheel: Arc<dyn FilterWheel>) -> Result<Self> {
        let listener = TcpListener::bind(&config.listen_addr).map_err(|e| {
            MoverError::Config(format!("cannot listen on {}: {}", config.listen_addr, e))
        })?;
        listener.set_nonblocking(true)?;

        let local = listener.local_addr()?;
        tracing::info!("IP Address: {}", local.ip());
        tracing::info!("Port: {}", local.port());

        let handler = Arc::new(Handler::new(wheel, &config));

        Ok(Self {
            config,
            handler,
            listener,
            shutdown: ShutdownHandle::default(),
            open: Arc::new(OpenConnections::default()),
        })
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Signal the server to shutdown gracefully
    pub fn shutdown(&self) {
        self.shutdown.shutdown();
    }

    /// Start the server (blocking until shutdown)
    pub fn run(&self) -> Result<()> {
        let (tx, rx) = channel::bounded::<TcpStream>(self.config.workers * QUEUE_DEPTH_PER_WORKER);

        let workers = (0..self.config.workers)
            .map(|id| self.spawn_worker(id, rx.clone()))
            .collect::<Result<Vec<_>>>()?;
        drop(rx);

        tracing::info!("Waiting for a connection...");

        while !self.shutdown.is_shutdown() {
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    tracing::debug!("Accepted connection from {}", addr);
                    if let Err(e) = stream.set_nonblocking(false) {
                        tracing::warn!("Dropping connection from {}: {}", addr, e);
                        continue;
                    }
                    if tx.send(stream).is_err() {
                        tracing::error!("All workers have exited");
                        break;
                    }
                }
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(ref e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => {
                    tracing::warn!("Accept failed: {}", e);
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
            }
        }

        // Workers blocked on idle or busy clients must not hold up the join.
        self.open.close_all();
        drop(tx);
        for worker in workers {
            if worker.join().is_err() {
                tracing::error!("Worker thread panicked");
            }
        }

        tracing::info!("Server has been shut down successfully");
        Ok(())
    }

    fn spawn_worker(&self, id: usize, rx: Receiver<TcpStream>) -> Result<JoinHandle<()>> {
        let handler = Arc::clone(&self.handler);
        let shutdown = self.shutdown.clone();
        let open = Arc::clone(&self.open);
        let timeout_ms = self.config.read_timeout_ms;

        let handle = thread::Builder::new()
            .name(format!("fwmover-worker-{id}"))
            .spawn(move || {
                for stream in rx.iter() {
                    if shutdown.is_shutdown() {
                        // Queued behind a shutdown: close without serving.
                        continue;
                    }
                    let conn_id = match open.register(&stream) {
                        Ok(conn_id) => conn_id,
                        Err(e) => {
                            tracing::warn!("Dropping connection: {}", e);
                            continue;
                        }
                    };
                    // The flag may have tripped before registration; close_all
                    // would then have missed this stream.
                    if !shutdown.is_shutdown() {
                        if let Err(e) = serve(stream, &handler, &shutdown, timeout_ms) {
                            tracing::warn!("Connection error: {}", e);
                        }
                    }
                    open.release(conn_id);
                }
            })?;
        Ok(handle)
    }
}

fn serve(
    stream: TcpStream,
    handler: &Arc<Handler>,
    shutdown: &ShutdownHandle,
    timeout_ms: u64,
) -> Result<()> {
    let mut connection = Connection::new(stream, Arc::clone(handler), shutdown.clone())?;
    connection.set_timeouts(timeout_ms, timeout_ms)?;

    if connection.handle()? == ConnectionEnd::Shutdown {
        tracing::info!("Shutdown requested by {}", connection.peer_addr());
        shutdown.shutdown();
    }
    Ok(())
}
