use std::io::{self, ErrorKind, Read};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use socket2::{Domain, Protocol, Socket, Type};
use webconf_core::{Result, ServerConfig};

use crate::dispatcher::{Dispatcher, Responder};
use crate::pool::WorkerPool;
use crate::request::MAX_LINE_LEN;
use crate::session::{write_response, ClientSession};

const ACCEPT_POLL: Duration = Duration::from_millis(25);
const ACCEPT_BACKOFF: Duration = Duration::from_millis(200);
const REFUSE_DRAIN: Duration = Duration::from_millis(10);

/// Per-connection socket timeouts.
#[derive(Debug, Clone, Copy, Default)]
pub struct Timeouts {
    pub read: Option<Duration>,
    pub write: Option<Duration>,
}

impl Timeouts {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            read: config.read_timeout(),
            write: config.write_timeout(),
        }
    }
}

/// Runs one connection through parse, dispatch, respond, close.
pub fn serve_connection(
    dispatcher: &Dispatcher,
    stream: TcpStream,
    peer: SocketAddr,
    timeouts: Timeouts,
) {
    let prepared = stream
        .set_nonblocking(false)
        .and_then(|_| stream.set_read_timeout(timeouts.read))
        .and_then(|_| stream.set_write_timeout(timeouts.write))
        .and_then(|_| stream.set_nodelay(true));
    if let Err(e) = prepared {
        tracing::warn!(peer = %peer, error = %e, "failed to configure client socket");
        return;
    }

    match ClientSession::open(Box::new(stream)) {
        Ok(mut session) => {
            tracing::debug!(peer = %peer, path = session.path(), "dispatching");
            dispatcher.dispatch(&mut session);
        }
        Err(e) => tracing::warn!(peer = %peer, error = %e, "request rejected"),
    }
}

/// One-request-per-connection HTTP server.
///
/// ```no_run
/// use webconf_transport::{RequestLogger, ThreadedServer};
/// use webconf_core::ServerConfig;
///
/// let mut server = ThreadedServer::bind(ServerConfig::default())?;
/// server.add_responder(RequestLogger);
/// let handle = server.start()?;
/// # handle.shutdown();
/// # Ok::<(), webconf_core::WebConfError>(())
/// ```
pub struct ThreadedServer {
    listener: TcpListener,
    dispatcher: Dispatcher,
    config: ServerConfig,
}

impl ThreadedServer {
    /// Binds the listening socket. Port 0 picks a free port.
    pub fn bind(config: ServerConfig) -> Result<Self> {
        config.validate()?;
        let addr = config.socket_addr()?;
        let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
        socket.set_reuse_address(true)?;
        socket.bind(&addr.into())?;
        socket.listen(config.backlog)?;
        let listener: TcpListener = socket.into();
        tracing::debug!(addr = %listener.local_addr()?, "bound");
        Ok(Self {
            listener,
            dispatcher: Dispatcher::new(),
            config,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Adds a responder to the chain. Responders are tried in order.
    pub fn add_responder<R: Responder + 'static>(&mut self, responder: R) {
        self.dispatcher.add_responder(responder);
    }

    /// Accepts one connection and serves it on the calling thread.
    pub fn service_client(&self) -> Result<()> {
        let (stream, peer) = self.listener.accept()?;
        serve_connection(&self.dispatcher, stream, peer, Timeouts::from_config(&self.config));
        Ok(())
    }

    /// Moves the listener onto its own accept thread backed by a worker pool.
    pub fn start(self) -> Result<ServerHandle> {
        let addr = self.listener.local_addr()?;
        let timeouts = Timeouts::from_config(&self.config);
        let pool = WorkerPool::new(
            self.config.workers,
            self.config.queue_depth,
            Arc::new(self.dispatcher),
            timeouts,
        )?;
        self.listener.set_nonblocking(true)?;

        let running = Arc::new(AtomicBool::new(true));
        let flag = running.clone();
        let listener = self.listener;
        let accept = thread::Builder::new()
            .name(format!("webconf-accept-{}", addr.port()))
            .spawn(move || accept_loop(listener, pool, flag))?;

        tracing::info!(%addr, workers = self.config.workers, "server started");
        Ok(ServerHandle {
            addr,
            running,
            accept: Some(accept),
        })
    }
}

fn accept_loop(listener: TcpListener, pool: WorkerPool, running: Arc<AtomicBool>) {
    while running.load(Ordering::Acquire) {
        match listener.accept() {
            Ok(conn) => {
                if let Err((stream, peer)) = pool.submit(conn) {
                    tracing::warn!(peer = %peer, "worker queue full; refusing connection");
                    refuse(stream);
                }
            }
            Err(ref e) if e.kind() == ErrorKind::WouldBlock => thread::sleep(ACCEPT_POLL),
            Err(e) => {
                tracing::error!(error = %e, "accept failed");
                thread::sleep(ACCEPT_BACKOFF);
            }
        }
    }
    tracing::info!("accept loop stopped; draining workers");
    drop(pool);
}

/// Answers 503 on the accept thread.
///
/// Whatever part of the request head arrives within `REFUSE_DRAIN` is read
/// first, so closing the socket does not reset the connection under the
/// response. The drain is one budget for the whole connection, which keeps
/// a slow client from stalling the accept loop.
fn refuse(mut stream: TcpStream) {
    let _ = stream.set_nonblocking(false);
    let deadline = Instant::now() + REFUSE_DRAIN;
    let mut head = Vec::new();
    let mut chunk = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") && head.len() < MAX_LINE_LEN {
        let left = deadline.saturating_duration_since(Instant::now());
        if left.is_zero() || stream.set_read_timeout(Some(left)).is_err() {
            break;
        }
        match stream.read(&mut chunk) {
            Ok(0) | Err(_) => break,
            Ok(n) => head.extend_from_slice(&chunk[..n]),
        }
    }
    let _ = stream.set_write_timeout(Some(REFUSE_DRAIN));
    let body = b"<HTML><BODY>ERROR! Server busy.</BODY></HTML>\n";
    let _ = write_response(&mut stream, 503, "text/html", body);
    let _ = stream.shutdown(Shutdown::Both);
}

/// Owner of a running server. Shutting down stops accepting and joins every worker.
pub struct ServerHandle {
    addr: SocketAddr,
    running: Arc<AtomicBool>,
    accept: Option<JoinHandle<()>>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn shutdown(mut self) {
        self.stop();
    }

    /// Blocks until the accept thread exits.
    pub fn join(mut self) {
        if let Some(accept) = self.accept.take() {
            if accept.join().is_err() {
                tracing::error!("accept thread panicked");
            }
        }
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(accept) = self.accept.take() {
            if accept.join().is_err() {
                tracing::error!("accept thread panicked");
            }
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
