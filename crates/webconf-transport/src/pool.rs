use std::net::{SocketAddr, TcpStream};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Sender, TrySendError};

use crate::dispatcher::Dispatcher;
use crate::server::{serve_connection, Timeouts};

/// A connection waiting for a worker.
pub type Connection = (TcpStream, SocketAddr);

/// Fixed set of worker threads fed through a bounded queue of accepted connections.
///
/// Dropping the pool closes the queue and joins every worker once the
/// connections already queued have been served.
pub struct WorkerPool {
    sender: Option<Sender<Connection>>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn new(
        size: usize,
        queue_depth: usize,
        dispatcher: Arc<Dispatcher>,
        timeouts: Timeouts,
    ) -> std::io::Result<Self> {
        let (sender, receiver) = bounded::<Connection>(queue_depth);
        let mut workers = Vec::with_capacity(size);
        for id in 0..size {
            let receiver = receiver.clone();
            let dispatcher = dispatcher.clone();
            let worker = thread::Builder::new()
                .name(format!("webconf-worker-{id}"))
                .spawn(move || {
                    for (stream, peer) in receiver.iter() {
                        let served = panic::catch_unwind(AssertUnwindSafe(|| {
                            serve_connection(&dispatcher, stream, peer, timeouts)
                        }));
                        if served.is_err() {
                            tracing::error!(
                                worker = id,
                                peer = %peer,
                                "responder panicked; connection dropped"
                            );
                        }
                    }
                    tracing::trace!(worker = id, "worker exiting");
                })?;
            workers.push(worker);
        }
        Ok(Self {
            sender: Some(sender),
            workers,
        })
    }

    /// Queues a connection, handing it back when the queue is full.
    pub fn submit(&self, conn: Connection) -> Result<(), Connection> {
        let Some(sender) = &self.sender else {
            return Err(conn);
        };
        match sender.try_send(conn) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(conn)) | Err(TrySendError::Disconnected(conn)) => Err(conn),
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        drop(self.sender.take());
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                tracing::error!("worker thread panicked outside a connection");
            }
        }
    }
}
