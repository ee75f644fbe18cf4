pub use webconf_core::{Result, ServerConfig, WebConfError};

pub mod dispatcher;
pub mod pool;
pub mod request;
pub mod server;
pub mod session;

pub use dispatcher::{not_found, Dispatcher, RequestLogger, Responder};
pub use pool::WorkerPool;
pub use request::Request;
pub use server::{ServerHandle, ThreadedServer};
pub use session::{write_response, ClientSession, Transport};
