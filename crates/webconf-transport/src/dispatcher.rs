use std::sync::Arc;

use crate::session::ClientSession;

/// Handles requests for some part of the URL namespace.
///
/// Called concurrently from every worker thread.
pub trait Responder: Send + Sync {
    /// Returns `true` if this responder handled the request, which stops the chain.
    fn respond(&self, client: &mut ClientSession) -> bool;
}

pub type Fallback = Box<dyn Fn(&mut ClientSession) + Send + Sync>;

/// Sends the 404 page for requests no responder claimed.
pub fn not_found(client: &mut ClientSession) {
    let body = "<HTML><BODY>ERROR! No page at this address.</BODY></HTML>\n";
    if let Err(e) = client.send_error("text/html", body.as_bytes(), 404) {
        tracing::debug!(peer = %client.peer(), error = %e, "could not send 404");
    }
}

/// Ordered responder chain; the first responder to claim a request wins.
pub struct Dispatcher {
    responders: Vec<Arc<dyn Responder>>,
    fallback: Fallback,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            responders: Vec::new(),
            fallback: Box::new(not_found),
        }
    }

    /// Appends to the chain. Responders are tried in the order they were added.
    pub fn add_responder<R: Responder + 'static>(&mut self, responder: R) {
        self.responders.push(Arc::new(responder));
    }

    /// Replaces the default 404 page.
    pub fn set_fallback<F>(&mut self, fallback: F)
    where
        F: Fn(&mut ClientSession) + Send + Sync + 'static,
    {
        self.fallback = Box::new(fallback);
    }

    pub fn len(&self) -> usize {
        self.responders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responders.is_empty()
    }

    /// Runs the chain over `client`. Returns `false` when the fallback had to answer.
    pub fn dispatch(&self, client: &mut ClientSession) -> bool {
        for responder in &self.responders {
            if responder.respond(client) {
                return true;
            }
        }
        tracing::debug!(path = client.path(), "no responder");
        (self.fallback)(client);
        false
    }
}

/// Access log in the spirit of Apache's: address, path, referer, user agent.
///
/// Never claims a request, so it belongs at the front of the chain.
#[derive(Debug, Default, Clone, Copy)]
pub struct RequestLogger;

impl Responder for RequestLogger {
    fn respond(&self, client: &mut ClientSession) -> bool {
        tracing::info!(
            target: "webconf::access",
            ip = %client.ip(),
            port = client.port(),
            path = client.path(),
            referer = client.header("Referer"),
            user_agent = client.header("User-Agent"),
            "GET"
        );
        false
    }
}
