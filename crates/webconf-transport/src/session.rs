use std::io::{self, BufReader, Read, Write};
use std::net::{IpAddr, Shutdown, SocketAddr, TcpStream};

use webconf_core::{Result, WebConfError};

use crate::request::Request;

/// Byte stream a session is served over.
pub trait Transport: Read + Write + Send {
    fn peer_addr(&self) -> io::Result<SocketAddr>;

    fn close(&mut self) -> io::Result<()>;
}

impl Transport for TcpStream {
    fn peer_addr(&self) -> io::Result<SocketAddr> {
        TcpStream::peer_addr(self)
    }

    fn close(&mut self) -> io::Result<()> {
        self.shutdown(Shutdown::Both)
    }
}

/// Writes one complete `Connection: close` response.
pub fn write_response<W: Write + ?Sized>(
    out: &mut W,
    status: u16,
    mime_type: &str,
    body: &[u8],
) -> io::Result<()> {
    let reason = if status == 200 { "OK" } else { "error" };
    let head = format!(
        "HTTP/1.1 {status} {reason}\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         Content-Type: {mime_type}\r\n\
         \r\n",
        body.len()
    );
    out.write_all(head.as_bytes())?;
    out.write_all(body)?;
    out.flush()
}

/// One accepted connection and the request it carried.
///
/// Exactly one response may be sent. The connection is closed when the
/// session is dropped, whichever path drops it.
pub struct ClientSession {
    stream: BufReader<Box<dyn Transport>>,
    peer: SocketAddr,
    request: Request,
    responded: bool,
}

impl std::fmt::Debug for ClientSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSession")
            .field("peer", &self.peer)
            .field("request", &self.request)
            .field("responded", &self.responded)
            .finish()
    }
}

impl ClientSession {
    /// Parses the request head from `stream`.
    ///
    /// A malformed request is answered with a 400 and the connection closed
    /// before the error is returned.
    pub fn open(stream: Box<dyn Transport>) -> Result<Self> {
        let peer = stream.peer_addr()?;
        let mut stream = BufReader::new(stream);
        match Request::read_from(&mut stream) {
            Ok(request) => Ok(Self {
                stream,
                peer,
                request,
                responded: false,
            }),
            Err(err) => {
                let mut raw = stream.into_inner();
                if let WebConfError::MalformedRequest(reason) = &err {
                    let body = format!("<HTML><BODY>ERROR! Bad request: {reason}</BODY></HTML>");
                    if let Err(e) = write_response(&mut raw, 400, "text/html", body.as_bytes()) {
                        tracing::debug!(peer = %peer, error = %e, "could not send 400");
                    }
                }
                let _ = raw.close();
                Err(err)
            }
        }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Requested path, query included, e.g. `/conf?camera.x=3`.
    pub fn path(&self) -> &str {
        &self.request.path
    }

    /// Header value, or `""` when the client did not send it.
    pub fn header(&self, name: &str) -> &str {
        self.request.header(name).unwrap_or("")
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn ip(&self) -> IpAddr {
        self.peer.ip()
    }

    pub fn port(&self) -> u16 {
        self.peer.port()
    }

    pub fn responded(&self) -> bool {
        self.responded
    }

    /// Sends `body` with status 200.
    pub fn send(&mut self, mime_type: &str, body: &[u8]) -> Result<()> {
        self.send_error(mime_type, body, 200)
    }

    /// Sends `body` with an arbitrary status.
    ///
    /// # Panics
    ///
    /// If a response was already sent on this session.
    pub fn send_error(&mut self, mime_type: &str, body: &[u8], status: u16) -> Result<()> {
        assert!(
            !self.responded,
            "second response on session from {}",
            self.peer
        );
        self.responded = true;
        write_response(self.stream.get_mut(), status, mime_type, body)?;
        tracing::trace!(peer = %self.peer, status, bytes = body.len(), "response sent");
        Ok(())
    }
}

impl Drop for ClientSession {
    fn drop(&mut self) {
        if let Err(e) = self.stream.get_mut().close() {
            tracing::trace!(peer = %self.peer, error = %e, "close after response");
        }
    }
}
