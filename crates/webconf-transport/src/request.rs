use std::collections::HashMap;
use std::io::{BufRead, Read};

use webconf_core::{Result, WebConfError};

/// Longest request or header line accepted, in bytes.
pub const MAX_LINE_LEN: usize = 8 * 1024;
/// Most header lines accepted before the request is rejected.
pub const MAX_HEADERS: usize = 100;

/// The head of one `GET` request. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    /// Request target as sent, query string included (`/conf?camera.x=1`).
    pub path: String,
    pub version: String,
    pub headers: HashMap<String, String>,
}

impl Request {
    /// Reads the request line and headers up to the first empty line.
    ///
    /// Only `GET` is accepted; anything else is rejected immediately with
    /// [`WebConfError::MalformedRequest`]. No body is read.
    pub fn read_from<R: BufRead>(reader: &mut R) -> Result<Request> {
        let line = read_line(reader)?.ok_or_else(|| {
            WebConfError::MalformedRequest("connection closed before request line".into())
        })?;
        let (path, version) = parse_request_line(&line)?;

        let mut headers = HashMap::new();
        let mut count = 0;
        while let Some(line) = read_line(reader)? {
            if line.is_empty() {
                break;
            }
            count += 1;
            if count > MAX_HEADERS {
                return Err(WebConfError::MalformedRequest(format!(
                    "more than {MAX_HEADERS} header lines"
                )));
            }
            match line.split_once(':') {
                Some((name, value)) => {
                    let value = value.strip_prefix(' ').unwrap_or(value);
                    headers.insert(name.to_string(), value.to_string());
                }
                None => tracing::debug!(line = %line, "ignoring header line without ':'"),
            }
        }

        Ok(Request {
            method: "GET".to_string(),
            path,
            version,
            headers,
        })
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// Path without its query string.
    pub fn route(&self) -> &str {
        self.path.split_once('?').map_or(self.path.as_str(), |(route, _)| route)
    }

    /// Raw query string after the first `?`, if any.
    pub fn query(&self) -> Option<&str> {
        self.path.split_once('?').map(|(_, query)| query)
    }
}

fn parse_request_line(line: &str) -> Result<(String, String)> {
    let rest = line.strip_prefix("GET ").ok_or_else(|| {
        WebConfError::MalformedRequest(format!("only GET is supported: '{line}'"))
    })?;
    let marker = rest
        .find(" HTTP/")
        .ok_or_else(|| WebConfError::MalformedRequest(format!("missing HTTP marker: '{line}'")))?;
    let path = &rest[..marker];
    if path.is_empty() {
        return Err(WebConfError::MalformedRequest("empty request path".into()));
    }
    let version = &rest[marker + " HTTP/".len()..];
    Ok((path.to_string(), version.to_string()))
}

/// One line without its `\r\n`, or `None` at end of stream.
///
/// The length limit applies to the line's content; the terminator is not counted.
fn read_line<R: BufRead>(reader: &mut R) -> Result<Option<String>> {
    let mut buf = Vec::new();
    let read = reader
        .by_ref()
        .take(MAX_LINE_LEN as u64 + 2)
        .read_until(b'\n', &mut buf)?;
    if read == 0 {
        return Ok(None);
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
    if buf.len() > MAX_LINE_LEN {
        return Err(WebConfError::MalformedRequest(format!(
            "line longer than {MAX_LINE_LEN} bytes"
        )));
    }
    Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
}
