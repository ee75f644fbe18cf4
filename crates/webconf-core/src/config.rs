use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Result, WebConfError};

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Size of the connection worker pool.
    pub workers: usize,
    /// Accepted connections allowed to wait for a worker before the server answers 503.
    pub queue_depth: usize,
    pub backlog: i32,
    pub read_timeout_ms: u64,
    pub write_timeout_ms: u64,
    /// Editor page path, served at `/<form_name>`.
    pub form_name: String,
    /// Binary file the registry is saved to after every edit.
    pub config_file: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8888,
            workers: 4,
            queue_depth: 64,
            backlog: 128,
            read_timeout_ms: 5_000,
            write_timeout_ms: 5_000,
            form_name: "conf".to_string(),
            config_file: PathBuf::from("config.dat"),
        }
    }
}

impl ServerConfig {
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: ServerConfig =
            toml::from_str(text).map_err(|e| WebConfError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| WebConfError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(WebConfError::Config("workers must be at least 1".into()));
        }
        if self.queue_depth == 0 {
            return Err(WebConfError::Config("queue_depth must be at least 1".into()));
        }
        if self.form_name.is_empty() || self.form_name.contains(['/', '?']) {
            return Err(WebConfError::Config(format!(
                "form_name '{}' must be a single non-empty path segment",
                self.form_name
            )));
        }
        Ok(())
    }

    /// Resolves `host:port`, taking the first address the resolver returns.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        (self.host.as_str(), self.port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| WebConfError::Config(format!("cannot resolve host '{}'", self.host)))
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        (self.read_timeout_ms > 0).then(|| Duration::from_millis(self.read_timeout_ms))
    }

    pub fn write_timeout(&self) -> Option<Duration> {
        (self.write_timeout_ms > 0).then(|| Duration::from_millis(self.write_timeout_ms))
    }
}
