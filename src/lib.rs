//! Live, browser-editable program settings.
//!
//! Register the objects holding your tunables, start the server, and point a
//! browser at `http://<host>:<port>/conf`. Every edit is applied to the live
//! object and saved to a flat binary file that is restored on the next run.
//!
//! ```no_run
//! use webconf::{Visit, Visitor, WebConfig};
//!
//! struct Camera { x: f32, y: i32, label: String }
//!
//! impl Visit for Camera {
//!     fn visit(&mut self, v: &mut dyn Visitor) {
//!         v.visit_float("x", &mut self.x);
//!         v.visit_int("y", &mut self.y);
//!         v.visit_string("label", &mut self.label);
//!     }
//! }
//!
//! let mut web = WebConfig::new();
//! let camera = web.tunable("camera", Camera { x: 1.0, y: 2, label: "home".into() })?;
//! let running = web.start()?;
//! println!("x = {}", camera.lock().unwrap().x);
//! # running.shutdown();
//! # Ok::<(), webconf::WebConfError>(())
//! ```

pub mod editor;
pub mod store;

use std::sync::Arc;

pub use editor::ConfigEditor;
pub use store::{ConfigStore, Locked};
pub use webconf_core::{
    visit_composite, visit_enumerated, EnumChoice, Enumerated, Registry, Result, ServerConfig,
    Tunable, Visit, Visitor, WebConfError,
};
pub use webconf_transport::{RequestLogger, ServerHandle, ThreadedServer};

/// Collects tunables and configuration, then starts the editor.
#[derive(Default)]
pub struct WebConfig {
    registry: Registry,
    config: ServerConfig,
}

impl WebConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn register<T>(&mut self, name: impl Into<String>, target: Tunable<T>) -> Result<()>
    where
        T: Visit + Send + 'static,
    {
        self.registry.register(name, target)
    }

    pub fn tunable<T>(&mut self, name: impl Into<String>, value: T) -> Result<Tunable<T>>
    where
        T: Visit + Send + 'static,
    {
        self.registry.tunable(name, value)
    }

    /// Restores saved values (defaults are kept if that fails) and starts serving.
    pub fn start(self) -> Result<Running> {
        let store = Arc::new(ConfigStore::new(self.registry, self.config.config_file.clone()));
        store.restore_or_defaults();
        let server = serve(&self.config, store.clone())?;
        Ok(Running { store, server })
    }
}

/// Binds a server with the access logger and the editor in its chain, and starts it.
pub fn serve(config: &ServerConfig, store: Arc<ConfigStore>) -> Result<ServerHandle> {
    let mut server = ThreadedServer::bind(config.clone())?;
    server.add_responder(RequestLogger);
    server.add_responder(ConfigEditor::new(config.form_name.clone(), store));
    let handle = server.start()?;
    tracing::info!(
        "editing configuration at http://{}/{}",
        handle.local_addr(),
        config.form_name
    );
    Ok(handle)
}

/// A started editor: the store it edits and the server serving it.
pub struct Running {
    pub store: Arc<ConfigStore>,
    pub server: ServerHandle,
}

impl Running {
    pub fn local_addr(&self) -> std::net::SocketAddr {
        self.server.local_addr()
    }

    pub fn shutdown(self) {
        self.server.shutdown();
    }
}
