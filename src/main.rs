//! Demo host program: exposes a camera rig for live editing.

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use webconf::{
    visit_composite, visit_enumerated, EnumChoice, Enumerated, ServerConfig, Visit, Visitor,
    WebConfig,
};

#[derive(Parser, Debug)]
#[command(name = "webconf", about = "Edit a running program's settings from a browser")]
struct Args {
    /// TOML server configuration.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Overrides the configured port.
    #[arg(short, long)]
    port: Option<u16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Projection {
    Perspective,
    Orthographic,
    Fisheye,
}

impl Enumerated for Projection {
    const CHOICES: &'static [EnumChoice] = &[
        EnumChoice::new(0, "Perspective"),
        EnumChoice::new(1, "Orthographic"),
        EnumChoice::new(2, "Fisheye"),
    ];

    fn to_raw(self) -> u32 {
        self as u32
    }

    fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Projection::Perspective),
            1 => Some(Projection::Orthographic),
            2 => Some(Projection::Fisheye),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Lens {
    focal_mm: f32,
    notes: String,
}

impl Visit for Lens {
    fn visit(&mut self, v: &mut dyn Visitor) {
        v.visit_float("focal_mm", &mut self.focal_mm);
        v.visit_string("notes", &mut self.notes);
    }
}

#[derive(Debug)]
struct Camera {
    x: f32,
    y: i32,
    label: String,
    projection: Projection,
    lens: Lens,
}

impl Visit for Camera {
    fn visit(&mut self, v: &mut dyn Visitor) {
        v.visit_float("x", &mut self.x);
        v.visit_int("y", &mut self.y);
        v.visit_string("label", &mut self.label);
        v.comment("<i>Projection changes apply on the next frame.</i>\n");
        visit_enumerated(v, "projection", &mut self.projection);
        visit_composite(v, "lens", &mut self.lens);
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    if let Some(port) = args.port {
        config.port = port;
    }

    let mut web = WebConfig::new().with_config(config);
    let camera = web.tunable(
        "camera",
        Camera {
            x: 1.0,
            y: 2,
            label: "home".to_string(),
            projection: Projection::Perspective,
            lens: Lens {
                focal_mm: 35.0,
                notes: "stock lens\nno filter".to_string(),
            },
        },
    )?;
    let running = web.start()?;
    tracing::info!(
        addr = %running.local_addr(),
        file = %running.store.file().display(),
        "demo running; press Ctrl-C to exit"
    );

    loop {
        thread::sleep(Duration::from_secs(10));
        match camera.lock() {
            Ok(camera) => tracing::debug!(?camera, "current settings"),
            Err(_) => tracing::warn!("camera lock poisoned"),
        }
    }
}
