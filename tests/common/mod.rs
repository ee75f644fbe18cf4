#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use webconf::{visit_composite, visit_enumerated, EnumChoice, Enumerated, Visit, Visitor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Walk,
    Fly,
}

impl Enumerated for Mode {
    const CHOICES: &'static [EnumChoice] = &[EnumChoice::new(0, "Walk"), EnumChoice::new(7, "Fly")];

    fn to_raw(self) -> u32 {
        match self {
            Mode::Walk => 0,
            Mode::Fly => 7,
        }
    }

    fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Mode::Walk),
            7 => Some(Mode::Fly),
            _ => None,
        }
    }
}

/// The `camera` object used by the end-to-end scenarios.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub x: f32,
    pub y: i32,
    pub label: String,
}

impl Camera {
    pub fn home() -> Self {
        Self {
            x: 1.0,
            y: 2,
            label: "home".to_string(),
        }
    }
}

impl Visit for Camera {
    fn visit(&mut self, v: &mut dyn Visitor) {
        v.visit_float("x", &mut self.x);
        v.visit_int("y", &mut self.y);
        v.visit_string("label", &mut self.label);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Lens {
    pub focal: f32,
    pub notes: String,
}

/// A rig with a nested composite and an enumerated field.
#[derive(Debug, Clone, PartialEq)]
pub struct Rig {
    pub speed: i32,
    pub mode: Mode,
    pub lens: Lens,
}

impl Rig {
    pub fn stock() -> Self {
        Self {
            speed: 10,
            mode: Mode::Walk,
            lens: Lens {
                focal: 35.0,
                notes: "stock".to_string(),
            },
        }
    }
}

impl Visit for Lens {
    fn visit(&mut self, v: &mut dyn Visitor) {
        v.visit_float("focal", &mut self.focal);
        v.visit_string("notes", &mut self.notes);
    }
}

impl Visit for Rig {
    fn visit(&mut self, v: &mut dyn Visitor) {
        v.visit_int("speed", &mut self.speed);
        visit_enumerated(v, "mode", &mut self.mode);
        visit_composite(v, "lens", &mut self.lens);
    }
}

/// Sends raw request bytes and reads the whole response until the server closes.
pub fn raw_request(addr: SocketAddr, request: &[u8]) -> String {
    let mut stream = TcpStream::connect(addr).expect("connect");
    stream
        .set_read_timeout(Some(Duration::from_secs(10)))
        .expect("timeout");
    stream.write_all(request).expect("write request");
    let mut response = Vec::new();
    stream.read_to_end(&mut response).expect("read response");
    String::from_utf8_lossy(&response).into_owned()
}

/// Issues `GET <path>` and returns the status code and body.
pub fn get(addr: SocketAddr, path: &str) -> (u16, String) {
    let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nUser-Agent: webconf-tests\r\n\r\n");
    split_response(&raw_request(addr, request.as_bytes()))
}

pub fn split_response(response: &str) -> (u16, String) {
    let (head, body) = response.split_once("\r\n\r\n").expect("header terminator");
    let status = head
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .expect("status code");
    (status, body.to_string())
}
