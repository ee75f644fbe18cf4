//! # End-to-End Tests: config editor over HTTP, persistence, restore
//!
//! Each test binds an ephemeral port and saves into its own temporary directory.

mod common;

use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use common::{get, raw_request, split_response, Camera, Rig};
use webconf::{
    serve, ConfigEditor, ConfigStore, Registry, Running, ServerConfig, Tunable, Visit, Visitor,
    WebConfError, WebConfig,
};

fn config_in(dir: &Path) -> ServerConfig {
    ServerConfig {
        port: 0,
        config_file: dir.join("config.dat"),
        ..ServerConfig::default()
    }
}

fn start_camera(dir: &Path) -> (Running, Tunable<Camera>) {
    let mut web = WebConfig::new().with_config(config_in(dir));
    let camera = web.tunable("camera", Camera::home()).unwrap();
    (web.start().unwrap(), camera)
}

/// `GET /conf` shows one input per field with its current value.
#[test]
fn test_page_lists_current_values() {
    let t = Instant::now();

    let dir = tempfile::tempdir().unwrap();
    let (running, _camera) = start_camera(dir.path());

    let (status, body) = get(running.local_addr(), "/conf");
    assert_eq!(status, 200);
    assert!(body.starts_with("<HTML><TITLE>Edit Configuration</TITLE>"));
    assert!(body.contains("<H1>Configuration Editor</H1>"));
    assert!(body.contains("name=\"camera.x\" value=\"1.000000\""));
    assert!(body.contains("name=\"camera.y\" value=\"2\""));
    assert!(body.contains("name=\"camera.label\" value=\"home\""));
    assert_eq!(body.matches("<INPUT type=\"text\"").count(), 3);
    assert!(body.trim_end().ends_with("</HTML>"));
    assert!(!body.contains("ERROR!"));

    let (status, root) = get(running.local_addr(), "/");
    assert_eq!(status, 200);
    assert_eq!(root, body);

    running.shutdown();
    println!("test_page_lists_current_values: Testing Overhead = {:?}", t.elapsed());
}

/// An update changes the live object, is saved, and survives a restore into fresh defaults.
#[test]
fn test_update_persists_and_restores() {
    let dir = tempfile::tempdir().unwrap();
    let (running, camera) = start_camera(dir.path());

    assert_eq!(running.store.file(), dir.path().join("config.dat"));
    let (status, body) = get(running.local_addr(), "/conf?camera.x=3.5");
    assert_eq!(status, 200);
    assert!(body.contains("name=\"camera.x\" value=\"3.500000\""));
    assert!(!body.contains("ERROR!"));
    assert_eq!(camera.lock().unwrap().x, 3.5);
    running.shutdown();

    assert!(dir.path().join("config.dat").exists());

    let (running, camera) = start_camera(dir.path());
    assert_eq!(camera.lock().unwrap().x, 3.5, "restored on start");
    let (_, body) = get(running.local_addr(), "/conf");
    assert!(body.contains("name=\"camera.x\" value=\"3.500000\""));
    assert!(body.contains("name=\"camera.y\" value=\"2\""));
    running.shutdown();
}

/// Unknown fields produce the error banner followed by the full, unchanged page.
#[test]
fn test_missing_field_banner() {
    let dir = tempfile::tempdir().unwrap();
    let (running, camera) = start_camera(dir.path());

    let (status, body) = get(running.local_addr(), "/conf?camera.z=9");
    assert_eq!(status, 200);
    assert!(body.contains("ERROR! Missing field 'camera.z'!"));
    let banner = body.find("ERROR! Missing field").unwrap();
    let first_form = body.find("name=\"camera.x\"").unwrap();
    assert!(banner < first_form, "banner precedes the form");
    assert!(body.contains("name=\"camera.x\" value=\"1.000000\""));
    assert_eq!(*camera.lock().unwrap(), Camera::home());

    running.shutdown();
}

/// Values are URL-decoded, and only the first `=` separates name from value.
#[test]
fn test_update_decodes_value() {
    let dir = tempfile::tempdir().unwrap();
    let (running, camera) = start_camera(dir.path());
    let addr = running.local_addr();

    let (_, body) = get(addr, "/conf?camera.label=new+place%21");
    assert_eq!(camera.lock().unwrap().label, "new place!");
    assert!(body.contains("name=\"camera.label\" value=\"new place!\""));

    get(addr, "/conf?camera.label=a=b&camera.y=7");
    assert_eq!(camera.lock().unwrap().label, "a=b&camera.y=7");
    assert_eq!(camera.lock().unwrap().y, 2);

    get(addr, "/conf?camera.label=two%0Alines");
    let (_, body) = get(addr, "/conf");
    assert!(body.contains("<textarea name=\"camera.label\" cols=\"85\" rows=\"3\">two\nlines</textarea>"));

    running.shutdown();
}

/// Field names are URL-decoded too, as browsers encode the `name` of every form.
#[test]
fn test_update_decodes_field_path() {
    let dir = tempfile::tempdir().unwrap();
    let mut web = WebConfig::new().with_config(config_in(dir.path()));
    let main = web.tunable("main cam", Camera::home()).unwrap();
    let accented = web.tunable("caméra & co", Camera::home()).unwrap();
    let running = web.start().unwrap();
    let addr = running.local_addr();

    let (_, body) = get(addr, "/conf");
    assert!(body.contains("name=\"main cam.y\""));
    assert!(body.contains("name=\"caméra &amp; co.x\""));

    let (_, body) = get(addr, "/conf?main+cam.y=5");
    assert!(!body.contains("ERROR!"), "{body}");
    assert_eq!(main.lock().unwrap().y, 5);

    let (_, body) = get(addr, "/conf?cam%C3%A9ra%20%26%20co.label=ok%3Dyes");
    assert!(!body.contains("ERROR!"), "{body}");
    assert_eq!(accented.lock().unwrap().label, "ok=yes");
    assert_eq!(main.lock().unwrap().label, "home");

    running.shutdown();
}

/// Bad values and missing `=` each get their own banner.
#[test]
fn test_invalid_value_and_missing_equals() {
    let dir = tempfile::tempdir().unwrap();
    let (running, camera) = start_camera(dir.path());
    let addr = running.local_addr();

    let (_, body) = get(addr, "/conf?camera.y=lots");
    assert!(body.contains("ERROR! Invalid value 'lots' for field 'camera.y'!"));
    assert_eq!(camera.lock().unwrap().y, 2);

    let (_, body) = get(addr, "/conf?camera.y");
    assert!(body.contains("ERROR! Missing equals sign in CGI parameters!"));

    let (_, body) = get(addr, "/conf?x");
    assert!(!body.contains("ERROR!"), "short queries just render");

    running.shutdown();
}

/// Paths the editor does not own fall through to the 404 page;
/// non-GET requests are answered with 400.
#[test]
fn test_unrouted_and_malformed_requests() {
    let dir = tempfile::tempdir().unwrap();
    let (running, _camera) = start_camera(dir.path());
    let addr = running.local_addr();

    for path in ["/config", "/other", "/conf/x", "/favicon.ico"] {
        let (status, body) = get(addr, path);
        assert_eq!(status, 404, "{path}");
        assert!(body.contains("ERROR!"));
        assert!(!body.contains("<FORM"));
    }

    let response = raw_request(addr, b"POST /conf?camera.x=8 HTTP/1.1\r\nContent-Length: 0\r\n\r\n");
    let (status, _) = split_response(&response);
    assert_eq!(status, 400);

    running.shutdown();
}

/// Failed saves are reported on the page, but the live edit still happens.
#[test]
fn test_save_failure_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let mut registry = Registry::new();
    let camera = registry.tunable("camera", Camera::home()).unwrap();
    let store = Arc::new(ConfigStore::new(registry, dir.path().join("missing/sub/config.dat")));
    let editor = ConfigEditor::new("conf", store);

    let page = editor.page(Some("camera.y=5"));
    assert!(page.contains("ERROR! Could not save configuration"));
    assert!(page.contains("name=\"camera.y\" value=\"5\""));
    assert_eq!(camera.lock().unwrap().y, 5);
}

/// Restoring from a missing or truncated file keeps the defaults.
#[test]
fn test_restore_failures_keep_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("config.dat");

    let mut registry = Registry::new();
    let camera = registry.tunable("camera", Camera::home()).unwrap();
    let store = ConfigStore::new(registry, &file);

    assert!(matches!(store.restore(), Err(WebConfError::Persistence { .. })));
    assert_eq!(store.restore_or_defaults(), None);

    camera.lock().unwrap().label = "a much longer label".to_string();
    let written = store.save().unwrap();
    let bytes = std::fs::read(&file).unwrap();
    assert_eq!(bytes.len(), written);
    std::fs::write(&file, &bytes[..bytes.len() - 3]).unwrap();

    *camera.lock().unwrap() = Camera::home();
    assert!(matches!(store.restore(), Err(WebConfError::Truncated { .. })));
    assert_eq!(*camera.lock().unwrap(), Camera::home(), "no partial restore");

    std::fs::write(&file, &bytes).unwrap();
    assert_eq!(store.restore().unwrap(), written);
    assert_eq!(camera.lock().unwrap().label, "a much longer label");
}

/// Counters whose fields are edited concurrently.
struct Counters([i32; 8]);

impl Visit for Counters {
    fn visit(&mut self, v: &mut dyn Visitor) {
        for (i, slot) in self.0.iter_mut().enumerate() {
            v.visit_int(&format!("c{i}"), slot);
        }
    }
}

/// Concurrent updates to disjoint fields are never lost.
#[test]
fn test_concurrent_disjoint_updates() {
    let t = Instant::now();

    let dir = tempfile::tempdir().unwrap();
    let mut registry = Registry::new();
    let counters = registry.tunable("counters", Counters([0; 8])).unwrap();
    let rig = registry.tunable("rig", Rig::stock()).unwrap();
    let config = config_in(dir.path());
    let store = Arc::new(ConfigStore::new(registry, config.config_file.clone()));
    let handle = serve(&config, store.clone()).unwrap();
    let addr = handle.local_addr();

    const ROUNDS: i32 = 10;
    let writers: Vec<_> = (0..8)
        .map(|i| {
            thread::spawn(move || {
                for round in 1..=ROUNDS {
                    let (status, _) = get(addr, &format!("/conf?counters.c{i}={}", i as i32 * 100 + round));
                    assert_eq!(status, 200);
                }
            })
        })
        .collect();
    for writer in writers {
        writer.join().unwrap();
    }
    handle.shutdown();

    let expected: Vec<i32> = (0..8).map(|i| i * 100 + ROUNDS).collect();
    assert_eq!(counters.lock().unwrap().0.to_vec(), expected);
    assert_eq!(*rig.lock().unwrap(), Rig::stock());

    // the last save holds every final value
    *counters.lock().unwrap() = Counters([0; 8]);
    store.restore().unwrap();
    assert_eq!(counters.lock().unwrap().0.to_vec(), expected);

    println!("test_concurrent_disjoint_updates: Testing Overhead = {:?}", t.elapsed());
}
