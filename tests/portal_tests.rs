//! # Portal Tests
//!
//! End-to-end fetch/render runs against scripted hardware: a network link
//! that is always up, an in-memory web, and surfaces that record what they
//! were asked to draw. Storage-backed tests work in a per-test directory
//! under the system temp dir.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::io::Cursor;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use portalframe::network::{HttpTransport, NetworkInterface, Response};
use portalframe::scene::{ElementId, RasterSurface, Scene, Surface};
use portalframe::{
    Board, Color, Credentials, FetchResult, FetchStage, Portal, PortalConfig, PortalError,
    extract::Value, scene::Point,
};
use pretty_assertions::assert_eq;
use serde_json::json;

// ============================================================================
// FAKE HARDWARE
// ============================================================================

#[derive(Clone, Default)]
struct Link {
    calls: Rc<RefCell<Vec<&'static str>>>,
}

impl NetworkInterface for Link {
    fn firmware_version(&mut self) -> Result<String, PortalError> {
        Ok("test-fw".into())
    }

    fn reset(&mut self) {
        self.calls.borrow_mut().push("reset");
    }

    fn is_connected(&mut self) -> bool {
        self.calls.borrow_mut().push("is_connected");
        true
    }

    fn connect(&mut self, _credentials: &Credentials) -> Result<(), PortalError> {
        self.calls.borrow_mut().push("connect");
        Ok(())
    }
}

#[derive(Clone, Default)]
struct Web {
    pages: Rc<RefCell<HashMap<String, Vec<u8>>>>,
    requests: Rc<RefCell<Vec<String>>>,
}

impl Web {
    fn serve(&self, url: &str, body: impl Into<Vec<u8>>) {
        self.pages.borrow_mut().insert(url.to_string(), body.into());
    }
}

impl HttpTransport for Web {
    fn get(&mut self, url: &str) -> Result<Response, PortalError> {
        self.requests.borrow_mut().push(url.to_string());
        self.pages
            .borrow()
            .get(url)
            .cloned()
            .map(Response::from_bytes)
            .ok_or_else(|| PortalError::Fetch(format!("HTTP 404 for {}", url)))
    }
}

/// Remembers the element order of the last frame and counts frames.
#[derive(Clone, Default)]
struct Frames {
    count: Rc<RefCell<usize>>,
    last: Rc<RefCell<Vec<ElementId>>>,
}

impl Surface for Frames {
    fn size(&self) -> (u32, u32) {
        (320, 240)
    }

    fn refresh(&mut self, scene: &Scene) -> Result<(), PortalError> {
        *self.count.borrow_mut() += 1;
        *self.last.borrow_mut() = scene.ids();
        Ok(())
    }
}

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "portalframe-it-{}-{}",
        name,
        std::process::id()
    ));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn credentials() -> Credentials {
    Credentials {
        ssid: "home".into(),
        password: "hunter2".into(),
    }
}

fn portal_with(config: serde_json::Value, surface: Box<dyn Surface>) -> (Portal, Web, Link) {
    let config = PortalConfig::from_json_str(&config.to_string()).unwrap();
    let web = Web::default();
    let link = Link::default();
    let board = Board::new(Box::new(link.clone()), Box::new(web.clone()), surface);
    let portal = Portal::bring_up(board, &config, credentials(), Duration::ZERO).unwrap();
    (portal, web, link)
}

fn png_bytes(color: [u8; 3]) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(16, 12, image::Rgb(color)))
        .write_to(&mut out, image::ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

// ============================================================================
// FETCH AND RENDER
// ============================================================================

#[test]
fn test_integer_values_are_grouped() {
    let dir = scratch("grouped");
    let (mut portal, web, link) = portal_with(
        json!({
            "url": "http://api/count",
            "storageRoot": dir,
            "jsonPath": ["count"],
            "textPosition": [10, 10]
        }),
        Box::new(Frames::default()),
    );
    web.serve("http://api/count", r#"{"count": 1234567}"#);

    let result = portal.fetch().unwrap();
    assert_eq!(result, FetchResult::Values(vec![Value::Integer(1234567)]));
    assert_eq!(portal.scene().slot_text(0), Some("1,234,567"));
    assert_eq!(portal.stage(), FetchStage::Done);
    assert_eq!(*link.calls.borrow(), vec!["is_connected"]);
}

#[test]
fn test_non_numeric_value_is_shown_unchanged() {
    let dir = scratch("literal");
    let (mut portal, web, _) = portal_with(
        json!({
            "url": "http://api/status",
            "storageRoot": dir,
            "jsonPath": [["status", 0, "state"]],
            "textPosition": [[10, 10]]
        }),
        Box::new(Frames::default()),
    );
    web.serve(
        "http://api/status",
        r#"{"status": [{"state": "all systems go, 12 ok"}]}"#,
    );

    portal.fetch().unwrap();
    assert_eq!(portal.scene().slot_text(0), Some("all systems go, 12 ok"));
}

#[test]
fn test_xml_document() {
    let dir = scratch("xml");
    let (mut portal, web, _) = portal_with(
        json!({
            "url": "http://api/feed.xml",
            "storageRoot": dir,
            "xmlPath": [["feed", "entry", 1, "title"], ["feed", "@count"]],
            "textPosition": [[0, 0], [0, 30]]
        }),
        Box::new(Frames::default()),
    );
    web.serve(
        "http://api/feed.xml",
        r#"<feed count="2500"><entry><title>one</title></entry><entry><title>two</title></entry></feed>"#,
    );

    portal.fetch().unwrap();
    assert_eq!(portal.scene().slot_text(0), Some("two"));
    assert_eq!(portal.scene().slot_text(1), Some("2,500"));
}

#[test]
fn test_local_override_skips_network() {
    let dir = scratch("override");
    let contents = "offline demo line\nsecond line";
    fs::write(dir.join("local.txt"), contents).unwrap();
    let (mut portal, web, link) = portal_with(
        json!({"url": "http://api/never", "storageRoot": dir}),
        Box::new(Frames::default()),
    );

    let result = portal.fetch().unwrap();
    assert_eq!(result, FetchResult::Text(contents.to_string()));
    assert!(web.requests.borrow().is_empty());
    assert!(link.calls.borrow().is_empty());
}

#[test]
fn test_failed_extraction_leaves_scene_unchanged() {
    let dir = scratch("extract-fail");
    let frames = Frames::default();
    let (mut portal, web, _) = portal_with(
        json!({
            "url": "http://api/pair",
            "storageRoot": dir,
            "jsonPath": [["a"], ["b", "c"]],
            "textPosition": [[0, 0], [0, 20]]
        }),
        Box::new(frames.clone()),
    );
    web.serve("http://api/pair", r#"{"a": 1, "b": {"c": 2}}"#);
    portal.fetch().unwrap();
    let drawn = *frames.count.borrow();

    web.serve("http://api/pair", r#"{"a": 3, "b": []}"#);
    let err = portal.fetch().unwrap_err();
    assert!(matches!(err, PortalError::Extraction { .. }));
    assert!(!err.requires_restart());
    assert_eq!(*frames.count.borrow(), drawn);
    assert_eq!(portal.scene().slot_text(0), Some("1"));
    assert_eq!(portal.scene().slot_text(1), Some("2"));
}

#[test]
fn test_oversized_document_requires_restart() {
    let dir = scratch("oom");
    let (mut portal, web, _) = portal_with(
        json!({
            "url": "http://api/huge",
            "storageRoot": dir,
            "jsonPath": ["x"],
            "maxDocumentBytes": 1024
        }),
        Box::new(Frames::default()),
    );
    web.serve("http://api/huge", vec![b' '; 4096]);

    let err = portal.fetch().unwrap_err();
    assert!(matches!(err, PortalError::OutOfMemory(_)));
    assert!(err.requires_restart());
}

#[test]
fn test_callback_sees_values_first() {
    let dir = scratch("callback");
    let frames = Frames::default();
    let (mut portal, web, _) = portal_with(
        json!({
            "url": "http://api/n",
            "storageRoot": dir,
            "jsonPath": ["n"],
            "textPosition": [0, 0]
        }),
        Box::new(frames.clone()),
    );
    web.serve("http://api/n", r#"{"n": 42}"#);

    let seen = Rc::new(RefCell::new(None));
    let (record, counter) = (seen.clone(), frames.count.clone());
    portal.on_success(move |result| {
        *record.borrow_mut() = Some((result.clone(), *counter.borrow()));
        Ok(())
    });
    let before = *frames.count.borrow();

    portal.fetch().unwrap();
    assert_eq!(
        *seen.borrow(),
        Some((FetchResult::Values(vec![Value::Integer(42)]), before))
    );
    assert_eq!(*frames.count.borrow(), before + 1);
}

// ============================================================================
// SCENE ORDER
// ============================================================================

#[test]
fn test_qr_stays_on_top_across_updates() {
    let dir = scratch("order");
    let frames = Frames::default();
    let (mut portal, web, _) = portal_with(
        json!({
            "url": "http://api/pair",
            "storageRoot": dir,
            "jsonPath": [["a"], ["b"]],
            "textPosition": [[0, 0], [0, 20]],
            "captionText": "caption"
        }),
        Box::new(frames.clone()),
    );
    portal
        .show_qr("https://example.com", 96, Point::new(200, 120), Color::WHITE)
        .unwrap();

    web.serve("http://api/pair", r#"{"a": "x", "b": "y"}"#);
    portal.fetch().unwrap();
    let first = frames.last.borrow().clone();
    assert_eq!(first.first(), Some(&Scene::BACKGROUND));
    assert_eq!(first.last(), Some(&Scene::OVERLAY));
    assert_eq!(first.len(), 5);

    web.serve("http://api/pair", r#"{"a": "xx", "b": "yy"}"#);
    portal.fetch().unwrap();
    assert_eq!(*frames.last.borrow(), first);
    assert_eq!(portal.scene().slot_text(0), Some("xx"));
}

#[test]
fn test_qr_size_must_be_multiple_of_32() {
    let dir = scratch("qr-size");
    let (mut portal, _, _) = portal_with(
        json!({"url": "http://x", "storageRoot": dir}),
        Box::new(Frames::default()),
    );
    let err = portal
        .show_qr("data", 100, Point::ORIGIN, Color::BLACK)
        .unwrap_err();
    assert!(matches!(err, PortalError::Validation(_)));
}

// ============================================================================
// BACKGROUND IMAGES
// ============================================================================

#[test]
fn test_image_pipeline_swaps_background() {
    let dir = scratch("image");
    fs::write(dir.join("local.txt"), r#"{"img": "cat.png", "n": 5}"#).unwrap();
    let (mut portal, web, _) = portal_with(
        json!({
            "url": "http://api/cat",
            "storageRoot": dir,
            "jsonPath": ["n"],
            "imageJsonPath": ["img"],
            "imageConverter": "http://convert/",
            "textPosition": [0, 0]
        }),
        Box::new(Frames::default()),
    );
    web.serve("http://convert/cat.png", png_bytes([10, 20, 30]));

    portal.fetch().unwrap();
    let bg = portal.scene().scene().background().unwrap();
    assert_eq!(bg.image.get_pixel(3, 3), &image::Rgb([10, 20, 30]));
    assert!(dir.join("cache.bmp").is_file());
    assert_eq!(portal.scene().slot_text(0), Some("5"));

    fs::write(dir.join("local.txt"), r#"{"img": "gone.png", "n": 6}"#).unwrap();
    let err = portal.fetch().unwrap_err();
    assert!(matches!(err, PortalError::ImageFetch(_)));
    let bg = portal.scene().scene().background().unwrap();
    assert_eq!(bg.image.get_pixel(3, 3), &image::Rgb([10, 20, 30]));
    assert_eq!(portal.scene().slot_text(0), Some("5"));
}

// ============================================================================
// RASTER OUTPUT
// ============================================================================

#[test]
fn test_snapshot_shows_text_in_slot_color() {
    let dir = scratch("snapshot");
    let snapshot = dir.join("frame.png");
    let (mut portal, web, _) = portal_with(
        json!({
            "url": "http://api/t",
            "storageRoot": dir,
            "jsonPath": ["t"],
            "textPosition": [20, 20],
            "textColor": "#ff0000",
            "textFont": "12x24"
        }),
        Box::new(RasterSurface::new(320, 240).with_mirror(&snapshot)),
    );
    web.serve("http://api/t", r#"{"t": "HELLO"}"#);

    portal.fetch().unwrap();
    let frame = image::open(&snapshot).unwrap().to_rgb8();
    assert_eq!(frame.dimensions(), (320, 240));
    assert!(frame.pixels().any(|p| p.0 == [255, 0, 0]));
    assert_eq!(frame.get_pixel(319, 239).0, [0, 0, 0]);
}

#[test]
fn test_rebuilt_label_replaces_old_text() {
    let dir = scratch("rebuild");
    let snapshot = dir.join("frame.png");
    let (mut portal, web, _) = portal_with(
        json!({
            "url": "http://api/t",
            "storageRoot": dir,
            "jsonPath": ["t"],
            "textPosition": [20, 20],
            "textColor": "#00ff00"
        }),
        Box::new(
            RasterSurface::new(160, 80)
                .without_in_place_text()
                .with_mirror(&snapshot),
        ),
    );
    let lit = |path: &PathBuf| {
        image::open(path)
            .unwrap()
            .to_rgb8()
            .pixels()
            .filter(|p| p.0 == [0, 255, 0])
            .count()
    };

    web.serve("http://api/t", r#"{"t": "WWWWWWWW"}"#);
    portal.fetch().unwrap();
    let wide = lit(&snapshot);

    web.serve("http://api/t", r#"{"t": "W"}"#);
    portal.fetch().unwrap();
    let narrow = lit(&snapshot);

    assert_eq!(portal.scene().slot_text(0), Some("W"));
    assert!(narrow > 0);
    assert!(narrow < wide);
}
