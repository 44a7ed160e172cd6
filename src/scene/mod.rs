//! # Scene
//!
//! The ordered set of elements composited onto the display, bottom first.
//!
//! ```text
//! index 0     background group   (reserved, holds at most one bitmap)
//! 1 ..= n     labels             (caption and text slots, creation order)
//! last        overlay group      (reserved, holds at most one QR code)
//! ```
//!
//! Order is z-order. New labels are inserted directly below the overlay, so
//! the QR code always draws on top and the background always underneath.
//!
//! ## Updating a label
//!
//! Panels that cannot re-text a label reliably get the label rebuilt with
//! [`Scene::reorder_preserving_replace`]: every element above it is popped
//! and remembered, the label is popped and rebuilt, then everything is pushed
//! back in the original order. Surfaces that support true in-place mutation
//! use [`Scene::replace_in_place`] instead; both leave the same order.

pub mod font;
pub mod surface;
pub mod updater;

pub use font::TextFont;
pub use surface::{RasterSurface, Surface};
pub use updater::{SceneUpdater, TextSlot};

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::error::PortalError;
use crate::qr::QrBitmap;

/// Top-left position in display pixels. Written `[x, y]` in config files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "(i32, i32)", into = "(i32, i32)")]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const ORIGIN: Self = Self { x: 0, y: 0 };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl From<(i32, i32)> for Point {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

impl From<Point> for (i32, i32) {
    fn from(p: Point) -> Self {
        (p.x, p.y)
    }
}

/// Stable handle to a scene element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId(u32);

/// A full-color bitmap.
#[derive(Debug, Clone)]
pub struct Sprite {
    pub image: RgbImage,
    pub position: Point,
}

/// A run of text, one line per `\n`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub text: String,
    pub font: TextFont,
    pub color: Color,
    pub position: Point,
}

/// A rasterized QR code.
#[derive(Debug, Clone)]
pub struct QrSprite {
    pub bitmap: QrBitmap,
    pub position: Point,
}

#[derive(Debug, Clone)]
pub enum Node {
    Background(Option<Sprite>),
    Label(Label),
    Overlay(Option<QrSprite>),
}

#[derive(Debug, Clone)]
pub struct Entry {
    pub id: ElementId,
    pub node: Node,
}

/// Ordered scene graph owned by the [`SceneUpdater`].
#[derive(Debug, Clone)]
pub struct Scene {
    entries: Vec<Entry>,
    next_id: u32,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub const BACKGROUND: ElementId = ElementId(0);
    pub const OVERLAY: ElementId = ElementId(1);

    /// An empty scene: bare background and overlay groups.
    pub fn new() -> Self {
        Self {
            entries: vec![
                Entry {
                    id: Self::BACKGROUND,
                    node: Node::Background(None),
                },
                Entry {
                    id: Self::OVERLAY,
                    node: Node::Overlay(None),
                },
            ],
            next_id: 2,
        }
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Element ids bottom to top.
    pub fn ids(&self) -> Vec<ElementId> {
        self.entries.iter().map(|e| e.id).collect()
    }

    pub fn index_of(&self, id: ElementId) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }

    pub fn get(&self, id: ElementId) -> Option<&Node> {
        self.entries.iter().find(|e| e.id == id).map(|e| &e.node)
    }

    pub fn label(&self, id: ElementId) -> Option<&Label> {
        match self.get(id) {
            Some(Node::Label(label)) => Some(label),
            _ => None,
        }
    }

    /// Insert a label directly below the overlay group.
    pub fn push_label(&mut self, label: Label) -> ElementId {
        let id = ElementId(self.next_id);
        self.next_id += 1;
        let below_overlay = self.entries.len() - 1;
        self.entries.insert(
            below_overlay,
            Entry {
                id,
                node: Node::Label(label),
            },
        );
        id
    }

    /// Swap an element's content without touching anything else.
    pub fn replace_in_place(&mut self, id: ElementId, node: Node) -> Result<(), PortalError> {
        let idx = self.require(id)?;
        self.entries[idx].node = node;
        Ok(())
    }

    /// Rebuild an element by popping everything above it, popping and
    /// replacing it, then pushing the remembered elements back in order.
    pub fn reorder_preserving_replace(
        &mut self,
        id: ElementId,
        node: Node,
    ) -> Result<(), PortalError> {
        let idx = self.require(id)?;
        let later = self.entries.split_off(idx + 1);
        let mut entry = self
            .entries
            .pop()
            .ok_or_else(|| PortalError::Display("scene emptied during rebuild".into()))?;
        entry.node = node;
        self.entries.push(entry);
        self.entries.extend(later);
        Ok(())
    }

    pub fn background(&self) -> Option<&Sprite> {
        match &self.entries[0].node {
            Node::Background(sprite) => sprite.as_ref(),
            _ => None,
        }
    }

    /// Replace the background group's content, returning what was there.
    pub fn set_background(&mut self, sprite: Option<Sprite>) -> Option<Sprite> {
        match &mut self.entries[0].node {
            Node::Background(slot) => std::mem::replace(slot, sprite),
            _ => None,
        }
    }

    pub fn overlay(&self) -> Option<&QrSprite> {
        match self.entries.last().map(|e| &e.node) {
            Some(Node::Overlay(qr)) => qr.as_ref(),
            _ => None,
        }
    }

    /// Replace the overlay group's content, returning what was there.
    pub fn set_overlay(&mut self, qr: Option<QrSprite>) -> Option<QrSprite> {
        match self.entries.last_mut().map(|e| &mut e.node) {
            Some(Node::Overlay(slot)) => std::mem::replace(slot, qr),
            _ => None,
        }
    }

    fn require(&self, id: ElementId) -> Result<usize, PortalError> {
        self.index_of(id)
            .ok_or_else(|| PortalError::Display(format!("no scene element {:?}", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn label(text: &str) -> Label {
        Label {
            text: text.to_string(),
            font: TextFont::default(),
            color: Color::WHITE,
            position: Point::new(10, 10),
        }
    }

    #[test]
    fn test_new_scene_has_reserved_groups() {
        let scene = Scene::new();
        assert_eq!(scene.ids(), vec![Scene::BACKGROUND, Scene::OVERLAY]);
        assert!(scene.background().is_none());
        assert!(scene.overlay().is_none());
    }

    #[test]
    fn test_labels_stay_below_overlay() {
        let mut scene = Scene::new();
        let a = scene.push_label(label("a"));
        let b = scene.push_label(label("b"));
        assert_eq!(scene.ids(), vec![Scene::BACKGROUND, a, b, Scene::OVERLAY]);
    }

    #[test]
    fn test_reorder_preserving_replace_keeps_order() {
        let mut scene = Scene::new();
        let a = scene.push_label(label("a"));
        let b = scene.push_label(label("b"));
        let c = scene.push_label(label("c"));
        let before = scene.ids();

        for round in 0..3 {
            scene
                .reorder_preserving_replace(a, Node::Label(label(&format!("a{}", round))))
                .unwrap();
            assert_eq!(scene.ids(), before);
        }
        assert_eq!(scene.label(a).unwrap().text, "a2");
        assert_eq!(scene.label(b).unwrap().text, "b");
        assert_eq!(scene.label(c).unwrap().text, "c");
    }

    #[test]
    fn test_replace_in_place() {
        let mut scene = Scene::new();
        let a = scene.push_label(label("a"));
        let before = scene.ids();
        scene.replace_in_place(a, Node::Label(label("z"))).unwrap();
        assert_eq!(scene.ids(), before);
        assert_eq!(scene.label(a).unwrap().text, "z");
    }

    #[test]
    fn test_unknown_element() {
        let mut scene = Scene::new();
        let ghost = ElementId(99);
        assert!(scene.replace_in_place(ghost, Node::Label(label("x"))).is_err());
        assert!(scene.reorder_preserving_replace(ghost, Node::Label(label("x"))).is_err());
    }

    #[test]
    fn test_point_from_array() {
        let p: Point = serde_json::from_str("[12, -3]").unwrap();
        assert_eq!(p, Point::new(12, -3));
    }
}
