//! # Scene Updater
//!
//! Sole owner of the [`Scene`]. Applies minimal updates: text slots are
//! created on first use and re-texted afterwards, the background and QR
//! groups swap their single child, and unchanged text causes no redraw.

use std::path::Path;

use log::debug;

use super::{ElementId, Label, Node, Point, QrSprite, Scene, Sprite, Surface, TextFont};
use crate::color::Color;
use crate::error::PortalError;
use crate::format::clamp_chars;
use crate::qr;

/// A configured text region. The number of slots is fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSlot {
    /// Slots without a position are inert.
    pub position: Option<Point>,
    pub color: Color,
    /// Word-wrap width in characters.
    pub wrap: Option<usize>,
    /// Maximum characters shown.
    pub max_len: Option<usize>,
    element: Option<ElementId>,
}

impl TextSlot {
    pub fn new(position: Option<Point>, color: Color) -> Self {
        Self {
            position,
            color,
            wrap: None,
            max_len: None,
            element: None,
        }
    }

    pub fn with_wrap(mut self, wrap: Option<usize>) -> Self {
        self.wrap = wrap.filter(|w| *w > 0);
        self
    }

    pub fn with_max_len(mut self, max_len: Option<usize>) -> Self {
        self.max_len = max_len.filter(|n| *n > 0);
        self
    }

    /// The scene element once the slot has been drawn.
    pub fn element(&self) -> Option<ElementId> {
        self.element
    }
}

pub struct SceneUpdater {
    scene: Scene,
    surface: Box<dyn Surface>,
    font: TextFont,
    slots: Vec<TextSlot>,
    caption: Option<ElementId>,
}

impl SceneUpdater {
    pub fn new(surface: Box<dyn Surface>, font: TextFont, slots: Vec<TextSlot>) -> Self {
        Self {
            scene: Scene::new(),
            surface,
            font,
            slots,
            caption: None,
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn slots(&self) -> &[TextSlot] {
        &self.slots
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn surface_size(&self) -> (u32, u32) {
        self.surface.size()
    }

    /// Text currently shown by a slot.
    pub fn slot_text(&self, index: usize) -> Option<&str> {
        let id = self.slots.get(index)?.element?;
        self.scene.label(id).map(|l| l.text.as_str())
    }

    pub fn caption_text(&self) -> Option<&str> {
        self.scene.label(self.caption?).map(|l| l.text.as_str())
    }

    /// Replace the background bitmap, or clear it when `path` is `None` or
    /// empty. Returns once the new frame is fully drawn, so the file may be
    /// overwritten afterwards.
    ///
    /// The image is decoded before the old background is removed; a file
    /// that fails to load leaves the current background in place.
    pub fn set_background(&mut self, path: Option<&Path>) -> Result<(), PortalError> {
        let sprite = match path {
            Some(path) if !path.as_os_str().is_empty() => {
                debug!("Loading background {}", path.display());
                let fail = |e: &dyn std::fmt::Display| {
                    PortalError::Display(format!("Failed to load {}: {}", path.display(), e))
                };
                // Format comes from the content, not the file extension.
                let image = image::ImageReader::open(path)
                    .and_then(|reader| reader.with_guessed_format())
                    .map_err(|e| fail(&e))?
                    .decode()
                    .map_err(|e| fail(&e))?
                    .to_rgb8();
                Some(Sprite {
                    image,
                    position: Point::ORIGIN,
                })
            }
            _ => None,
        };

        self.scene.set_background(None);
        if let Some(sprite) = sprite {
            self.scene.set_background(Some(sprite));
        }
        self.surface.refresh(&self.scene)
    }

    /// Show `text` in slot `index`.
    ///
    /// The first call creates the slot's label. Later calls re-text it, in
    /// place when the surface supports it, otherwise by a reorder-preserving
    /// rebuild so elements added after the slot stay on top.
    pub fn set_text(&mut self, index: usize, text: &str) -> Result<(), PortalError> {
        let slot = self.slots.get(index).ok_or_else(|| {
            PortalError::Validation(format!(
                "text slot {} does not exist ({} configured)",
                index,
                self.slots.len()
            ))
        })?;
        let (existing, color, max_len) = (slot.element, slot.color, slot.max_len);
        let Some(position) = slot.position else {
            debug!("Text slot {} has no position, skipping", index);
            return Ok(());
        };
        let text = match max_len {
            Some(max) => clamp_chars(text, max),
            None => text,
        };
        let label = Label {
            text: text.to_string(),
            font: self.font,
            color,
            position,
        };

        match existing {
            None => {
                let id = self.scene.push_label(label);
                self.slots[index].element = Some(id);
            }
            Some(id) => {
                if self.scene.label(id).is_some_and(|l| l.text == label.text) {
                    return Ok(());
                }
                if self.surface.supports_in_place_text() {
                    self.scene.replace_in_place(id, Node::Label(label))?;
                } else {
                    self.scene.reorder_preserving_replace(id, Node::Label(label))?;
                }
            }
        }
        self.surface.refresh(&self.scene)
    }

    /// Show a caption. Created once; later calls change its text only.
    pub fn set_caption(
        &mut self,
        text: &str,
        position: Point,
        color: Color,
        font: TextFont,
    ) -> Result<(), PortalError> {
        match self.caption {
            Some(id) => {
                let Some(mut label) = self.scene.label(id).cloned() else {
                    return Err(PortalError::Display("caption element vanished".into()));
                };
                if label.text == text {
                    return Ok(());
                }
                label.text = text.to_string();
                self.scene.replace_in_place(id, Node::Label(label))?;
            }
            None => {
                let id = self.scene.push_label(Label {
                    text: text.to_string(),
                    font,
                    color,
                    position,
                });
                self.caption = Some(id);
            }
        }
        self.surface.refresh(&self.scene)
    }

    /// Draw a `size × size` QR code for `data` on top of everything.
    /// Empty `data` clears the QR group.
    pub fn show_qr(
        &mut self,
        data: &str,
        size: usize,
        position: Point,
        color: Color,
    ) -> Result<(), PortalError> {
        if data.is_empty() {
            return self.clear_qr();
        }
        let bitmap = qr::render(data, size)?.with_foreground(color);
        self.scene.set_overlay(Some(QrSprite { bitmap, position }));
        self.surface.refresh(&self.scene)
    }

    pub fn clear_qr(&mut self) -> Result<(), PortalError> {
        if self.scene.set_overlay(None).is_some() {
            self.surface.refresh(&self.scene)?;
        }
        Ok(())
    }
}
