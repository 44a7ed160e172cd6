//! Display surfaces.
//!
//! A [`Surface`] turns a [`Scene`] into pixels on a panel. The scene graph is
//! the only input; surfaces keep no element state of their own.

use std::path::PathBuf;

use image::RgbImage;
use log::debug;

use super::{Label, Node, Point, QrSprite, Scene, Sprite};
use crate::color::Color;
use crate::error::PortalError;

pub trait Surface {
    /// Panel size `(width, height)` in pixels.
    fn size(&self) -> (u32, u32);

    /// Draw the scene and block until the frame is fully on the panel.
    fn refresh(&mut self, scene: &Scene) -> Result<(), PortalError>;

    /// Whether labels can be re-texted in place. When `false` the updater
    /// rebuilds them with a reorder-preserving replace.
    fn supports_in_place_text(&self) -> bool {
        false
    }
}

/// Host surface: composites into an RGB framebuffer, optionally mirroring
/// each finished frame to a PNG file.
pub struct RasterSurface {
    frame: RgbImage,
    mirror: Option<PathBuf>,
    frames_drawn: u64,
    in_place_text: bool,
}

impl RasterSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            frame: RgbImage::new(width, height),
            mirror: None,
            frames_drawn: 0,
            in_place_text: true,
        }
    }

    /// Save every completed frame to `path`.
    pub fn with_mirror(mut self, path: impl Into<PathBuf>) -> Self {
        self.mirror = Some(path.into());
        self
    }

    /// Force the rebuild path for label updates, as on panels whose
    /// firmware cannot re-text a label.
    pub fn without_in_place_text(mut self) -> Self {
        self.in_place_text = false;
        self
    }

    pub fn frame(&self) -> &RgbImage {
        &self.frame
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    fn put(&mut self, x: i64, y: i64, color: Color) {
        if x >= 0 && y >= 0 && x < self.frame.width() as i64 && y < self.frame.height() as i64 {
            self.frame.put_pixel(x as u32, y as u32, color.to_rgb());
        }
    }

    fn draw_sprite(&mut self, sprite: &Sprite) {
        let Point { x: ox, y: oy } = sprite.position;
        for (x, y, pixel) in sprite.image.enumerate_pixels() {
            let [r, g, b] = pixel.0;
            self.put(ox as i64 + x as i64, oy as i64 + y as i64, Color::new(r, g, b));
        }
    }

    fn draw_label(&mut self, label: &Label) -> Result<(), PortalError> {
        let Point { x: ox, y: oy } = label.position;
        let color = label.color;
        let mut lit = Vec::new();
        label.font.render(&label.text, |x, y| lit.push((x, y)))?;
        for (x, y) in lit {
            self.put(ox as i64 + x as i64, oy as i64 + y as i64, color);
        }
        Ok(())
    }

    fn draw_qr(&mut self, qr: &QrSprite) {
        let Point { x: ox, y: oy } = qr.position;
        let size = qr.bitmap.size();
        for y in 0..size {
            for x in 0..size {
                let color = qr.bitmap.color_at(x, y);
                self.put(ox as i64 + x as i64, oy as i64 + y as i64, color);
            }
        }
    }
}

impl Surface for RasterSurface {
    fn size(&self) -> (u32, u32) {
        self.frame.dimensions()
    }

    fn refresh(&mut self, scene: &Scene) -> Result<(), PortalError> {
        for pixel in self.frame.pixels_mut() {
            *pixel = Color::BLACK.to_rgb();
        }

        for entry in scene.entries() {
            match &entry.node {
                Node::Background(Some(sprite)) => self.draw_sprite(sprite),
                Node::Label(label) => self.draw_label(label)?,
                Node::Overlay(Some(qr)) => self.draw_qr(qr),
                Node::Background(None) | Node::Overlay(None) => {}
            }
        }

        self.frames_drawn += 1;
        if let Some(path) = &self.mirror {
            self.frame.save(path).map_err(|e| {
                PortalError::Display(format!("Failed to save {}: {}", path.display(), e))
            })?;
        }
        debug!("Frame {} drawn ({} elements)", self.frames_drawn, scene.len());
        Ok(())
    }

    fn supports_in_place_text(&self) -> bool {
        self.in_place_text
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::qr;
    use crate::scene::TextFont;

    #[test]
    fn test_composites_in_scene_order() {
        let mut scene = Scene::new();
        scene.set_background(Some(Sprite {
            image: RgbImage::from_pixel(8, 8, image::Rgb([0, 0, 255])),
            position: Point::ORIGIN,
        }));
        scene.push_label(Label {
            text: "X".to_string(),
            font: TextFont::Small,
            color: Color::new(255, 0, 0),
            position: Point::new(20, 0),
        });

        let mut surface = RasterSurface::new(32, 32);
        surface.refresh(&scene).unwrap();

        assert_eq!(surface.frame().get_pixel(3, 3).0, [0, 0, 255]);
        assert_eq!(surface.frame().get_pixel(30, 30).0, [0, 0, 0]);
        assert!(surface.frame().pixels().any(|p| p.0 == [255, 0, 0]));
        assert_eq!(surface.frames_drawn(), 1);
    }

    #[test]
    fn test_qr_overlay_and_clipping() {
        let mut scene = Scene::new();
        let bitmap = qr::render("clip", 64).unwrap();
        scene.set_overlay(Some(QrSprite {
            bitmap,
            position: Point::new(-8, -8),
        }));

        let mut surface = RasterSurface::new(32, 32);
        surface.refresh(&scene).unwrap();
        // Quiet zone of the code lands at the visible origin.
        assert_eq!(surface.frame().get_pixel(0, 0).0, [255, 255, 255]);
    }

    #[test]
    fn test_in_place_text_capability() {
        assert!(RasterSurface::new(8, 8).supports_in_place_text());
        assert!(!RasterSurface::new(8, 8).without_in_place_text().supports_in_place_text());
    }

    #[test]
    fn test_mirror_writes_png() {
        let path = std::env::temp_dir().join(format!("portalframe-mirror-{}.png", std::process::id()));
        let mut surface = RasterSurface::new(16, 16).with_mirror(&path);
        surface.refresh(&Scene::new()).unwrap();
        let saved = image::open(&path).unwrap();
        assert_eq!((saved.width(), saved.height()), (16, 16));
    }
}
