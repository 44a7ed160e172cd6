//! # Image Pipeline
//!
//! Turns a remote image reference found in the data document into the
//! on-screen background. The reference is appended to a conversion-service
//! base URL, which answers with a bitmap already sized for the panel. The
//! bitmap is streamed into a single cache file and then swapped in.
//!
//! The cache file is only overwritten after the previous swap has fully
//! redrawn, and a failed download never touches the visible background.

use std::path::{Path, PathBuf};

use log::info;

use crate::error::PortalError;
use crate::extract::Value;
use crate::network::StreamingFetcher;
use crate::scene::SceneUpdater;
use crate::status::StatusLight;

/// Third-party resize and format-conversion proxy.
pub const IMAGE_CONVERTER_SERVICE: &str =
    "https://res.cloudinary.com/schmarty/image/fetch/w_320,h_240,c_fill,f_bmp/";

#[derive(Debug, Clone)]
pub struct ImagePipeline {
    converter_base: String,
    cache_file: PathBuf,
}

impl ImagePipeline {
    pub fn new(converter_base: impl Into<String>, cache_file: impl Into<PathBuf>) -> Self {
        Self {
            converter_base: converter_base.into(),
            cache_file: cache_file.into(),
        }
    }

    pub fn cache_file(&self) -> &Path {
        &self.cache_file
    }

    /// `converter_base + image_path`, verbatim.
    pub fn conversion_url(&self, image_path: &str) -> String {
        format!("{}{}", self.converter_base, image_path)
    }

    /// Fetch `image_path` through the converter and make it the background.
    ///
    /// ## Errors
    ///
    /// - [`PortalError::ImageFetch`] if the download fails. The partial cache
    ///   file is gone and the old background stays on screen.
    /// - [`PortalError::Display`] if the downloaded file cannot be decoded.
    pub fn update_background_from_url(
        &self,
        image_path: &Value,
        fetcher: &mut StreamingFetcher,
        scene: &mut SceneUpdater,
        status: &mut StatusLight,
    ) -> Result<(), PortalError> {
        let url = self.conversion_url(&image_path.as_str());
        info!("Fetching background via {}", url);

        let written = fetcher
            .get_streamed(&url, &self.cache_file, status)
            .map_err(|e| PortalError::ImageFetch(e.to_string()))?;
        info!("Cached {} byte background", written);

        scene.set_background(Some(&self.cache_file))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::network::fetcher::testing::{Canned, FakeTransport};
    use crate::scene::TextFont;
    use crate::scene::surface::testing::RecordingSurface;
    use pretty_assertions::assert_eq;

    fn bmp_bytes(color: [u8; 3]) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(8, 6, image::Rgb(color)))
            .write_to(&mut out, image::ImageFormat::Bmp)
            .unwrap();
        out.into_inner()
    }

    fn setup(name: &str) -> (ImagePipeline, FakeTransport, StreamingFetcher, SceneUpdater) {
        let dir = std::env::temp_dir().join(format!(
            "portalframe-pipeline-{}-{}",
            name,
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        let pipeline = ImagePipeline::new("http://convert/", dir.join("cache.bmp"));
        let transport = FakeTransport::default();
        let fetcher = StreamingFetcher::new(Box::new(transport.clone()), None);
        let scene = SceneUpdater::new(
            Box::new(RecordingSurface::default()),
            TextFont::Medium,
            vec![],
        );
        (pipeline, transport, fetcher, scene)
    }

    #[test]
    fn test_conversion_url_concatenates() {
        let pipeline = ImagePipeline::new(IMAGE_CONVERTER_SERVICE, "cache.bmp");
        assert_eq!(
            pipeline.conversion_url("https://example.com/a.jpg"),
            "https://res.cloudinary.com/schmarty/image/fetch/w_320,h_240,c_fill,f_bmp/https://example.com/a.jpg"
        );
    }

    #[test]
    fn test_background_swapped_after_download() {
        let (pipeline, transport, mut fetcher, mut scene) = setup("swap");
        transport.route("http://convert/cat.jpg", Canned::new(bmp_bytes([1, 2, 3])));

        pipeline
            .update_background_from_url(
                &Value::Text("cat.jpg".into()),
                &mut fetcher,
                &mut scene,
                &mut StatusLight::none(),
            )
            .unwrap();

        let bg = scene.scene().background().unwrap();
        assert_eq!(bg.image.dimensions(), (8, 6));
        assert_eq!(bg.image.get_pixel(0, 0), &image::Rgb([1, 2, 3]));
        assert_eq!(*transport.requests.borrow(), vec!["http://convert/cat.jpg"]);
    }

    #[test]
    fn test_failed_download_keeps_old_background() {
        let (pipeline, transport, mut fetcher, mut scene) = setup("keep");
        transport.route("http://convert/ok.jpg", Canned::new(bmp_bytes([5, 5, 5])));
        let mut light = StatusLight::none();
        pipeline
            .update_background_from_url(&Value::Text("ok.jpg".into()), &mut fetcher, &mut scene, &mut light)
            .unwrap();

        let mut truncated = Canned::new(vec![0u8; 10]);
        truncated.content_length = Some(5000);
        transport.route("http://convert/broken.jpg", truncated);
        let err = pipeline
            .update_background_from_url(
                &Value::Text("broken.jpg".into()),
                &mut fetcher,
                &mut scene,
                &mut light,
            )
            .unwrap_err();

        assert!(matches!(err, PortalError::ImageFetch(_)));
        assert!(!pipeline.cache_file().exists());
        let bg = scene.scene().background().unwrap();
        assert_eq!(bg.image.get_pixel(0, 0), &image::Rgb([5, 5, 5]));
    }
}
