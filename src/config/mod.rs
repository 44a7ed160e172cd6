//! # Configuration
//!
//! A portal is described by one JSON file. Keys are camelCase:
//!
//! ```json
//! {
//!   "url": "https://api.example.com/stats",
//!   "jsonPath": [["stats", "followers"], ["stats", "name"]],
//!   "imageJsonPath": ["avatar"],
//!   "textFont": "12x24",
//!   "textPosition": [[10, 200], [10, 40]],
//!   "textColor": ["#ffffff", 8421504],
//!   "textWrap": [0, 30],
//!   "captionText": "followers",
//!   "captionPosition": [10, 10],
//!   "defaultBackground": "background.bmp"
//! }
//! ```
//!
//! Options that take one value per text slot (`textColor`, `textWrap`,
//! `textMaxLen`) also accept a single value, which then applies to every
//! slot. The number of slots is the number of `textPosition` entries.
//!
//! WiFi credentials are not part of this file, see
//! [`Credentials`](crate::network::Credentials).

use std::fs;
use std::path::{Path as FsPath, PathBuf};

use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::error::PortalError;
use crate::extract::{DocumentFormat, Path};
use crate::image_pipeline::IMAGE_CONVERTER_SERVICE;
use crate::scene::{Point, TextFont, TextSlot};

/// A single value or a list of values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    /// Value for position `index`. A single value answers for every index.
    pub fn get(&self, index: usize) -> Option<&T> {
        match self {
            OneOrMany::One(value) => Some(value),
            OneOrMany::Many(values) => values.get(index),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            OneOrMany::One(_) => 1,
            OneOrMany::Many(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(value) => vec![value],
            OneOrMany::Many(values) => values,
        }
    }
}

/// Panel geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: 320,
            height: 240,
        }
    }
}

/// Where and what to fetch. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    url: String,
    data_paths: Vec<Path>,
    format: DocumentFormat,
    image_path: Option<Path>,
}

impl Endpoint {
    pub fn new(
        url: impl Into<String>,
        data_paths: Vec<Path>,
        format: DocumentFormat,
        image_path: Option<Path>,
    ) -> Self {
        Self {
            url: url.into(),
            data_paths,
            format,
            image_path,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn data_paths(&self) -> &[Path] {
        &self.data_paths
    }

    pub fn format(&self) -> DocumentFormat {
        self.format
    }

    pub fn image_path(&self) -> Option<&Path> {
        self.image_path.as_ref()
    }

    /// Whether the body has to be parsed at all.
    pub fn needs_document(&self) -> bool {
        !self.data_paths.is_empty() || self.image_path.is_some()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortalConfig {
    pub url: String,
    #[serde(default, alias = "jsonPaths")]
    pub json_path: Option<OneOrMany<Path>>,
    #[serde(default)]
    pub xml_path: Option<OneOrMany<Path>>,
    #[serde(default)]
    pub image_json_path: Option<Path>,
    /// Reserved: parsed but not applied to the fetched bitmap.
    #[serde(default)]
    pub image_resize: Option<(u32, u32)>,
    /// Reserved: parsed but not applied to the fetched bitmap.
    #[serde(default)]
    pub image_position: Option<Point>,
    #[serde(default = "default_image_converter")]
    pub image_converter: String,

    #[serde(default)]
    pub text_font: Option<TextFont>,
    #[serde(default, alias = "textPositions")]
    pub text_position: Option<OneOrMany<Option<Point>>>,
    #[serde(default = "default_text_color", alias = "textColors")]
    pub text_color: OneOrMany<Color>,
    #[serde(default)]
    pub text_wrap: Option<OneOrMany<usize>>,
    #[serde(default)]
    pub text_max_len: Option<OneOrMany<usize>>,

    #[serde(default)]
    pub caption_text: Option<String>,
    #[serde(default)]
    pub caption_font: Option<TextFont>,
    #[serde(default)]
    pub caption_position: Option<Point>,
    #[serde(default = "default_caption_color")]
    pub caption_color: Color,

    #[serde(default)]
    pub default_background: Option<PathBuf>,
    #[serde(default = "default_true")]
    pub status_indicator: bool,
    #[serde(default)]
    pub debug: bool,

    #[serde(default = "default_storage_root")]
    pub storage_root: PathBuf,
    #[serde(default = "default_local_override")]
    pub local_override: String,
    #[serde(default = "default_cache_file")]
    pub cache_file: String,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default = "default_max_document_bytes")]
    pub max_document_bytes: usize,
}

fn default_image_converter() -> String {
    IMAGE_CONVERTER_SERVICE.to_string()
}

fn default_text_color() -> OneOrMany<Color> {
    OneOrMany::One(Color::GRAY)
}

fn default_caption_color() -> Color {
    Color::GRAY
}

fn default_true() -> bool {
    true
}

fn default_storage_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_local_override() -> String {
    "local.txt".to_string()
}

fn default_cache_file() -> String {
    "cache.bmp".to_string()
}

fn default_max_document_bytes() -> usize {
    256 * 1024
}

impl PortalConfig {
    /// Read and validate a config file.
    pub fn load(path: impl AsRef<FsPath>) -> Result<Self, PortalError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .map_err(|e| PortalError::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, PortalError> {
        let config: Self = serde_json::from_str(raw)
            .map_err(|e| PortalError::Config(format!("Invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), PortalError> {
        if self.url.trim().is_empty() {
            return Err(PortalError::Config("url must not be empty".into()));
        }
        if self.json_path.is_some() && self.xml_path.is_some() {
            return Err(PortalError::Config(
                "jsonPath and xmlPath are mutually exclusive".into(),
            ));
        }
        if self.max_document_bytes == 0 {
            return Err(PortalError::Config("maxDocumentBytes must be positive".into()));
        }
        if self.display.width == 0 || self.display.height == 0 {
            return Err(PortalError::Config("display size must be positive".into()));
        }
        Ok(())
    }

    pub fn endpoint(&self) -> Endpoint {
        let (paths, format) = match (&self.json_path, &self.xml_path) {
            (_, Some(xml)) => (xml.clone().into_vec(), DocumentFormat::Xml),
            (Some(json), None) => (json.clone().into_vec(), DocumentFormat::Json),
            (None, None) => (Vec::new(), DocumentFormat::Json),
        };
        Endpoint::new(self.url.clone(), paths, format, self.image_json_path.clone())
    }

    /// One slot per configured text position.
    pub fn text_slots(&self) -> Vec<TextSlot> {
        let Some(positions) = &self.text_position else {
            return Vec::new();
        };
        (0..positions.len())
            .map(|i| {
                let position = positions.get(i).copied().flatten();
                let color = self.text_color.get(i).copied().unwrap_or(Color::GRAY);
                let wrap = self.text_wrap.as_ref().and_then(|w| w.get(i)).copied();
                let max_len = self.text_max_len.as_ref().and_then(|m| m.get(i)).copied();
                TextSlot::new(position, color)
                    .with_wrap(wrap)
                    .with_max_len(max_len)
            })
            .collect()
    }

    pub fn text_font(&self) -> TextFont {
        self.text_font.unwrap_or_default()
    }

    /// Resolve a storage-relative path.
    pub fn storage_path(&self, name: impl AsRef<FsPath>) -> PathBuf {
        self.storage_root.join(name)
    }

    pub fn local_override_path(&self) -> PathBuf {
        self.storage_path(&self.local_override)
    }

    pub fn cache_path(&self) -> PathBuf {
        self.storage_path(&self.cache_file)
    }

    pub fn default_background_path(&self) -> Option<PathBuf> {
        self.default_background.as_ref().map(|p| self.storage_path(p))
    }
}
