//! # Portal
//!
//! The fetch/render orchestrator. A [`Portal`] owns every board handle and
//! runs one fetch as a fixed sequence of stages:
//!
//! ```text
//! Idle -> CheckLocalOverride -> [EnsureConnected -> Request] -> ParseBody
//!      -> ExtractValues -> [ImageUpdate] -> Callback -> RenderText -> Done
//! ```
//!
//! Any stage error aborts the whole fetch. Nothing is drawn until every
//! value has been extracted, so a failed fetch leaves the previous frame on
//! screen. An [`PortalError::OutOfMemory`] from `ParseBody` is the one
//! failure the caller cannot recover from locally; see
//! [`PortalError::requires_restart`].

use std::fmt;
use std::path::Path;
use std::thread;
use std::time::Duration;

use log::{debug, error, info, warn};

use crate::board::{Backlight, Board, Speaker, Touchscreen};
use crate::color::Color;
use crate::config::{Endpoint, PortalConfig};
use crate::error::PortalError;
use crate::extract::{self, Value};
use crate::format::{format_value, wrap_nicely};
use crate::image_pipeline::ImagePipeline;
use crate::network::connectivity::INIT_RETRY_DELAY;
use crate::network::{ConnectivityManager, Credentials, StreamingFetcher};
use crate::scene::{Point, SceneUpdater, TextFont};
use crate::status::{self, StatusLight};

/// Shown in the first text slot until the first fetch completes.
pub const PLACEHOLDER_TEXT: &str = "PortalFrame";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStage {
    Idle,
    CheckLocalOverride,
    EnsureConnected,
    Request,
    ParseBody,
    ExtractValues,
    ImageUpdate,
    Callback,
    RenderText,
    Done,
}

/// What a successful fetch produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchResult {
    /// One value per configured data path, in order.
    Values(Vec<Value>),
    /// The whole body, when no data paths are configured.
    Text(String),
}

/// Runs after extraction and before rendering. May rewrite the result;
/// returning an error aborts the fetch with nothing drawn.
pub type SuccessCallback = Box<dyn FnMut(&mut FetchResult) -> Result<(), PortalError>>;

pub struct Portal {
    connectivity: ConnectivityManager,
    fetcher: StreamingFetcher,
    scene: SceneUpdater,
    status: StatusLight,
    backlight: Option<Box<dyn Backlight>>,
    speaker: Option<Box<dyn Speaker>>,
    touchscreen: Option<Box<dyn Touchscreen>>,
    credentials: Credentials,
    endpoint: Endpoint,
    images: ImagePipeline,
    caption_font: TextFont,
    max_document_bytes: usize,
    on_success: Option<SuccessCallback>,
    stage: FetchStage,
}

impl fmt::Debug for Portal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Portal")
            .field("endpoint", &self.endpoint)
            .field("stage", &self.stage)
            .finish_non_exhaustive()
    }
}

impl Portal {
    /// Bring the board up and draw the initial frame.
    ///
    /// ## Errors
    ///
    /// [`PortalError::Connectivity`] if the network co-processor never
    /// answers. This is fatal; the board is not usable.
    pub fn new(
        board: Board,
        config: &PortalConfig,
        credentials: Credentials,
    ) -> Result<Self, PortalError> {
        Self::bring_up(board, config, credentials, INIT_RETRY_DELAY)
    }

    /// [`Portal::new`] with a custom pause between co-processor probes.
    pub fn bring_up(
        board: Board,
        config: &PortalConfig,
        credentials: Credentials,
        retry_delay: Duration,
    ) -> Result<Self, PortalError> {
        let Board {
            interface,
            transport,
            surface,
            status,
            backlight,
            speaker,
            touchscreen,
        } = board;

        let mut backlight = backlight;
        set_backlight(backlight.as_deref_mut(), 0.0);
        let mut status = match status {
            Some(indicator) if config.status_indicator => StatusLight::new(Some(indicator)),
            _ => StatusLight::none(),
        };
        status.set(status::IDLE);

        let mut scene = SceneUpdater::new(surface, config.text_font(), config.text_slots());
        let fetcher = StreamingFetcher::new(transport, Some(config.local_override_path()));

        if let Some(background) = config.default_background_path() {
            scene.set_background(Some(&background))?;
        }
        let caption_font = config.caption_font.unwrap_or_default();
        if let Some(caption) = &config.caption_text {
            scene.set_caption(
                caption,
                config.caption_position.unwrap_or(Point::ORIGIN),
                config.caption_color,
                caption_font,
            )?;
        }
        if config.text_font.is_some() && scene.slot_count() > 0 {
            scene.set_text(0, PLACEHOLDER_TEXT)?;
        }

        // The co-processor is probed once the splash frame is up.
        let connectivity = ConnectivityManager::initialize(interface, retry_delay)?;
        set_backlight(backlight.as_deref_mut(), 1.0);

        info!("Portal ready, fetching from {}", config.url);
        Ok(Self {
            connectivity,
            fetcher,
            scene,
            status,
            backlight,
            speaker,
            touchscreen,
            credentials,
            endpoint: config.endpoint(),
            images: ImagePipeline::new(config.image_converter.clone(), config.cache_path()),
            caption_font,
            max_document_bytes: config.max_document_bytes,
            on_success: None,
            stage: FetchStage::Idle,
        })
    }

    /// Install the success callback, replacing any previous one.
    pub fn on_success(
        &mut self,
        callback: impl FnMut(&mut FetchResult) -> Result<(), PortalError> + 'static,
    ) {
        self.on_success = Some(Box::new(callback));
    }

    pub fn stage(&self) -> FetchStage {
        self.stage
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn firmware(&self) -> &str {
        self.connectivity.firmware()
    }

    pub fn scene(&self) -> &SceneUpdater {
        &self.scene
    }

    /// Fetch, extract and render once.
    ///
    /// The status light ends off whether or not the fetch succeeded.
    pub fn fetch(&mut self) -> Result<FetchResult, PortalError> {
        self.status.set(status::CONNECTING);
        let result = self.run_fetch();
        self.status.set(status::IDLE);
        match &result {
            Ok(_) => self.enter(FetchStage::Done),
            Err(e) => {
                warn!("Fetch aborted in {:?}: {}", self.stage, e);
                self.enter(FetchStage::Idle);
            }
        }
        result
    }

    fn run_fetch(&mut self) -> Result<FetchResult, PortalError> {
        self.enter(FetchStage::CheckLocalOverride);
        let overridden = self.fetcher.local_override()?;
        let from_override = overridden.is_some();
        let response = match overridden {
            Some(response) => response,
            None => {
                self.connect()?;

                self.enter(FetchStage::Request);
                self.status.set(status::FETCHING);
                self.fetcher.get(self.endpoint.url())?
            }
        };
        self.status.set(status::CONNECTING);

        self.enter(FetchStage::ParseBody);
        let body = response.text(self.max_document_bytes)?;

        let mut result = if self.endpoint.needs_document() {
            let document = extract::parse_document(&body, self.endpoint.format())
                .inspect_err(|e| error!("{}\n{}", e, body))?;

            self.enter(FetchStage::ExtractValues);
            let values = extract::extract_all(&document, self.endpoint.data_paths())
                .inspect_err(|e| error!("{}\n{}", e, body))?;
            let image = match self.endpoint.image_path() {
                Some(path) => Some(
                    extract::extract(&document, path).inspect_err(|e| error!("{}\n{}", e, body))?,
                ),
                None => None,
            };
            drop(document);
            drop(body);

            if let Some(image) = image {
                // The override only replaces the data request; the image
                // still comes over the network.
                if from_override {
                    self.connect()?;
                }
                self.enter(FetchStage::ImageUpdate);
                self.images.update_background_from_url(
                    &image,
                    &mut self.fetcher,
                    &mut self.scene,
                    &mut self.status,
                )?;
            }
            FetchResult::Values(values)
        } else {
            FetchResult::Text(body)
        };

        self.enter(FetchStage::Callback);
        if let Some(callback) = self.on_success.as_mut() {
            callback(&mut result)?;
        }

        self.enter(FetchStage::RenderText);
        self.render(&result)?;
        Ok(result)
    }

    fn connect(&mut self) -> Result<(), PortalError> {
        self.enter(FetchStage::EnsureConnected);
        self.connectivity
            .ensure_connected(&self.credentials, &mut self.status)
    }

    fn render(&mut self, result: &FetchResult) -> Result<(), PortalError> {
        match result {
            FetchResult::Values(values) => {
                let slots = self.scene.slot_count();
                for (index, value) in values.iter().enumerate().take(slots) {
                    self.render_slot(index, &format_value(value))?;
                }
            }
            FetchResult::Text(text) => {
                if self.scene.slot_count() > 0 {
                    self.render_slot(0, text)?;
                }
            }
        }
        Ok(())
    }

    fn render_slot(&mut self, index: usize, text: &str) -> Result<(), PortalError> {
        let wrap = self.scene.slots().get(index).and_then(|slot| slot.wrap);
        let wrapped;
        let text = match wrap {
            Some(width) => {
                wrapped = wrap_nicely(text, width).join("\n");
                wrapped.as_str()
            }
            None => text,
        };
        debug!("Drawing {:?} in slot {}", text, index);
        self.scene.set_text(index, text)
    }

    fn enter(&mut self, stage: FetchStage) {
        debug!("fetch stage {:?} -> {:?}", self.stage, stage);
        self.stage = stage;
    }

    pub fn set_background(&mut self, path: Option<&Path>) -> Result<(), PortalError> {
        self.scene.set_background(path)
    }

    pub fn set_text(&mut self, index: usize, text: &str) -> Result<(), PortalError> {
        self.scene.set_text(index, text)
    }

    pub fn set_caption(&mut self, text: &str, position: Point, color: Color) -> Result<(), PortalError> {
        self.scene.set_caption(text, position, color, self.caption_font)
    }

    /// Draw a QR code on top of the scene. See [`crate::qr::render`] for
    /// valid sizes.
    pub fn show_qr(
        &mut self,
        data: &str,
        size: usize,
        position: Point,
        color: Color,
    ) -> Result<(), PortalError> {
        self.scene.show_qr(data, size, position, color)
    }

    /// Set the backlight, `0.0` off to `1.0` full. Boards without a
    /// backlight ignore this.
    pub fn set_backlight(&mut self, level: f32) {
        set_backlight(self.backlight.as_deref_mut(), level);
    }

    /// Play an audio file and wait for it to finish.
    ///
    /// ## Errors
    ///
    /// [`PortalError::Capability`] on boards without a speaker.
    pub fn play_file(&mut self, path: &Path) -> Result<(), PortalError> {
        let speaker = self
            .speaker
            .as_mut()
            .ok_or_else(|| PortalError::Capability("this board has no speaker".into()))?;
        info!("Playing {}", path.display());
        speaker.play(path)?;
        while speaker.is_playing() {
            thread::yield_now();
        }
        Ok(())
    }

    pub fn touch_point(&mut self) -> Option<Point> {
        self.touchscreen.as_mut().and_then(|t| t.touch_point())
    }
}

fn set_backlight(backlight: Option<&mut (dyn Backlight + 'static)>, level: f32) {
    let Some(backlight) = backlight else {
        return;
    };
    let level = if level.is_nan() { 0.0 } else { level.clamp(0.0, 1.0) };
    backlight.set_duty((level * u16::MAX as f32).round() as u16);
}
