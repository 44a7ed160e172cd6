//! # Status Light
//!
//! The board reports fetch progress through a single RGB indicator. Colors
//! follow a fixed protocol so a glance at the device tells what it is doing:
//!
//! | State | Color |
//! |-------|-------|
//! | not connected | red `(100, 0, 0)` |
//! | connecting / got data | blue `(0, 0, 100)` |
//! | fetching | yellow `(100, 100, 0)` |
//! | streaming a chunk | cyan `(0, 100, 100)` |
//! | idle / done | off `(0, 0, 0)` |

use log::trace;

use crate::color::Color;

pub const DISCONNECTED: Color = Color::new(100, 0, 0);
pub const CONNECTING: Color = Color::new(0, 0, 100);
pub const FETCHING: Color = Color::new(100, 100, 0);
pub const STREAMING: Color = Color::new(0, 100, 100);
pub const IDLE: Color = Color::new(0, 0, 0);

/// A physical status indicator (e.g. a single neopixel).
pub trait StatusIndicator {
    fn fill(&mut self, color: Color);
}

/// Host stand-in that writes status changes to the log.
#[derive(Debug, Default)]
pub struct LogIndicator {
    last: Option<Color>,
}

impl StatusIndicator for LogIndicator {
    fn fill(&mut self, color: Color) {
        if self.last != Some(color) {
            trace!("status light -> ({}, {}, {})", color.r, color.g, color.b);
            self.last = Some(color);
        }
    }
}

/// Optional status indicator. Boards without one simply skip the update.
pub struct StatusLight {
    indicator: Option<Box<dyn StatusIndicator>>,
}

impl StatusLight {
    pub fn new(indicator: Option<Box<dyn StatusIndicator>>) -> Self {
        Self { indicator }
    }

    /// A light with no indicator attached.
    pub fn none() -> Self {
        Self { indicator: None }
    }

    pub fn is_present(&self) -> bool {
        self.indicator.is_some()
    }

    pub fn set(&mut self, color: Color) {
        if let Some(indicator) = self.indicator.as_mut() {
            indicator.fill(color);
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    /// Records every color written to it.
    #[derive(Clone, Default)]
    pub struct RecordingIndicator {
        pub colors: Rc<RefCell<Vec<Color>>>,
    }

    impl StatusIndicator for RecordingIndicator {
        fn fill(&mut self, color: Color) {
            self.colors.borrow_mut().push(color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingIndicator;
    use super::*;

    #[test]
    fn test_absent_indicator_is_noop() {
        let mut light = StatusLight::none();
        assert!(!light.is_present());
        light.set(FETCHING);
    }

    #[test]
    fn test_forwards_colors() {
        let recorder = RecordingIndicator::default();
        let mut light = StatusLight::new(Some(Box::new(recorder.clone())));
        light.set(FETCHING);
        light.set(IDLE);
        assert_eq!(*recorder.colors.borrow(), vec![FETCHING, IDLE]);
    }
}
