//! Camera lens settings sent as individual OSC floats

use crate::transport::{APERTURE_ADDRESS, EXPOSURE_ADDRESS, FOCAL_DISTANCE_ADDRESS, ZOOM_ADDRESS};
use std::fmt;

/// Zoom change per tick while a zoom button is held
pub const ZOOM_STEP: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LensSetting {
    Zoom,
    Aperture,
    FocalDistance,
    Exposure,
}

impl LensSetting {
    pub const ALL: [LensSetting; 4] = [
        LensSetting::Zoom,
        LensSetting::Aperture,
        LensSetting::FocalDistance,
        LensSetting::Exposure,
    ];

    /// Inclusive `(min, max)`
    pub fn range(self) -> (f32, f32) {
        match self {
            LensSetting::Zoom => (20.0, 150.0),
            LensSetting::Aperture => (1.4, 32.0),
            LensSetting::FocalDistance => (0.1, 10.0),
            LensSetting::Exposure => (-10.0, 4.0),
        }
    }

    pub fn default_value(self) -> f32 {
        match self {
            LensSetting::Zoom => 45.0,
            LensSetting::Aperture => 16.0,
            LensSetting::FocalDistance => 1.5,
            LensSetting::Exposure => 0.0,
        }
    }

    pub fn address(self) -> &'static str {
        match self {
            LensSetting::Zoom => ZOOM_ADDRESS,
            LensSetting::Aperture => APERTURE_ADDRESS,
            LensSetting::FocalDistance => FOCAL_DISTANCE_ADDRESS,
            LensSetting::Exposure => EXPOSURE_ADDRESS,
        }
    }

    pub fn clamp(self, value: f32) -> f32 {
        let (min, max) = self.range();
        value.clamp(min, max)
    }
}

impl fmt::Display for LensSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LensSetting::Zoom => "zoom",
            LensSetting::Aperture => "aperture",
            LensSetting::FocalDistance => "focal distance",
            LensSetting::Exposure => "exposure",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LensSettings {
    pub zoom: f32,
    pub aperture: f32,
    pub focal_distance: f32,
    pub exposure: f32,
    pub look_at_me: bool,
}

impl Default for LensSettings {
    fn default() -> Self {
        Self {
            zoom: LensSetting::Zoom.default_value(),
            aperture: LensSetting::Aperture.default_value(),
            focal_distance: LensSetting::FocalDistance.default_value(),
            exposure: LensSetting::Exposure.default_value(),
            look_at_me: false,
        }
    }
}

impl LensSettings {
    pub fn get(&self, setting: LensSetting) -> f32 {
        match setting {
            LensSetting::Zoom => self.zoom,
            LensSetting::Aperture => self.aperture,
            LensSetting::FocalDistance => self.focal_distance,
            LensSetting::Exposure => self.exposure,
        }
    }

    /// Stores the clamped value and returns it
    pub fn set(&mut self, setting: LensSetting, value: f32) -> f32 {
        let value = setting.clamp(value);
        match setting {
            LensSetting::Zoom => self.zoom = value,
            LensSetting::Aperture => self.aperture = value,
            LensSetting::FocalDistance => self.focal_distance = value,
            LensSetting::Exposure => self.exposure = value,
        }
        value
    }

    pub fn step_zoom(&mut self, delta: f32) -> f32 {
        self.set(LensSetting::Zoom, self.zoom + delta)
    }

    /// Restores every lens value to its default; look-at-me is left alone
    pub fn reset_lens(&mut self) {
        let look_at_me = self.look_at_me;
        *self = Self {
            look_at_me,
            ..Self::default()
        };
    }
}
