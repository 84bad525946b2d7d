use crate::error::ConfigError;

use glam::DVec2;
use serde::{Deserialize, Serialize};

pub const MIN_ZOOM: f64 = 0.1;
pub const MAX_ZOOM: f64 = 10.0;
/// Zoom change per unit of wheel delta.
pub const WHEEL_ZOOM_STEP: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomLimits {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl Default for ZoomLimits {
    fn default() -> Self {
        Self {
            min: MIN_ZOOM,
            max: MAX_ZOOM,
            step: WHEEL_ZOOM_STEP,
        }
    }
}

impl ZoomLimits {
    /// Check that the range is positive, finite and ordered and that the
    /// wheel step is positive.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let Self { min, max, step } = *self;
        if !(min > 0.0 && min <= max && max.is_finite()) {
            return Err(ConfigError::InvalidZoomRange { min, max });
        }
        if !(step > 0.0 && step.is_finite()) {
            return Err(ConfigError::InvalidZoomStep(step));
        }
        Ok(())
    }

    /// Clamp into `[min, max]`. Unlike `f64::clamp` this never panics on
    /// limits that failed [`ZoomLimits::validate`].
    pub fn clamp(&self, zoom: f64) -> f64 {
        zoom.max(self.min).min(self.max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineSegment {
    pub start: DVec2,
    pub end: DVec2,
}

impl LineSegment {
    pub fn new(start: DVec2, end: DVec2) -> Self {
        Self { start, end }
    }

    pub fn length(&self) -> f64 {
        self.start.distance(self.end)
    }

    pub fn midpoint(&self) -> DVec2 {
        (self.start + self.end) / 2.0
    }
}

/// Crosshair through the centre of the displayed slice.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridLines {
    pub horizontal: LineSegment,
    pub vertical: LineSegment,
}

/// Where the scaled slice lands on screen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    /// Top-left corner of the slice in screen pixels.
    pub origin: DVec2,
    /// Displayed size in screen pixels.
    pub size: DVec2,
    pub zoom: f64,
    pub pan: DVec2,
}

/// Zoom and pan of a slice view.
///
/// The slice centre sits at the viewport centre shifted by `pan`, and the
/// slice is scaled by `zoom` about its own centre.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportTransform {
    zoom: f64,
    pan: DVec2,
    limits: ZoomLimits,
}

impl Default for ViewportTransform {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            pan: DVec2::ZERO,
            limits: ZoomLimits::default(),
        }
    }
}

impl ViewportTransform {
    pub fn new(zoom: f64, pan: DVec2) -> Self {
        let mut transform = Self {
            pan,
            ..Self::default()
        };
        transform.set_zoom(zoom);
        transform
    }

    pub fn with_limits(mut self, limits: ZoomLimits) -> Self {
        self.limits = limits;
        self.zoom = limits.clamp(self.zoom);
        self
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn pan(&self) -> DVec2 {
        self.pan
    }

    /// Set the zoom, clamped to the limits. NaN is ignored.
    pub fn set_zoom(&mut self, zoom: f64) {
        if !zoom.is_nan() {
            self.zoom = self.limits.clamp(zoom);
        }
    }

    pub fn set_pan(&mut self, pan: DVec2) {
        self.pan = pan;
    }

    pub fn pan_by(&mut self, delta: DVec2) {
        self.pan += delta;
    }

    /// Change the zoom by `delta` about the viewport centre, keeping pan.
    /// Returns the zoom change actually applied.
    pub fn zoom_by(&mut self, delta: f64) -> f64 {
        let old = self.zoom;
        self.set_zoom(self.zoom + delta);
        self.zoom - old
    }

    /// Apply a wheel event, keeping the slice point under `mouse` in place.
    ///
    /// Returns the zoom change actually applied.
    pub fn zoom_at(&mut self, wheel_delta: f64, mouse: DVec2, viewport_size: DVec2) -> f64 {
        if wheel_delta.is_nan() {
            return 0.0;
        }
        let new_zoom = self.limits.clamp(self.zoom + wheel_delta * self.limits.step);
        let center = viewport_size / 2.0;
        let relative = (mouse - center - self.pan) / self.zoom;
        self.pan = mouse - center - relative * new_zoom;

        let applied = new_zoom - self.zoom;
        self.zoom = new_zoom;
        applied
    }

    /// Slice pixel coordinates to screen coordinates.
    pub fn to_screen(&self, point: DVec2, image_size: DVec2, viewport_size: DVec2) -> DVec2 {
        viewport_size / 2.0 + self.pan + (point - image_size / 2.0) * self.zoom
    }

    /// Screen coordinates to slice pixel coordinates.
    pub fn to_volume(&self, screen: DVec2, image_size: DVec2, viewport_size: DVec2) -> DVec2 {
        (screen - viewport_size / 2.0 - self.pan) / self.zoom + image_size / 2.0
    }

    pub fn placement(&self, image_size: DVec2, viewport_size: DVec2) -> Placement {
        Placement {
            origin: self.to_screen(DVec2::ZERO, image_size, viewport_size),
            size: image_size * self.zoom,
            zoom: self.zoom,
            pan: self.pan,
        }
    }

    pub fn grid_lines(&self, image_size: DVec2, viewport_size: DVec2) -> GridLines {
        let half = image_size * self.zoom / 2.0;
        let center = viewport_size / 2.0 + self.pan;
        GridLines {
            horizontal: LineSegment::new(
                DVec2::new(center.x - half.x, center.y),
                DVec2::new(center.x + half.x, center.y),
            ),
            vertical: LineSegment::new(
                DVec2::new(center.x, center.y - half.y),
                DVec2::new(center.x, center.y + half.y),
            ),
        }
    }
}
