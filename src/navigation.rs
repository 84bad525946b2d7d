//! Navigation events shared between synchronised views, and drag tracking.

use crate::enums::NavigationKind;

use glam::DVec2;

/// A pan, zoom or window/level change that sibling views can replay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavigationEvent {
    pub kind: NavigationKind,
    pub pan_delta: DVec2,
    pub zoom_delta: f64,
    pub window_width_delta: f64,
    pub window_center_delta: f64,
}

impl NavigationEvent {
    pub fn pan(delta: DVec2) -> Self {
        Self {
            kind: NavigationKind::Pan,
            pan_delta: delta,
            zoom_delta: 0.0,
            window_width_delta: 0.0,
            window_center_delta: 0.0,
        }
    }

    pub fn zoom(delta: f64) -> Self {
        Self {
            kind: NavigationKind::Zoom,
            pan_delta: DVec2::ZERO,
            zoom_delta: delta,
            window_width_delta: 0.0,
            window_center_delta: 0.0,
        }
    }

    pub fn window_level(width_delta: f64, center_delta: f64) -> Self {
        Self {
            kind: NavigationKind::WindowLevel,
            pan_delta: DVec2::ZERO,
            zoom_delta: 0.0,
            window_width_delta: width_delta,
            window_center_delta: center_delta,
        }
    }
}

/// Turns absolute pointer positions into drag deltas between a press and a
/// release.
#[derive(Debug, Clone, Copy, Default)]
pub struct PointerTracker {
    last: Option<DVec2>,
}

impl PointerTracker {
    pub fn press(&mut self, position: DVec2) {
        self.last = Some(position);
    }

    /// Delta since the previous sample, or `None` when no drag is active.
    pub fn move_to(&mut self, position: DVec2) -> Option<DVec2> {
        let last = self.last.as_mut()?;
        let delta = position - *last;
        *last = position;
        Some(delta)
    }

    pub fn release(&mut self) {
        self.last = None;
    }

    pub fn is_dragging(&self) -> bool {
        self.last.is_some()
    }
}
