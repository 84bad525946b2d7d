//! Two-click distance measurement on the displayed slice.

use crate::viewport::LineSegment;

use glam::DVec2;

/// Offset of the distance label from the segment midpoint.
const LABEL_OFFSET: DVec2 = DVec2::new(5.0, -15.0);

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum MeasurementState {
    #[default]
    Idle,
    Anchored {
        start: DVec2,
    },
    Complete {
        start: DVec2,
        end: DVec2,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub segment: LineSegment,
    pub distance_mm: f64,
    pub label: String,
    pub label_position: DVec2,
}

/// Screen distance converted to millimetres.
pub fn physical_distance(start: DVec2, end: DVec2, pixel_spacing: f64, zoom: f64) -> f64 {
    start.distance(end) * pixel_spacing / zoom
}

#[derive(Debug, Clone, Default)]
pub struct MeasurementTool {
    state: MeasurementState,
    preview: Option<LineSegment>,
}

impl MeasurementTool {
    pub fn state(&self) -> MeasurementState {
        self.state
    }

    pub fn preview(&self) -> Option<LineSegment> {
        self.preview
    }

    pub fn reset(&mut self) {
        self.state = MeasurementState::Idle;
        self.preview = None;
    }

    /// Handle a click. The first click anchors the segment; every later click
    /// moves its end point and yields a measurement.
    pub fn press(&mut self, point: DVec2, pixel_spacing: f64, zoom: f64) -> Option<Measurement> {
        match self.state {
            MeasurementState::Idle => {
                self.state = MeasurementState::Anchored { start: point };
                self.preview = None;
                None
            }
            MeasurementState::Anchored { start } | MeasurementState::Complete { start, .. } => {
                self.state = MeasurementState::Complete { start, end: point };
                self.preview = None;
                Some(Self::measure(start, point, pixel_spacing, zoom))
            }
        }
    }

    /// Rubber-band preview while only the start point is set.
    pub fn hover(&mut self, point: DVec2) -> Option<LineSegment> {
        if let MeasurementState::Anchored { start } = self.state {
            self.preview = Some(LineSegment::new(start, point));
        }
        self.preview
    }

    fn measure(start: DVec2, end: DVec2, pixel_spacing: f64, zoom: f64) -> Measurement {
        let segment = LineSegment::new(start, end);
        let distance_mm = physical_distance(start, end, pixel_spacing, zoom);
        Measurement {
            segment,
            distance_mm,
            label: format!("{distance_mm:.2} mm"),
            label_position: segment.midpoint() + LABEL_OFFSET,
        }
    }
}
