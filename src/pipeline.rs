use crate::config::ViewerSettings;
use crate::enums::{NavigationKind, PipelineStatus, Recompute};
use crate::error::{ConfigError, RenderError};
use crate::frame::{self, PixelBuffer, RenderedFrame};
use crate::measurement::{Measurement, MeasurementTool};
use crate::navigation::{NavigationEvent, PointerTracker};
use crate::slice_selector::select_slice;
use crate::viewport::{ViewportTransform, ZoomLimits};
use crate::volume::Volume;
use crate::window_level::{self, WindowLevel};

use futures::channel::oneshot;
use glam::DVec2;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use web_time::Instant;

/// Display parameters driven by user input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderState {
    /// Requested slice; out of range means "use the volume's default".
    pub slice_index: i64,
    pub window_width: f64,
    pub window_center: f64,
    pub zoom: f64,
    pub pan: DVec2,
    pub show_grid: bool,
}

impl Default for RenderState {
    fn default() -> Self {
        Self::from(&ViewerSettings::default())
    }
}

impl From<&ViewerSettings> for RenderState {
    fn from(settings: &ViewerSettings) -> Self {
        Self {
            slice_index: settings.slice_index,
            window_width: settings.window_width,
            window_center: settings.window_center,
            zoom: settings.zoom,
            pan: DVec2::ZERO,
            show_grid: settings.show_grid,
        }
    }
}

impl RenderState {
    pub fn window(&self) -> WindowLevel {
        WindowLevel::new(self.window_width, self.window_center)
    }
}

/// Render one frame from scratch.
///
/// Returns `Ok(None)` when there is nothing to draw: no volume, a zero
/// dimension, or a voxel buffer that does not match the dimensions.
/// Identical inputs give bit-identical pixels.
pub fn render(
    volume: Option<&Volume>,
    state: &RenderState,
    viewport_size: DVec2,
) -> Result<Option<RenderedFrame>, RenderError> {
    let Some(volume) = volume.filter(|volume| volume.is_renderable()) else {
        return Ok(None);
    };
    let slice_index = select_slice(volume, state.slice_index);
    let Some(slice) = volume.get_slice(slice_index) else {
        return Ok(None);
    };
    let window = state.window();
    let pixels = window_level::map_slice_view(&slice, window)?;
    let transform = ViewportTransform::new(state.zoom, state.pan);
    Ok(Some(compose_frame(
        pixels,
        slice_index,
        volume.depth,
        &window,
        &transform,
        state.show_grid,
        viewport_size,
    )))
}

fn compose_frame(
    pixels: PixelBuffer,
    slice_index: usize,
    depth: usize,
    window: &WindowLevel,
    transform: &ViewportTransform,
    show_grid: bool,
    viewport_size: DVec2,
) -> RenderedFrame {
    let image_size = DVec2::new(pixels.width() as f64, pixels.height() as f64);
    RenderedFrame {
        effective_slice_index: slice_index,
        info_text: frame::info_text(slice_index, depth, window, transform.zoom()),
        grid_lines: show_grid.then(|| transform.grid_lines(image_size, viewport_size)),
        placement: transform.placement(image_size, viewport_size),
        pixels,
    }
}

/// Identifies the pixels a slice mapping produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SliceKey {
    volume_epoch: u64,
    slice_index: usize,
    window: (u64, u64),
}

#[derive(Debug, Clone)]
struct DisplayedSlice {
    key: SliceKey,
    depth: usize,
    window: WindowLevel,
    pixels: PixelBuffer,
}

/// A slice being mapped on the rayon pool.
pub struct PendingSlice {
    generation: u64,
    key: SliceKey,
    depth: usize,
    window: WindowLevel,
    receiver: oneshot::Receiver<Result<PixelBuffer, RenderError>>,
}

impl fmt::Debug for PendingSlice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingSlice")
            .field("generation", &self.generation)
            .field("slice_index", &self.key.slice_index)
            .finish_non_exhaustive()
    }
}

impl PendingSlice {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn slice_index(&self) -> usize {
        self.key.slice_index
    }

    /// Wait for the worker. The result still has to be handed to
    /// [`RenderPipeline::complete`] on the owning thread.
    pub async fn wait(self) -> CompletedSlice {
        let result = self
            .receiver
            .await
            .unwrap_or_else(|_| Err(RenderError::WorkerLost));
        CompletedSlice {
            generation: self.generation,
            key: self.key,
            depth: self.depth,
            window: self.window,
            result,
        }
    }
}

#[derive(Debug)]
pub struct CompletedSlice {
    generation: u64,
    key: SliceKey,
    depth: usize,
    window: WindowLevel,
    result: Result<PixelBuffer, RenderError>,
}

impl CompletedSlice {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

#[derive(Debug)]
pub enum Scheduled {
    /// Nothing to draw; the display should be cleared.
    Absent,
    /// The displayed pixels already match the state.
    Current,
    /// A worker is already mapping exactly this slice.
    InFlight,
    Pending(PendingSlice),
}

#[derive(Debug)]
pub enum Completion {
    Applied,
    /// Superseded by a newer request or a state change; dropped.
    Stale,
    /// The mapping failed; the previous frame stays.
    Failed(RenderError),
}

/// Owns the render state of one slice view and decides what to recompute.
///
/// Slice, window and volume changes require a new grayscale mapping. Zoom,
/// pan, grid and viewport changes only rebuild the frame around the cached
/// pixels. Every method is meant to be called from the thread that owns the
/// view; only the mapping itself runs elsewhere.
pub struct RenderPipeline {
    volume: Option<Arc<Volume>>,
    volume_epoch: u64,
    state: RenderState,
    limits: ZoomLimits,
    viewport_size: DVec2,
    status: PipelineStatus,
    generation: u64,
    in_flight: Option<(u64, SliceKey)>,
    displayed: Option<DisplayedSlice>,
    pointer: PointerTracker,
    measurement_mode: bool,
    measurement: MeasurementTool,
}

impl Default for RenderPipeline {
    fn default() -> Self {
        Self::with_valid_settings(&ViewerSettings::default())
    }
}

impl RenderPipeline {
    /// Create a pipeline from viewer settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the zoom limits are empty, inverted, not finite
    /// or have a non-positive step.
    pub fn new(settings: &ViewerSettings) -> Result<Self, ConfigError> {
        settings.validate()?;
        Ok(Self::with_valid_settings(settings))
    }

    fn with_valid_settings(settings: &ViewerSettings) -> Self {
        let mut pipeline = Self {
            volume: None,
            volume_epoch: 0,
            state: RenderState::from(settings),
            limits: settings.zoom_limits,
            viewport_size: DVec2::ZERO,
            status: PipelineStatus::Dirty,
            generation: 0,
            in_flight: None,
            displayed: None,
            pointer: PointerTracker::default(),
            measurement_mode: false,
            measurement: MeasurementTool::default(),
        };
        let transform = pipeline.transform();
        pipeline.store_transform(&transform);
        pipeline
    }

    pub fn state(&self) -> &RenderState {
        &self.state
    }

    pub fn status(&self) -> PipelineStatus {
        self.status
    }

    /// Number of full recomputes started so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn volume(&self) -> Option<&Arc<Volume>> {
        self.volume.as_ref()
    }

    pub fn viewport_size(&self) -> DVec2 {
        self.viewport_size
    }

    pub fn transform(&self) -> ViewportTransform {
        let mut transform = ViewportTransform::default().with_limits(self.limits);
        transform.set_zoom(self.state.zoom);
        transform.set_pan(self.state.pan);
        transform
    }

    fn store_transform(&mut self, transform: &ViewportTransform) -> Recompute {
        if transform.zoom() == self.state.zoom && transform.pan() == self.state.pan {
            return Recompute::None;
        }
        self.state.zoom = transform.zoom();
        self.state.pan = transform.pan();
        Recompute::Placement
    }

    fn mark_dirty(&mut self) -> Recompute {
        self.status = PipelineStatus::Dirty;
        Recompute::Full
    }

    pub fn set_volume(&mut self, volume: Option<Arc<Volume>>) -> Recompute {
        let unchanged = match (&self.volume, &volume) {
            (Some(current), Some(new)) => Arc::ptr_eq(current, new),
            (None, None) => true,
            _ => false,
        };
        if unchanged {
            return Recompute::None;
        }
        self.volume = volume;
        self.volume_epoch += 1;
        self.measurement.reset();
        self.mark_dirty()
    }

    pub fn set_slice_index(&mut self, index: i64) -> Recompute {
        if self.state.slice_index == index {
            return Recompute::None;
        }
        self.state.slice_index = index;
        self.mark_dirty()
    }

    pub fn set_window(&mut self, window: WindowLevel) -> Recompute {
        if self.state.window().bits() == window.bits() {
            return Recompute::None;
        }
        self.state.window_width = window.width;
        self.state.window_center = window.center;
        self.mark_dirty()
    }

    pub fn set_window_width(&mut self, width: f64) -> Recompute {
        self.set_window(WindowLevel::new(width, self.state.window_center))
    }

    pub fn set_window_center(&mut self, center: f64) -> Recompute {
        self.set_window(WindowLevel::new(self.state.window_width, center))
    }

    /// Window/level drag.
    pub fn adjust_window(&mut self, width_delta: f64, center_delta: f64) -> NavigationEvent {
        self.set_window(self.state.window().adjusted(width_delta, center_delta));
        NavigationEvent::window_level(width_delta, center_delta)
    }

    pub fn set_zoom(&mut self, zoom: f64) -> Recompute {
        let mut transform = self.transform();
        transform.set_zoom(zoom);
        self.store_transform(&transform)
    }

    pub fn set_pan(&mut self, pan: DVec2) -> Recompute {
        let mut transform = self.transform();
        transform.set_pan(pan);
        self.store_transform(&transform)
    }

    pub fn pan_by(&mut self, delta: DVec2) -> NavigationEvent {
        let mut transform = self.transform();
        transform.pan_by(delta);
        self.store_transform(&transform);
        NavigationEvent::pan(delta)
    }

    /// Wheel zoom anchored at `mouse` (viewport coordinates).
    pub fn zoom_at(&mut self, wheel_delta: f64, mouse: DVec2) -> NavigationEvent {
        let mut transform = self.transform();
        let applied = transform.zoom_at(wheel_delta, mouse, self.viewport_size);
        self.store_transform(&transform);
        NavigationEvent::zoom(applied)
    }

    pub fn set_show_grid(&mut self, show_grid: bool) -> Recompute {
        if self.state.show_grid == show_grid {
            return Recompute::None;
        }
        self.state.show_grid = show_grid;
        Recompute::Placement
    }

    /// The presentation surface changed size.
    pub fn resize(&mut self, viewport_size: DVec2) -> Recompute {
        if self.viewport_size == viewport_size {
            return Recompute::None;
        }
        self.viewport_size = viewport_size;
        Recompute::Placement
    }

    /// Replay an event produced by a synchronised sibling view. Zoom is
    /// applied about the viewport centre.
    pub fn apply_navigation(&mut self, event: &NavigationEvent) -> Recompute {
        match event.kind {
            NavigationKind::Pan => {
                let mut transform = self.transform();
                transform.pan_by(event.pan_delta);
                self.store_transform(&transform)
            }
            NavigationKind::Zoom => {
                let mut transform = self.transform();
                transform.zoom_by(event.zoom_delta);
                self.store_transform(&transform)
            }
            NavigationKind::WindowLevel => self.set_window(
                self.state
                    .window()
                    .adjusted(event.window_width_delta, event.window_center_delta),
            ),
        }
    }

    pub fn measurement_mode(&self) -> bool {
        self.measurement_mode
    }

    pub fn set_measurement_mode(&mut self, enabled: bool) {
        self.measurement_mode = enabled;
        self.measurement.reset();
        self.pointer.release();
    }

    pub fn measurement_tool(&self) -> &MeasurementTool {
        &self.measurement
    }

    /// Pointer down. Starts a pan drag, or places a measurement point in
    /// measurement mode.
    pub fn pointer_pressed(&mut self, position: DVec2) -> Option<Measurement> {
        if self.measurement_mode {
            let spacing = self.volume.as_ref().map_or(1.0, |volume| volume.spacing.0);
            return self.measurement.press(position, spacing, self.state.zoom);
        }
        self.pointer.press(position);
        None
    }

    pub fn pointer_moved(&mut self, position: DVec2) -> Option<NavigationEvent> {
        if let Some(delta) = self.pointer.move_to(position) {
            return Some(self.pan_by(delta));
        }
        if self.measurement_mode {
            self.measurement.hover(position);
        }
        None
    }

    pub fn pointer_released(&mut self) {
        self.pointer.release();
    }

    fn target(&self) -> Option<(Arc<Volume>, SliceKey)> {
        let volume = self.volume.as_ref().filter(|volume| volume.is_renderable())?;
        let key = SliceKey {
            volume_epoch: self.volume_epoch,
            slice_index: select_slice(volume, self.state.slice_index),
            window: self.state.window().bits(),
        };
        Some((Arc::clone(volume), key))
    }

    fn clear_display(&mut self) {
        if self.displayed.take().is_some() {
            log::debug!("No renderable volume, clearing display");
        }
        self.in_flight = None;
        self.status = PipelineStatus::Clean;
    }

    /// The frame for the displayed pixels and the current placement.
    ///
    /// This never maps pixels. After a failed or pending recompute it still
    /// shows the last good slice.
    pub fn frame(&self) -> Option<RenderedFrame> {
        let displayed = self.displayed.as_ref()?;
        Some(compose_frame(
            displayed.pixels.clone(),
            displayed.key.slice_index,
            displayed.depth,
            &displayed.window,
            &self.transform(),
            self.state.show_grid,
            self.viewport_size,
        ))
    }

    /// Bring the display up to date on the calling thread.
    pub fn render_now(&mut self) -> Option<RenderedFrame> {
        let Some((volume, key)) = self.target() else {
            self.clear_display();
            return None;
        };
        if self.displayed.as_ref().map(|displayed| displayed.key) != Some(key) {
            let Some(slice) = volume.get_slice(key.slice_index) else {
                self.clear_display();
                return None;
            };
            let window = self.state.window();
            let started = Instant::now();
            match window_level::map_slice_view(&slice, window) {
                Ok(pixels) => {
                    log::debug!(
                        "Mapped slice {} in {:?}",
                        key.slice_index,
                        started.elapsed()
                    );
                    // anything still in flight is now older than the display
                    self.generation += 1;
                    self.in_flight = None;
                    self.displayed = Some(DisplayedSlice {
                        key,
                        depth: volume.depth,
                        window,
                        pixels,
                    });
                }
                Err(err) => {
                    log::error!("Error rendering slice {}: {err}", key.slice_index);
                    return self.frame();
                }
            }
        }
        self.status = PipelineStatus::Clean;
        self.frame()
    }

    /// Start mapping the current slice on the rayon pool if the display is
    /// out of date.
    pub fn schedule(&mut self) -> Scheduled {
        let Some((volume, key)) = self.target() else {
            self.clear_display();
            return Scheduled::Absent;
        };
        if self
            .displayed
            .as_ref()
            .is_some_and(|displayed| displayed.key == key)
        {
            self.status = PipelineStatus::Clean;
            return Scheduled::Current;
        }
        if self.in_flight.is_some_and(|(_, pending)| pending == key) {
            return Scheduled::InFlight;
        }
        let Some(slice) = volume.get_slice(key.slice_index) else {
            self.clear_display();
            return Scheduled::Absent;
        };

        let (height, width) = slice.dim();
        let samples: Vec<i16> = slice.iter().copied().collect();
        let window = self.state.window();
        self.generation += 1;
        let generation = self.generation;
        self.in_flight = Some((generation, key));

        let (sender, receiver) = oneshot::channel();
        rayon::spawn(move || {
            let started = Instant::now();
            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                window_level::map_slice_to_grayscale(&samples, width, height, window)
            }))
            .unwrap_or(Err(RenderError::WorkerLost));
            log::debug!(
                "Mapped {width}x{height} slice for generation {generation} in {:?}",
                started.elapsed()
            );
            // the receiver is gone if the request was abandoned
            let _ = sender.send(result);
        });

        Scheduled::Pending(PendingSlice {
            generation,
            key,
            depth: volume.depth,
            window,
            receiver,
        })
    }

    /// Swap in a finished background mapping if it is still the latest
    /// request and still matches the state.
    pub fn complete(&mut self, done: CompletedSlice) -> Completion {
        if done.generation != self.generation {
            log::debug!(
                "Discarding slice from generation {}, current is {}",
                done.generation,
                self.generation
            );
            return Completion::Stale;
        }
        self.in_flight = None;
        if self.target().map(|(_, key)| key) != Some(done.key) {
            log::debug!("Discarding slice {}, state changed", done.key.slice_index);
            return Completion::Stale;
        }
        match done.result {
            Ok(pixels) => {
                self.displayed = Some(DisplayedSlice {
                    key: done.key,
                    depth: done.depth,
                    window: done.window,
                    pixels,
                });
                self.status = PipelineStatus::Clean;
                Completion::Applied
            }
            Err(err) => {
                log::error!("Error rendering slice {}: {err}", done.key.slice_index);
                Completion::Failed(err)
            }
        }
    }

    /// Schedule, wait and complete in one go.
    pub async fn refresh(&mut self) -> Option<RenderedFrame> {
        match self.schedule() {
            Scheduled::Absent => return None,
            Scheduled::Pending(pending) => {
                let done = pending.wait().await;
                self.complete(done);
            }
            Scheduled::Current | Scheduled::InFlight => {}
        }
        self.frame()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    const VIEWPORT: DVec2 = DVec2::new(200.0, 100.0);

    /// Every voxel of slice z holds z * 100.
    fn stepped_volume(width: usize, height: usize, depth: usize) -> Arc<Volume> {
        let voxels = (0..depth)
            .flat_map(|z| std::iter::repeat_n((z * 100) as i16, width * height))
            .collect();
        Arc::new(Volume::new(width, height, depth, voxels).unwrap())
    }

    fn pipeline_with(volume: Arc<Volume>) -> RenderPipeline {
        let mut pipeline = RenderPipeline::default();
        pipeline.resize(VIEWPORT);
        pipeline.set_window(WindowLevel::new(1000.0, 500.0));
        pipeline.set_volume(Some(volume));
        pipeline
    }

    fn finish(pipeline: &mut RenderPipeline) -> Completion {
        match pipeline.schedule() {
            Scheduled::Pending(pending) => pipeline.complete(block_on(pending.wait())),
            other => panic!("expected pending work, got {other:?}"),
        }
    }

    #[test]
    fn render_without_volume_is_absent() {
        let state = RenderState::default();
        assert!(render(None, &state, VIEWPORT).unwrap().is_none());

        let broken = Volume {
            width: 4,
            height: 4,
            depth: 2,
            voxels: vec![0; 31],
            ..Default::default()
        };
        assert!(render(Some(&broken), &state, VIEWPORT).unwrap().is_none());

        let empty = Volume {
            width: 4,
            height: 0,
            depth: 2,
            ..Default::default()
        };
        assert!(render(Some(&empty), &state, VIEWPORT).unwrap().is_none());
    }

    #[test]
    fn uniform_slice_at_window_middle_is_128() {
        let volume = Volume::new(4, 4, 1, vec![100; 16]).unwrap();
        let state = RenderState {
            window_width: 200.0,
            window_center: 100.0,
            ..Default::default()
        };
        let frame = render(Some(&volume), &state, VIEWPORT).unwrap().unwrap();
        assert_eq!(frame.pixels.pixels().len(), 16);
        assert!(frame.pixels.pixels().iter().all(|&p| p == 0xFF80_8080));
    }

    #[test]
    fn render_is_deterministic() {
        let voxels: Vec<i16> = (0..64 * 48 * 3).map(|i| (i % 3001) as i16 - 1000).collect();
        let volume = Volume::new(64, 48, 3, voxels).unwrap();
        let state = RenderState {
            slice_index: 1,
            window_width: 400.0,
            window_center: 40.0,
            ..Default::default()
        };
        let first = render(Some(&volume), &state, VIEWPORT).unwrap().unwrap();
        let second = render(Some(&volume), &state, VIEWPORT).unwrap().unwrap();
        assert_eq!(first.pixels.pixels(), second.pixels.pixels());
        assert_eq!(first, second);
    }

    #[test]
    fn render_reports_slice_and_overlay() {
        let volume = stepped_volume(10, 20, 5);
        let state = RenderState {
            slice_index: -1,
            window_width: 400.0,
            window_center: 40.0,
            zoom: 2.0,
            ..Default::default()
        };
        let frame = render(Some(&volume), &state, VIEWPORT).unwrap().unwrap();
        assert_eq!(frame.effective_slice_index, 2);
        assert_eq!(frame.info_text, "Slice: 3/5, Window: C=40/W=400, Zoom: 2.0x");
        let grid = frame.grid_lines.unwrap();
        assert_eq!(grid.horizontal.length(), 20.0);
        assert_eq!(grid.vertical.length(), 40.0);

        let hidden = RenderState {
            show_grid: false,
            ..state
        };
        let frame = render(Some(&volume), &hidden, VIEWPORT).unwrap().unwrap();
        assert!(frame.grid_lines.is_none());
    }

    #[test]
    fn setters_report_the_recompute_they_need() {
        let mut pipeline = pipeline_with(stepped_volume(4, 4, 3));
        pipeline.render_now();
        assert_eq!(pipeline.status(), PipelineStatus::Clean);

        assert_eq!(pipeline.set_zoom(2.0), Recompute::Placement);
        assert_eq!(pipeline.set_pan(DVec2::new(3.0, 4.0)), Recompute::Placement);
        assert_eq!(pipeline.set_show_grid(false), Recompute::Placement);
        assert_eq!(pipeline.resize(DVec2::new(640.0, 480.0)), Recompute::Placement);
        assert_eq!(pipeline.status(), PipelineStatus::Clean);

        assert_eq!(pipeline.set_zoom(2.0), Recompute::None);
        assert_eq!(pipeline.set_slice_index(0), Recompute::Full);
        assert_eq!(pipeline.status(), PipelineStatus::Dirty);
        pipeline.render_now();
        assert_eq!(pipeline.set_window_center(10.0), Recompute::Full);
        pipeline.render_now();
        assert_eq!(pipeline.set_volume(Some(stepped_volume(4, 4, 3))), Recompute::Full);
    }

    #[test]
    fn placement_changes_reuse_pixels() {
        let mut pipeline = pipeline_with(stepped_volume(8, 8, 3));
        let before = pipeline.render_now().unwrap();
        let generation = pipeline.generation();

        pipeline.zoom_at(3.0, DVec2::new(20.0, 30.0));
        pipeline.pan_by(DVec2::new(5.0, 5.0));
        let after = pipeline.render_now().unwrap();

        assert_eq!(pipeline.generation(), generation);
        assert!(after.pixels.shares_storage(&before.pixels));
        assert_ne!(after.placement, before.placement);
        assert!(after.info_text.ends_with("Zoom: 1.3x"));
    }

    #[test]
    fn equivalent_slice_request_reuses_pixels() {
        let mut pipeline = pipeline_with(stepped_volume(8, 8, 5));
        let before = pipeline.render_now().unwrap();
        assert_eq!(before.effective_slice_index, 2);

        assert_eq!(pipeline.set_slice_index(-7), Recompute::Full);
        let after = pipeline.render_now().unwrap();
        assert!(after.pixels.shares_storage(&before.pixels));
        assert_eq!(pipeline.status(), PipelineStatus::Clean);
    }

    #[test]
    fn background_mapping_is_applied() {
        let mut pipeline = pipeline_with(stepped_volume(6, 4, 3));
        pipeline.set_slice_index(2);
        assert!(matches!(finish(&mut pipeline), Completion::Applied));
        assert_eq!(pipeline.status(), PipelineStatus::Clean);

        let frame = pipeline.frame().unwrap();
        assert_eq!(frame.effective_slice_index, 2);
        // (200 - 0) / 1000 * 255 = 51
        assert_eq!(frame.pixels.gray_at(0, 0), Some(51));
        assert!(matches!(pipeline.schedule(), Scheduled::Current));
    }

    #[test]
    fn older_request_loses_to_newer_one() {
        let mut pipeline = pipeline_with(stepped_volume(6, 4, 3));
        pipeline.set_slice_index(0);
        let Scheduled::Pending(first) = pipeline.schedule() else {
            panic!("expected pending work");
        };
        pipeline.set_slice_index(1);
        let Scheduled::Pending(second) = pipeline.schedule() else {
            panic!("expected pending work");
        };
        assert!(second.generation() > first.generation());

        let second = block_on(second.wait());
        let first = block_on(first.wait());
        assert!(matches!(pipeline.complete(second), Completion::Applied));
        assert!(matches!(pipeline.complete(first), Completion::Stale));
        assert_eq!(pipeline.frame().unwrap().effective_slice_index, 1);
    }

    #[test]
    fn result_for_outdated_state_is_discarded() {
        let mut pipeline = pipeline_with(stepped_volume(6, 4, 3));
        let Scheduled::Pending(pending) = pipeline.schedule() else {
            panic!("expected pending work");
        };
        pipeline.set_window_width(10.0);
        assert!(matches!(
            pipeline.complete(block_on(pending.wait())),
            Completion::Stale
        ));
        assert!(pipeline.frame().is_none());
        assert_eq!(pipeline.status(), PipelineStatus::Dirty);
    }

    #[test]
    fn repeated_schedule_does_not_duplicate_work() {
        let mut pipeline = pipeline_with(stepped_volume(6, 4, 3));
        let Scheduled::Pending(pending) = pipeline.schedule() else {
            panic!("expected pending work");
        };
        assert!(matches!(pipeline.schedule(), Scheduled::InFlight));
        assert!(matches!(
            pipeline.complete(block_on(pending.wait())),
            Completion::Applied
        ));
    }

    #[test]
    fn failed_mapping_keeps_previous_frame() {
        let volume = stepped_volume(6, 4, 3);
        let mut pipeline = pipeline_with(Arc::clone(&volume));
        pipeline.set_slice_index(0);
        let shown = pipeline.render_now().unwrap();

        pipeline.set_slice_index(1);
        let state = pipeline.state().clone();
        let Scheduled::Pending(pending) = pipeline.schedule() else {
            panic!("expected pending work");
        };
        let mut done = block_on(pending.wait());
        done.result = Err(RenderError::Allocation { pixels: 24 });

        assert!(matches!(
            pipeline.complete(done),
            Completion::Failed(RenderError::Allocation { .. })
        ));
        assert_eq!(pipeline.status(), PipelineStatus::Dirty);
        assert_eq!(pipeline.state(), &state);
        let still = pipeline.frame().unwrap();
        assert_eq!(still.effective_slice_index, 0);
        assert!(still.pixels.shares_storage(&shown.pixels));
        assert_eq!(volume.voxels.len(), 72);
    }

    #[test]
    fn vanished_worker_is_reported() {
        let (sender, receiver) = oneshot::channel();
        drop(sender);
        let pending = PendingSlice {
            generation: 1,
            key: SliceKey {
                volume_epoch: 1,
                slice_index: 0,
                window: (0, 0),
            },
            depth: 1,
            window: WindowLevel::new(1.0, 0.0),
            receiver,
        };
        let done = block_on(pending.wait());
        assert!(matches!(done.result, Err(RenderError::WorkerLost)));
    }

    #[test]
    fn removing_the_volume_clears_the_display() {
        let mut pipeline = pipeline_with(stepped_volume(4, 4, 2));
        assert!(pipeline.render_now().is_some());
        assert_eq!(pipeline.set_volume(None), Recompute::Full);
        assert!(matches!(pipeline.schedule(), Scheduled::Absent));
        assert!(pipeline.frame().is_none());
        assert_eq!(pipeline.status(), PipelineStatus::Clean);
    }

    #[test]
    fn drag_pans_and_emits_events() {
        let mut pipeline = pipeline_with(stepped_volume(4, 4, 2));
        pipeline.pointer_pressed(DVec2::new(50.0, 50.0));
        let event = pipeline.pointer_moved(DVec2::new(60.0, 60.0)).unwrap();
        assert_eq!(event.kind, NavigationKind::Pan);
        assert_eq!(pipeline.state().pan, DVec2::new(10.0, 10.0));
        pipeline.pointer_moved(DVec2::new(55.0, 60.0));
        assert_eq!(pipeline.state().pan, DVec2::new(5.0, 10.0));

        pipeline.pointer_released();
        assert!(pipeline.pointer_moved(DVec2::new(0.0, 0.0)).is_none());
        assert_eq!(pipeline.state().pan, DVec2::new(5.0, 10.0));
    }

    #[test]
    fn measurement_mode_measures_instead_of_panning() {
        let volume = Volume::new(4, 4, 1, vec![0; 16])
            .unwrap()
            .with_spacing((0.5, 0.5, 2.0));
        let mut pipeline = pipeline_with(Arc::new(volume));
        pipeline.set_zoom(2.0);
        pipeline.set_measurement_mode(true);

        assert!(pipeline.pointer_pressed(DVec2::new(0.0, 0.0)).is_none());
        assert!(pipeline.pointer_moved(DVec2::new(10.0, 0.0)).is_none());
        assert!(pipeline.measurement_tool().preview().is_some());
        let measurement = pipeline.pointer_pressed(DVec2::new(0.0, 40.0)).unwrap();
        assert_eq!(measurement.distance_mm, 10.0);
        assert_eq!(pipeline.state().pan, DVec2::ZERO);
    }

    #[test]
    fn sibling_view_replays_navigation() {
        let mut leader = pipeline_with(stepped_volume(4, 4, 2));
        let mut follower = pipeline_with(stepped_volume(4, 4, 2));

        let pan = leader.pan_by(DVec2::new(7.0, -3.0));
        let zoom = leader.zoom_at(2.0, VIEWPORT / 2.0);
        let window = leader.adjust_window(-200.0, 50.0);

        assert_eq!(follower.apply_navigation(&pan), Recompute::Placement);
        assert_eq!(follower.apply_navigation(&zoom), Recompute::Placement);
        assert_eq!(follower.apply_navigation(&window), Recompute::Full);
        assert_eq!(follower.state().pan, DVec2::new(7.0, -3.0));
        assert!((follower.state().zoom - leader.state().zoom).abs() < 1e-12);
        assert_eq!(follower.state().window(), WindowLevel::new(800.0, 550.0));
    }

    #[test]
    fn custom_zoom_limits_apply() {
        let settings = ViewerSettings {
            zoom_limits: ZoomLimits {
                min: 0.5,
                max: 20.0,
                step: 1.0,
            },
            ..Default::default()
        };
        let mut pipeline = RenderPipeline::new(&settings).unwrap();
        pipeline.set_zoom(15.0);
        assert_eq!(pipeline.state().zoom, 15.0);
        pipeline.zoom_at(-100.0, DVec2::ZERO);
        assert_eq!(pipeline.state().zoom, 0.5);
    }

    #[test]
    fn invalid_zoom_limits_are_rejected() {
        let settings = ViewerSettings {
            zoom_limits: ZoomLimits {
                min: 5.0,
                max: 1.0,
                step: 0.1,
            },
            ..Default::default()
        };
        assert!(matches!(
            RenderPipeline::new(&settings),
            Err(ConfigError::InvalidZoomRange { .. })
        ));

        let zero_min = ViewerSettings {
            zoom_limits: ZoomLimits {
                min: 0.0,
                ..ZoomLimits::default()
            },
            ..Default::default()
        };
        assert!(RenderPipeline::new(&zero_min).is_err());
    }

    #[test]
    fn hovering_after_release_does_not_pan() {
        let mut pipeline = pipeline_with(stepped_volume(4, 4, 2));
        pipeline.pointer_pressed(DVec2::new(50.0, 50.0));
        pipeline.pointer_moved(DVec2::new(60.0, 60.0));
        pipeline.pointer_released();

        assert!(pipeline.pointer_moved(DVec2::new(0.0, 0.0)).is_none());
        assert!(pipeline.pointer_moved(DVec2::new(30.0, 40.0)).is_none());
        assert_eq!(pipeline.state().pan, DVec2::new(10.0, 10.0));
    }

    #[test]
    fn hovering_without_a_press_does_not_pan() {
        let mut pipeline = pipeline_with(stepped_volume(4, 4, 2));
        assert!(pipeline.pointer_moved(DVec2::new(0.0, 0.0)).is_none());
        assert!(pipeline.pointer_moved(DVec2::new(30.0, 40.0)).is_none());
        assert_eq!(pipeline.state().pan, DVec2::ZERO);
    }

    #[test]
    fn measurement_preview_does_not_pan() {
        let mut pipeline = pipeline_with(stepped_volume(4, 4, 2));
        pipeline.set_measurement_mode(true);
        pipeline.pointer_pressed(DVec2::new(0.0, 0.0));

        assert!(pipeline.pointer_moved(DVec2::new(10.0, 0.0)).is_none());
        assert!(pipeline.pointer_moved(DVec2::new(20.0, 0.0)).is_none());
        assert_eq!(pipeline.state().pan, DVec2::ZERO);
        assert!(pipeline.measurement_tool().preview().is_some());
    }
}
