//! # CT viewport library
//!
//! This crate turns CT/CBCT voxel volumes into displayable grayscale slices
//! and keeps track of how a slice view is panned and zoomed.

//!
//! A volume is a stack of axial slices of signed 16-bit samples, loaded by
//! whatever service decodes the DICOM files. The engine borrows it
//! read-only and:
//!  - picks the slice to show (explicit index, the loader's suggested
//!    display slice, or the centre slice)
//!  - maps the slice through a window width/center to opaque BGRA gray
//!  - places the result on screen under a zoom and pan, with
//!    mouse-anchored wheel zoom
//!  - builds the info text and the crosshair overlay
//!
//!  Mapping a slice is the expensive step, so [`RenderPipeline`] only
//!  repeats it when the volume, slice or window change. Pan and zoom reuse
//!  the cached pixels. The mapping can run on the rayon pool; a generation
//!  counter makes sure the newest request wins over slower older ones.
//!
//! # Examples
//!
//! ## Rendering the default slice of a volume
//!
//! ```no_run
//! # use ct_viewport::{RenderPipeline, Volume, WindowLevel};
//! # use glam::DVec2;
//! # use std::sync::Arc;
//! let volume = Volume::new(512, 512, 120, vec![0; 512 * 512 * 120])
//!     .expect("should have built volume");
//! let mut pipeline = RenderPipeline::default();
//! pipeline.resize(DVec2::new(800.0, 600.0));
//! pipeline.set_window(WindowLevel::new(400.0, 40.0));
//! pipeline.set_volume(Some(Arc::new(volume)));
//! let frame = pipeline
//!     .render_now()
//!     .expect("should have rendered the centre slice");
//! println!("{}", frame.info_text);
//! ```

pub mod config;
pub mod enums;
pub mod error;
pub mod frame;
pub mod measurement;
pub mod navigation;
pub mod pipeline;
pub mod slice_selector;
pub mod viewport;
pub mod volume;
pub mod volume_loader;
pub mod window_level;

pub use config::ViewerSettings;
pub use enums::{NavigationKind, PipelineStatus, Recompute};
pub use error::{ConfigError, RenderError, VolumeError};
pub use frame::{PixelBuffer, RenderedFrame};
pub use pipeline::{Completion, RenderPipeline, RenderState, Scheduled, render};
pub use slice_selector::select_slice;
pub use viewport::{GridLines, LineSegment, Placement, ViewportTransform};
pub use volume::Volume;
pub use volume_loader::{VolumeCache, VolumeSource};
pub use window_level::{WindowLevel, map_slice_to_grayscale};
