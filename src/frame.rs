use crate::viewport::{GridLines, Placement};
use crate::window_level::WindowLevel;

use image::ImageBuffer;
use image::RgbaImage;
use std::borrow::Cow;
use std::sync::Arc;

/// An opaque grayscale slice, one packed `0xAARRGGBB` word per pixel.
///
/// The storage is immutable and shared: the pipeline keeps a handle to reuse
/// it for pan/zoom-only updates while the presentation layer displays it.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    width: usize,
    height: usize,
    data: Arc<[u32]>,
}

impl PixelBuffer {
    pub(crate) fn new(width: usize, height: usize, data: Vec<u32>) -> Self {
        debug_assert_eq!(data.len(), width * height);
        Self {
            width,
            height,
            data: Arc::from(data),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[u32] {
        &self.data
    }

    /// Raw bytes for a BGRA8 surface, in B, G, R, A order on every target.
    ///
    /// Borrows the storage on little-endian targets and copies elsewhere.
    pub fn as_bytes(&self) -> Cow<'_, [u8]> {
        if cfg!(target_endian = "little") {
            Cow::Borrowed(bytemuck::cast_slice(self.pixels()))
        } else {
            Cow::Owned(self.data.iter().flat_map(|pixel| pixel.to_le_bytes()).collect())
        }
    }

    /// Gray level of the pixel at (x, y).
    pub fn gray_at(&self, x: usize, y: usize) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let [b, _, _, _] = self.data[y * self.width + x].to_le_bytes();
        Some(b)
    }

    /// Whether both buffers point at the same storage.
    pub fn shares_storage(&self, other: &PixelBuffer) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    pub fn to_rgba_image(&self) -> Option<RgbaImage> {
        let bytes: Vec<u8> = self
            .data
            .iter()
            .flat_map(|&pixel| {
                let [b, g, r, a] = pixel.to_le_bytes();
                [r, g, b, a]
            })
            .collect();
        ImageBuffer::from_raw(self.width as u32, self.height as u32, bytes)
    }
}

/// Everything the presentation layer needs to draw one slice.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedFrame {
    pub pixels: PixelBuffer,
    pub effective_slice_index: usize,
    pub info_text: String,
    pub grid_lines: Option<GridLines>,
    pub placement: Placement,
}

/// Round half away from zero to `decimals` places, like the pixel mapping.
/// `format!` alone would round exact ties to even.
fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

pub(crate) fn info_text(slice_index: usize, depth: usize, window: &WindowLevel, zoom: f64) -> String {
    format!(
        "Slice: {}/{}, Window: C={:.0}/W={:.0}, Zoom: {:.1}x",
        slice_index + 1,
        depth,
        round_to(window.center, 0),
        round_to(window.width, 0),
        round_to(zoom, 1)
    )
}
