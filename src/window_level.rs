use crate::error::RenderError;
use crate::frame::PixelBuffer;

use ndarray::ArrayView2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Window width and center in raw sample units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowLevel {
    pub width: f64,
    pub center: f64,
}

impl WindowLevel {
    pub fn new(width: f64, center: f64) -> Self {
        Self { width, center }
    }

    /// Lowest sample value that is not clipped to black.
    pub fn min(&self) -> f64 {
        self.center - self.width / 2.0
    }

    pub fn adjusted(&self, width_delta: f64, center_delta: f64) -> Self {
        Self::new(self.width + width_delta, self.center + center_delta)
    }

    /// Map one sample to a gray level.
    ///
    /// Rounds half away from zero. A non-positive (or NaN) width saturates
    /// every sample to white.
    #[inline]
    pub fn gray_value(&self, sample: i16) -> u8 {
        if !(self.width > 0.0) {
            return u8::MAX;
        }
        let scaled = (f64::from(sample) - self.min()) / self.width;
        // NaN survives the clamp and casts to 0
        (scaled * 255.0).round().clamp(0.0, 255.0) as u8
    }

    /// Key used to tell whether two windows produce the same pixels.
    pub(crate) fn bits(&self) -> (u64, u64) {
        (self.width.to_bits(), self.center.to_bits())
    }
}

/// Opaque gray pixel packed as `0xAARRGGBB`.
#[inline]
pub fn bgra(gray: u8) -> u32 {
    let g = u32::from(gray);
    0xFF00_0000 | (g << 16) | (g << 8) | g
}

/// Map a row-major `width * height` slice to opaque BGRA grayscale.
///
/// # Errors
///
/// Fails if `samples` has the wrong length or the output buffer cannot be
/// allocated.
pub fn map_slice_to_grayscale(
    samples: &[i16],
    width: usize,
    height: usize,
    window: WindowLevel,
) -> Result<PixelBuffer, RenderError> {
    let pixel_count = width.checked_mul(height).ok_or(RenderError::SampleCount {
        expected: usize::MAX,
        actual: samples.len(),
    })?;
    if samples.len() != pixel_count {
        return Err(RenderError::SampleCount {
            expected: pixel_count,
            actual: samples.len(),
        });
    }

    let mut data: Vec<u32> = Vec::new();
    data.try_reserve_exact(pixel_count)
        .map_err(|_| RenderError::Allocation {
            pixels: pixel_count,
        })?;
    data.resize(pixel_count, 0);

    if pixel_count > 0 {
        data.par_chunks_mut(width)
            .zip(samples.par_chunks(width))
            .for_each(|(row_out, row_in)| {
                for (pixel, &sample) in row_out.iter_mut().zip(row_in) {
                    *pixel = bgra(window.gray_value(sample));
                }
            });
    }

    Ok(PixelBuffer::new(width, height, data))
}

/// Map a (height, width) slice view, copying it first only when it is not
/// contiguous.
pub fn map_slice_view(
    slice: &ArrayView2<'_, i16>,
    window: WindowLevel,
) -> Result<PixelBuffer, RenderError> {
    let (height, width) = slice.dim();
    match slice.as_slice() {
        Some(samples) => map_slice_to_grayscale(samples, width, height, window),
        None => {
            let samples: Vec<i16> = slice.iter().copied().collect();
            map_slice_to_grayscale(&samples, width, height, window)
        }
    }
}
