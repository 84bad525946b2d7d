use crate::error::VolumeError;

use ndarray::Array3;
use ndarray::ArrayView2;
use ndarray::ArrayView3;
use ndarray::s;

/// A CT/CBCT voxel grid as handed over by the loading service.
///
/// The fields are public because the loader fills them in directly. Nothing
/// stops a caller from building a volume whose `voxels` length disagrees
/// with its dimensions, so every read goes through [`Volume::view`], which
/// refuses such a volume instead of indexing past the end.
#[derive(Debug, Clone)]
pub struct Volume {
    pub width: usize,
    pub height: usize,
    pub depth: usize,
    /// Samples in slice-major, then row-major order.
    pub voxels: Vec<i16>,
    /// Slice the loader suggests showing first (e.g. the isocenter slice).
    /// May be out of range.
    pub display_slice_index: i64,
    /// Pixel spacing x, pixel spacing y and slice thickness in millimetres.
    pub spacing: (f64, f64, f64),
}

impl Default for Volume {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            depth: 0,
            voxels: Vec::new(),
            display_slice_index: 0,
            spacing: (1.0, 1.0, 1.0),
        }
    }
}

impl Volume {
    /// Build a volume from raw samples, checking the voxel count.
    ///
    /// The suggested display slice defaults to the centre slice.
    ///
    /// # Errors
    ///
    /// Returns an error if a dimension is zero or `voxels` does not hold
    /// exactly `width * height * depth` samples.
    pub fn new(
        width: usize,
        height: usize,
        depth: usize,
        voxels: Vec<i16>,
    ) -> Result<Self, VolumeError> {
        if width == 0 || height == 0 || depth == 0 {
            return Err(VolumeError::EmptyDimensions {
                width,
                height,
                depth,
            });
        }
        let expected = width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(depth))
            .unwrap_or(usize::MAX);
        if voxels.len() != expected {
            return Err(VolumeError::VoxelCount {
                expected,
                actual: voxels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            depth,
            voxels,
            display_slice_index: (depth / 2) as i64,
            spacing: (1.0, 1.0, 1.0),
        })
    }

    /// Build a volume from an array shaped (depth, height, width).
    pub fn from_array(data: &Array3<i16>) -> Result<Self, VolumeError> {
        let (depth, height, width) = data.dim();
        Self::new(width, height, depth, data.iter().copied().collect())
    }

    pub fn with_display_slice_index(mut self, index: i64) -> Self {
        self.display_slice_index = index;
        self
    }

    pub fn with_spacing(mut self, spacing: (f64, f64, f64)) -> Self {
        self.spacing = spacing;
        self
    }

    /// Get the dimensions of the volume (depth, height, width)
    pub fn dim(&self) -> (usize, usize, usize) {
        (self.depth, self.height, self.width)
    }

    /// Whether the geometry and the sample buffer agree and are non-empty.
    pub fn is_renderable(&self) -> bool {
        self.width > 0
            && self.height > 0
            && self.depth > 0
            && self
                .width
                .checked_mul(self.height)
                .and_then(|n| n.checked_mul(self.depth))
                .is_some_and(|n| n == self.voxels.len())
    }

    /// Borrow the samples as a (depth, height, width) array, or `None` if
    /// the volume is not renderable.
    pub fn view(&self) -> Option<ArrayView3<'_, i16>> {
        if !self.is_renderable() {
            return None;
        }
        ArrayView3::from_shape(self.dim(), &self.voxels).ok()
    }

    /// Borrow one axial slice as a (height, width) array.
    pub fn get_slice(&self, index: usize) -> Option<ArrayView2<'_, i16>> {
        if index >= self.depth {
            return None;
        }
        Some(self.view()?.slice_move(s![index, .., ..]))
    }
}
