use crate::volume::Volume;

/// Resolve the slice to display.
///
/// An in-range `requested` index wins. Otherwise the volume's suggested
/// display slice is used if it is in range, and finally the centre slice.
/// A volume without slices yields 0; callers must not render it.
pub fn select_slice(volume: &Volume, requested: i64) -> usize {
    let depth = volume.depth;
    in_range(requested, depth)
        .or_else(|| in_range(volume.display_slice_index, depth))
        .unwrap_or(depth / 2)
}

fn in_range(index: i64, depth: usize) -> Option<usize> {
    usize::try_from(index).ok().filter(|&i| i < depth)
}
