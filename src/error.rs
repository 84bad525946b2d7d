use thiserror::Error;

#[derive(Debug, Error)]
pub enum VolumeError {
    #[error("Voxel count mismatch: expected {expected}, got {actual}")]
    VoxelCount { expected: usize, actual: usize },

    #[error("Volume dimensions must be non-zero, got {width}x{height}x{depth}")]
    EmptyDimensions {
        width: usize,
        height: usize,
        depth: usize,
    },

    #[error("No volume found for {0}")]
    NotFound(String),
}

/// Failures of a single render attempt. None of them are fatal: the
/// pipeline logs them and keeps showing the previous frame.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Slice sample count mismatch: expected {expected}, got {actual}")]
    SampleCount { expected: usize, actual: usize },

    #[error("Could not allocate a {pixels} pixel frame buffer")]
    Allocation { pixels: usize },

    #[error("Background worker exited before delivering the slice")]
    WorkerLost,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid zoom range [{min}, {max}]")]
    InvalidZoomRange { min: f64, max: f64 },

    #[error("Invalid zoom step {0}")]
    InvalidZoomStep(f64),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
