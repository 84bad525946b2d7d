#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationKind {
    Pan,
    Zoom,
    WindowLevel,
}

/// Whether the displayed grayscale buffer matches the current slice and
/// window parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineStatus {
    Clean,
    #[default]
    Dirty,
}

/// The work a state change calls for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recompute {
    /// Nothing changed.
    None,
    /// Only placement, grid and info text need rebuilding.
    Placement,
    /// The slice must be mapped to grayscale again.
    Full,
}
