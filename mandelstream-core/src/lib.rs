pub mod error;
pub mod fixed;
pub mod grid;
pub mod settings;

// Re-export primary types for convenience.
pub use error::CoreError;
pub use fixed::{Fixed256, FIXED_FRAC_BITS, FIXED_INT_BITS, FIXED_WIDTH_BITS, FIXED_WORDS};
pub use grid::{BoundsPolicy, Grid, PixelRect, Tile, TileData, TileId, TileLimits, FULL_EXTENT};
pub use settings::{coord, parse_coord, ColorHints, FractalMode, GridSettings, PLANE_PRECISION};

/// Convenience result type for the core crate.
pub type Result<T> = std::result::Result<T, CoreError>;
