use thiserror::Error;

/// Errors originating from the grid/tile geometry model.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid grid: {reason}")]
    InvalidGrid { reason: String },

    #[error("tile limits ({x0},{y0})-({x1},{y1}) invalid for grid {size_x}×{size_y}")]
    InvalidTileBounds {
        x0: i64,
        y0: i64,
        x1: i64,
        y1: i64,
        size_x: u32,
        size_y: u32,
    },

    #[error("tile collapsed to {width}×{height} (both dimensions must stay > 0)")]
    DegenerateTile { width: i64, height: i64 },

    #[error("invalid coordinate literal: {0:?}")]
    InvalidCoordinate(String),
}
