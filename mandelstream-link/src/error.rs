use mandelstream_core::CoreError;
use thiserror::Error;

use crate::channel::ChannelError;

/// Errors originating from the accelerator protocol layer.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("tile {width}×{height} exceeds accelerator limits {max_width}×{max_height}")]
    TileTooLarge {
        width: u32,
        height: u32,
        max_width: u32,
        max_height: u32,
    },

    #[error("fetch called with no outstanding configuration")]
    NoOutstandingConfig,

    #[error(transparent)]
    Geometry(#[from] CoreError),

    #[error(transparent)]
    Channel(#[from] ChannelError),
}
