use std::num::NonZeroU32;

use mandelstream_core::{Fixed256, FractalMode, Grid, TileId, FIXED_WORDS};

use crate::error::LinkError;

/// Total length of one configuration stream, in 32-bit words.
pub const CONFIG_WORDS: usize = 53;

// Word offsets within the configuration stream. The six fixed-point fields
// each occupy FIXED_WORDS (8) words.
pub const W_MODE: usize = 0;
pub const W_WIDTH: usize = 1;
pub const W_HEIGHT: usize = 2;
pub const W_UL_X: usize = 3;
pub const W_UL_Y: usize = W_UL_X + FIXED_WORDS;
pub const W_H_STEP: usize = W_UL_Y + FIXED_WORDS;
pub const W_V_STEP: usize = W_H_STEP + FIXED_WORDS;
pub const W_CENTER_X: usize = W_V_STEP + FIXED_WORDS;
pub const W_CENTER_Y: usize = W_CENTER_X + FIXED_WORDS;
pub const W_MAX_ITER: usize = W_CENTER_Y + FIXED_WORDS;
pub const W_PACKET_SIZE: usize = 52;

/// Result packets never exceed this size when chosen by default.
pub const DEFAULT_PACKET_WORDS: u32 = 24 * 1024;

/// Pixel counts below this stream as a single packet by default.
pub const SINGLE_PACKET_LIMIT: u32 = 64 * 1024;

/// Accelerator-reported tile maxima, read via the capability probe.
#[derive(Debug, Clone, Copy)]
pub struct TileCaps {
    pub max_width: u32,
    pub max_height: u32,
}

/// An encoded configuration plus the packet arithmetic fetch will need.
#[derive(Debug, Clone)]
pub struct TileConfig {
    pub words: Vec<u32>,
    pub packet_size: u32,
    pub packet_count: u32,
    pub last_packet_size: u32,
}

/// Split `total_pixels` result words into packets.
///
/// Without an explicit request, small jobs stream as one packet and large
/// jobs use [`DEFAULT_PACKET_WORDS`]. A request larger than the job shrinks
/// to the job. Returns `(packet_size, packet_count, last_packet_size)`;
/// the invariant `packet_count × packet_size + last_packet_size ==
/// total_pixels` always holds, with `last_packet_size == 0` when the job
/// divides evenly.
pub fn packet_layout(total_pixels: u32, requested: Option<NonZeroU32>) -> (u32, u32, u32) {
    let packet_size = match requested {
        None if total_pixels < SINGLE_PACKET_LIMIT => total_pixels,
        None => DEFAULT_PACKET_WORDS,
        Some(req) => req.get().min(total_pixels),
    };
    let packet_count = total_pixels / packet_size;
    let last_packet_size = total_pixels - packet_count * packet_size;
    (packet_size, packet_count, last_packet_size)
}

/// Build the full command word array for one tile.
///
/// Layout (all words 32-bit; fixed-point fields are Q3.253, eight words,
/// least significant word first):
///
/// ```text
/// [ 0]       mode          1 = Mandelbrot, 0 = Julia
/// [ 1]       tile width
/// [ 2]       tile height
/// [ 3..=10]  upper-left X of the tile
/// [11..=18]  upper-left Y of the tile
/// [19..=26]  horizontal step
/// [27..=34]  vertical step (same value: square pixels)
/// [35..=42]  center X
/// [43..=50]  center Y
/// [51]       max iterations
/// [52]       packet size
/// ```
///
/// All plane quantities are derived from the grid's current settings at
/// call time. Fails with [`LinkError::TileTooLarge`] when the tile exceeds
/// the accelerator-reported maxima.
pub fn encode_config(
    grid: &Grid,
    id: TileId,
    caps: TileCaps,
    requested_packet: Option<NonZeroU32>,
) -> Result<TileConfig, LinkError> {
    let tile = grid.tile(id);
    let (width, height) = (tile.size_x(), tile.size_y());
    if width > caps.max_width || height > caps.max_height {
        return Err(LinkError::TileTooLarge {
            width,
            height,
            max_width: caps.max_width,
            max_height: caps.max_height,
        });
    }

    let settings = &grid.settings;
    let mut words = Vec::with_capacity(CONFIG_WORDS);
    words.push(match settings.mode {
        FractalMode::Mandelbrot => 1,
        FractalMode::Julia => 0,
    });
    words.push(width);
    words.push(height);

    let (ul_x, ul_y) = grid.tile_plane_origin(id);
    let h_step = settings.h_step();
    for value in [&ul_x, &ul_y, &h_step, &h_step, &settings.c_x, &settings.c_y] {
        words.extend_from_slice(&Fixed256::encode(value).to_words());
    }

    words.push(settings.max_iterations);
    let (packet_size, packet_count, last_packet_size) =
        packet_layout(tile.pixel_count(), requested_packet);
    words.push(packet_size);
    debug_assert_eq!(words.len(), CONFIG_WORDS);

    Ok(TileConfig {
        words,
        packet_size,
        packet_count,
        last_packet_size,
    })
}
