use rug::Float;
use tracing::warn;

use crate::error::CoreError;
use crate::settings::GridSettings;

/// Requested pixel limits for a tile, inclusive on all four sides.
///
/// Coordinates are signed so callers can pass the [`FULL_EXTENT`] sentinel
/// and so clamping operations can accept out-of-range input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x0: i64,
    pub y0: i64,
    pub x1: i64,
    pub y1: i64,
}

/// Sentinel rect: the tile covers the whole grid, and stays full-extent
/// across resizes (proportional rescaling maps a full tile onto the new
/// full extent exactly).
pub const FULL_EXTENT: PixelRect = PixelRect {
    x0: -1,
    y0: -1,
    x1: -1,
    y1: -1,
};

impl PixelRect {
    pub fn new(x0: i64, y0: i64, x1: i64, y1: i64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    fn is_full_extent(&self) -> bool {
        *self == FULL_EXTENT
    }
}

impl From<TileLimits> for PixelRect {
    fn from(l: TileLimits) -> Self {
        Self::new(
            i64::from(l.x0),
            i64::from(l.y0),
            i64::from(l.x1),
            i64::from(l.y1),
        )
    }
}

/// Validated tile limits: inclusive pixel coordinates, always inside the
/// parent grid with positive extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileLimits {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl TileLimits {
    pub fn width(&self) -> u32 {
        self.x1 - self.x0 + 1
    }

    pub fn height(&self) -> u32 {
        self.y1 - self.y0 + 1
    }
}

/// How out-of-range limits are treated when (re)shaping a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundsPolicy {
    /// Reject limits that leave the grid ([`CoreError::InvalidTileBounds`]).
    Strict,
    /// Pull limits back inside the grid, warning about each correction;
    /// only a collapsed dimension is fatal ([`CoreError::DegenerateTile`]).
    Clamp,
}

/// Per-pixel iteration counts for one tile, row-major (y, then x).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileData {
    width: u32,
    height: u32,
    data: Vec<u32>,
}

impl TileData {
    /// `data` must hold exactly `width × height` counts, row-major.
    pub fn new(width: u32, height: u32, data: Vec<u32>) -> Self {
        debug_assert_eq!(data.len(), width as usize * height as usize);
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Iteration count at pixel `(x, y)` of the tile.
    pub fn get(&self, x: u32, y: u32) -> u32 {
        self.data[(y * self.width + x) as usize]
    }

    pub fn row(&self, y: u32) -> &[u32] {
        let start = (y * self.width) as usize;
        &self.data[start..start + self.width as usize]
    }

    pub fn as_flat(&self) -> &[u32] {
        &self.data
    }
}

/// A rectangular sub-region of the grid's pixel space.
///
/// Sizes are always derived from the limits, never cached, so they cannot
/// fall out of step with the geometry. Plane-space quantities are likewise
/// derived from the owning grid's settings at read time.
#[derive(Debug, Clone)]
pub struct Tile {
    limits: TileLimits,
    data: Option<TileData>,
}

impl Tile {
    pub fn limits(&self) -> TileLimits {
        self.limits
    }

    pub fn size_x(&self) -> u32 {
        self.limits.width()
    }

    pub fn size_y(&self) -> u32 {
        self.limits.height()
    }

    pub fn pixel_count(&self) -> u32 {
        self.size_x() * self.size_y()
    }

    /// The result payload, if this tile has been computed since its last
    /// geometry change.
    pub fn data(&self) -> Option<&TileData> {
        self.data.as_ref()
    }
}

/// Handle to a tile owned by a [`Grid`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileId(usize);

impl TileId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// One [`GridSettings`] plus the tiles laid out on it.
///
/// Always created with a single full-extent tile. Tiles are addressed by
/// [`TileId`]; handles are only meaningful for the grid that issued them.
#[derive(Debug, Clone)]
pub struct Grid {
    pub settings: GridSettings,
    tiles: Vec<Tile>,
}

impl Grid {
    pub fn new(settings: GridSettings) -> Self {
        let full = TileLimits {
            x0: 0,
            y0: 0,
            x1: settings.size_x - 1,
            y1: settings.size_y - 1,
        };
        Self {
            settings,
            tiles: vec![Tile {
                limits: full,
                data: None,
            }],
        }
    }

    pub fn tile(&self, id: TileId) -> &Tile {
        &self.tiles[id.0]
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn tile_ids(&self) -> impl Iterator<Item = TileId> + '_ {
        (0..self.tiles.len()).map(TileId)
    }

    /// Add a tile. [`FULL_EXTENT`] yields a tile covering the whole grid;
    /// explicit limits are validated strictly.
    pub fn add_tile(&mut self, rect: PixelRect) -> crate::Result<TileId> {
        let limits = self.resolve(rect, BoundsPolicy::Strict)?;
        self.tiles.push(Tile {
            limits,
            data: None,
        });
        Ok(TileId(self.tiles.len() - 1))
    }

    /// Reshape a tile under an explicit bounds policy. Any held payload is
    /// discarded: the geometry no longer matches it.
    pub fn apply_limits(
        &mut self,
        id: TileId,
        rect: PixelRect,
        policy: BoundsPolicy,
    ) -> crate::Result<()> {
        let limits = self.resolve(rect, policy)?;
        let tile = &mut self.tiles[id.0];
        tile.data = None;
        tile.limits = limits;
        Ok(())
    }

    /// Replace a tile's limits outright (strict bounds).
    pub fn set_tile_limits(&mut self, id: TileId, rect: PixelRect) -> crate::Result<()> {
        self.apply_limits(id, rect, BoundsPolicy::Strict)
    }

    /// Reshape a tile, pulling out-of-range coordinates back onto the grid.
    pub fn sub_tile(&mut self, id: TileId, rect: PixelRect) -> crate::Result<()> {
        self.apply_limits(id, rect, BoundsPolicy::Clamp)
    }

    /// Rescale one tile for a grid-size change.
    ///
    /// Ratios are taken against the tile's own current size. Only the
    /// right/bottom limits move (the origin stays put), rounded to nearest
    /// and clamped to the grid edge with a warning. The payload is
    /// discarded up front.
    pub fn scale_tile(&mut self, id: TileId, new_x: u32, new_y: u32) -> crate::Result<()> {
        if new_x == 0 || new_y == 0 {
            return Err(CoreError::DegenerateTile {
                width: i64::from(new_x),
                height: i64::from(new_y),
            });
        }
        self.tiles[id.0].data = None;
        let limits = self.tiles[id.0].limits;

        let rx = f64::from(new_x) / f64::from(limits.width());
        let mut x1 = (f64::from(limits.x1 + 1) * rx).round() as i64 - 1;
        let edge_x = i64::from(self.settings.size_x) - 1;
        if x1 > edge_x {
            warn!("scaled tile right edge {x1} off grid, clamping to {edge_x}");
            x1 = edge_x;
        }

        let ry = f64::from(new_y) / f64::from(limits.height());
        let mut y1 = (f64::from(limits.y1 + 1) * ry).round() as i64 - 1;
        let edge_y = i64::from(self.settings.size_y) - 1;
        if y1 > edge_y {
            warn!("scaled tile bottom edge {y1} off grid, clamping to {edge_y}");
            y1 = edge_y;
        }

        let width = x1 - i64::from(limits.x0) + 1;
        let height = y1 - i64::from(limits.y0) + 1;
        if width <= 0 || height <= 0 {
            return Err(CoreError::DegenerateTile { width, height });
        }

        self.tiles[id.0].limits = TileLimits {
            x0: limits.x0,
            y0: limits.y0,
            x1: x1 as u32,
            y1: y1 as u32,
        };
        Ok(())
    }

    /// Set new pixel dimensions, rescaling every tile to match and
    /// discarding all result payloads (the geometry changed, the data is
    /// stale relative to it).
    pub fn resize(&mut self, new_x: u32, new_y: u32) -> crate::Result<()> {
        if new_x == 0 || new_y == 0 {
            return Err(CoreError::InvalidGrid {
                reason: format!("dimensions must be > 0, got {new_x}×{new_y}"),
            });
        }
        self.settings.size_x = new_x;
        self.settings.size_y = new_y;
        for idx in 0..self.tiles.len() {
            self.scale_tile(TileId(idx), new_x, new_y)?;
        }
        Ok(())
    }

    /// Upper-left corner of a tile on the complex plane, derived from the
    /// current settings at call time (never cached).
    pub fn tile_plane_origin(&self, id: TileId) -> (Float, Float) {
        let limits = self.tiles[id.0].limits;
        let step = self.settings.h_step();
        let mut x = step.clone();
        x *= limits.x0;
        x += &self.settings.ul_x;
        let mut y = step;
        y *= limits.y0;
        y += &self.settings.ul_y;
        (x, y)
    }

    pub fn clear_tile_data(&mut self, id: TileId) {
        self.tiles[id.0].data = None;
    }

    /// Attach a result payload produced by the streaming engine.
    pub fn store_result(&mut self, id: TileId, data: TileData) {
        self.tiles[id.0].data = Some(data);
    }

    fn resolve(&self, rect: PixelRect, policy: BoundsPolicy) -> crate::Result<TileLimits> {
        if rect.is_full_extent() {
            return Ok(TileLimits {
                x0: 0,
                y0: 0,
                x1: self.settings.size_x - 1,
                y1: self.settings.size_y - 1,
            });
        }
        let sx = i64::from(self.settings.size_x);
        let sy = i64::from(self.settings.size_y);
        match policy {
            BoundsPolicy::Strict => {
                let PixelRect { x0, y0, x1, y1 } = rect;
                let in_bounds = x0 >= 0
                    && y0 >= 0
                    && x0 < sx
                    && x1 < sx
                    && y0 < sy
                    && y1 < sy;
                if !in_bounds || x1 < x0 || y1 < y0 {
                    return Err(CoreError::InvalidTileBounds {
                        x0,
                        y0,
                        x1,
                        y1,
                        size_x: self.settings.size_x,
                        size_y: self.settings.size_y,
                    });
                }
                Ok(TileLimits {
                    x0: x0 as u32,
                    y0: y0 as u32,
                    x1: x1 as u32,
                    y1: y1 as u32,
                })
            }
            BoundsPolicy::Clamp => {
                let x0 = clamp_axis(rect.x0, sx, "x0");
                let y0 = clamp_axis(rect.y0, sy, "y0");
                let x1 = clamp_axis(rect.x1, sx, "x1");
                let y1 = clamp_axis(rect.y1, sy, "y1");
                if x1 < x0 || y1 < y0 {
                    return Err(CoreError::DegenerateTile {
                        width: x1 - x0 + 1,
                        height: y1 - y0 + 1,
                    });
                }
                Ok(TileLimits {
                    x0: x0 as u32,
                    y0: y0 as u32,
                    x1: x1 as u32,
                    y1: y1 as u32,
                })
            }
        }
    }
}

/// Clamp one coordinate into `[0, size)`, warning when it moves.
fn clamp_axis(v: i64, size: i64, what: &str) -> i64 {
    if v < 0 {
        warn!("tile limit {what}={v} below zero, clamping to 0");
        0
    } else if v >= size {
        warn!("tile limit {what}={v} off the grid, clamping to {}", size - 1);
        size - 1
    } else {
        v
    }
}
