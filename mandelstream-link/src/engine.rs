use std::num::NonZeroU32;

use tracing::{debug, warn};

use mandelstream_core::{Grid, PixelRect, TileData, TileId};

use crate::channel::{RxChannel, TxChannel};
use crate::config::{encode_config, TileCaps};
use crate::error::LinkError;
use crate::probe::{CapabilityProbe, RegisterFile};

/// Bookkeeping for one submitted configuration, awaiting its result stream.
#[derive(Debug, Clone, Copy)]
struct PendingFetch {
    tile: TileId,
    width: u32,
    height: u32,
    packet_count: u32,
    packet_size: u32,
    last_packet_size: u32,
}

/// Drives one accelerator instance: encodes tile configurations onto the
/// outbound channel and drains iteration counts from the inbound channel.
///
/// Outstanding configurations form a stack: [`fetch`](Self::fetch) pops the
/// most recently submitted entry. The result stream itself carries no tag,
/// so correct tile/result pairing is a caller obligation — either
/// submit-then-immediately-fetch per tile (what [`compute`](Self::compute)
/// does), or submit and fetch in matched reverse order. Once a
/// configuration is sent there is no cancellation: the accelerator will
/// produce its results and the inbound channel must be drained, or its
/// output queue stalls and blocks all future work.
pub struct StreamingEngine<Tx, Rx, R> {
    tx: Tx,
    rx: Rx,
    probe: CapabilityProbe<R>,
    pending: Vec<PendingFetch>,
}

impl<Tx: TxChannel, Rx: RxChannel, R: RegisterFile> StreamingEngine<Tx, Rx, R> {
    pub fn new(tx: Tx, rx: Rx, regs: R) -> Self {
        Self {
            tx,
            rx,
            probe: CapabilityProbe::new(regs),
            pending: Vec::new(),
        }
    }

    pub fn probe(&self) -> &CapabilityProbe<R> {
        &self.probe
    }

    /// Number of configurations submitted but not yet fetched.
    pub fn pending_configs(&self) -> usize {
        self.pending.len()
    }

    /// Whether the accelerator is still draining a previous computation.
    pub fn still_computing(&self) -> crate::Result<bool> {
        Ok(self.probe.still_computing()?)
    }

    /// Pad the tile width up to a multiple of the kernel lane count.
    ///
    /// Growing, never shrinking: the tile's right limit moves outward, and
    /// the grid itself widens first when the padded tile would no longer
    /// fit inside it.
    fn pad_to_lanes(&self, grid: &mut Grid, id: TileId) -> crate::Result<()> {
        let lanes = self.probe.lane_count()?.max(1);
        let width = grid.tile(id).size_x();
        let pad = lanes - width % lanes;
        if pad == lanes {
            return Ok(());
        }
        let limits = grid.tile(id).limits();
        if width + pad > grid.settings.size_x {
            grid.settings.size_x = width + pad;
        }
        // Limits are zero-based, hence the +1 when comparing to a size.
        if limits.x1 + pad + 1 > grid.settings.size_x {
            grid.settings.size_x = limits.x1 + pad + 1;
        }
        warn!("tile width {width} padded by {pad} to a multiple of {lanes} lanes");
        grid.set_tile_limits(
            id,
            PixelRect::new(
                i64::from(limits.x0),
                i64::from(limits.y0),
                i64::from(limits.x1 + pad),
                i64::from(limits.y1),
            ),
        )?;
        Ok(())
    }

    /// Encode and send one tile's configuration.
    ///
    /// Pads the tile width to the lane count first, then discards the
    /// tile's existing payload (whatever it held no longer matches what the
    /// accelerator will produce). Blocks while the accelerator's command
    /// queue is full.
    pub fn submit(
        &mut self,
        grid: &mut Grid,
        id: TileId,
        packet_size: Option<NonZeroU32>,
    ) -> crate::Result<()> {
        self.pad_to_lanes(grid, id)?;
        grid.clear_tile_data(id);
        let caps = TileCaps {
            max_width: self.probe.max_tile_width()?,
            max_height: self.probe.max_tile_height()?,
        };
        let cfg = encode_config(grid, id, caps, packet_size)?;
        self.tx.send(&cfg.words)?;
        let tile = grid.tile(id);
        debug!(
            "submitted {}×{} tile: {} packets of {} words, last {}",
            tile.size_x(),
            tile.size_y(),
            cfg.packet_count,
            cfg.packet_size,
            cfg.last_packet_size
        );
        self.pending.push(PendingFetch {
            tile: id,
            width: tile.size_x(),
            height: tile.size_y(),
            packet_count: cfg.packet_count,
            packet_size: cfg.packet_size,
            last_packet_size: cfg.last_packet_size,
        });
        Ok(())
    }

    /// Drain the result stream for the most recently submitted tile.
    ///
    /// Blocks until every packet has arrived, stores the row-major
    /// iteration counts in the tile and returns its id. The grid must be
    /// the one the configuration was submitted against.
    pub fn fetch(&mut self, grid: &mut Grid) -> crate::Result<TileId> {
        let entry = self.pending.pop().ok_or(LinkError::NoOutstandingConfig)?;
        if grid.tile(entry.tile).data().is_some() {
            warn!("tile already had data, discarding the old payload");
        }
        let packet_size = entry.packet_size as usize;
        let total = entry.width as usize * entry.height as usize;
        let mut flat = vec![0u32; total];
        let mut packet = vec![0u32; packet_size];
        for i in 0..entry.packet_count as usize {
            self.rx.recv(&mut packet)?;
            let offset = i * packet_size;
            flat[offset..offset + packet_size].copy_from_slice(&packet);
            debug!("received packet {}/{}", i + 1, entry.packet_count);
        }
        if entry.last_packet_size > 0 {
            let last = entry.last_packet_size as usize;
            self.rx.recv(&mut packet)?;
            let offset = entry.packet_count as usize * packet_size;
            flat[offset..offset + last].copy_from_slice(&packet[..last]);
            debug!("received final partial packet of {last} words");
        }
        grid.store_result(entry.tile, TileData::new(entry.width, entry.height, flat));
        Ok(entry.tile)
    }

    /// [`submit`](Self::submit) followed immediately by
    /// [`fetch`](Self::fetch) — the synchronous path that keeps the
    /// configuration/result pairing trivially correct.
    pub fn compute(&mut self, grid: &mut Grid, id: TileId) -> crate::Result<TileId> {
        self.submit(grid, id, None)?;
        self.fetch(grid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{sim_accelerator, SimLimits, SimRegs, SimRx, SimTx};
    use mandelstream_core::{FractalMode, GridSettings, FULL_EXTENT};

    fn engine(limits: SimLimits) -> StreamingEngine<SimTx, SimRx, SimRegs> {
        let (tx, rx, regs) = sim_accelerator(limits);
        StreamingEngine::new(tx, rx, regs)
    }

    fn grid(sx: u32, sy: u32, max_iter: u32) -> Grid {
        Grid::new(GridSettings::new(sx, sy, max_iter, FractalMode::Mandelbrot).unwrap())
    }

    #[test]
    fn fetch_without_submit_fails() {
        let mut eng = engine(SimLimits::default());
        let mut g = grid(16, 16, 64);
        assert!(matches!(
            eng.fetch(&mut g),
            Err(LinkError::NoOutstandingConfig)
        ));
    }

    #[test]
    fn compute_populates_the_tile() {
        let mut eng = engine(SimLimits::default());
        let mut g = grid(64, 64, 100);
        let id = g.tile_ids().next().unwrap();
        let done = eng.compute(&mut g, id).unwrap();
        assert_eq!(done, id);
        let data = g.tile(id).data().unwrap();
        assert_eq!(data.width(), 64);
        assert_eq!(data.height(), 64);
        assert_eq!(eng.pending_configs(), 0);
    }

    #[test]
    fn lifo_fetch_order() {
        let mut eng = engine(SimLimits::default());
        let mut g = grid(32, 32, 64);
        let a = g.tile_ids().next().unwrap();
        let b = g.add_tile(FULL_EXTENT).unwrap();

        eng.submit(&mut g, a, None).unwrap();
        eng.submit(&mut g, b, None).unwrap();
        assert_eq!(eng.pending_configs(), 2);

        // Most recently submitted pops first.
        assert_eq!(eng.fetch(&mut g).unwrap(), b);
        assert_eq!(eng.fetch(&mut g).unwrap(), a);
        assert!(g.tile(a).data().is_some());
        assert!(g.tile(b).data().is_some());
    }

    #[test]
    fn width_padded_up_to_lane_multiple() {
        let mut eng = engine(SimLimits {
            lane_count: 8,
            ..SimLimits::default()
        });
        let mut g = grid(250, 100, 64);
        let id = g.tile_ids().next().unwrap();
        eng.compute(&mut g, id).unwrap();
        // 250 → next multiple of 8 is 256; the grid grows with it.
        assert_eq!(g.tile(id).size_x(), 256);
        assert_eq!(g.settings.size_x, 256);
        assert_eq!(g.tile(id).data().unwrap().width(), 256);
    }

    #[test]
    fn aligned_width_is_left_alone() {
        let mut eng = engine(SimLimits {
            lane_count: 4,
            ..SimLimits::default()
        });
        let mut g = grid(64, 16, 32);
        let id = g.tile_ids().next().unwrap();
        eng.compute(&mut g, id).unwrap();
        assert_eq!(g.tile(id).size_x(), 64);
        assert_eq!(g.settings.size_x, 64);
    }

    #[test]
    fn oversized_tile_is_rejected_before_sending() {
        let mut eng = engine(SimLimits {
            max_width: 32,
            ..SimLimits::default()
        });
        let mut g = grid(64, 64, 32);
        let id = g.tile_ids().next().unwrap();
        assert!(matches!(
            eng.submit(&mut g, id, None),
            Err(LinkError::TileTooLarge { .. })
        ));
        assert_eq!(eng.pending_configs(), 0);
    }

    #[test]
    fn refetch_overwrites_stale_payload() {
        let mut eng = engine(SimLimits::default());
        let mut g = grid(16, 16, 32);
        let id = g.tile_ids().next().unwrap();
        // Two outstanding configs for the same tile: the second fetch finds
        // the payload the first one stored and replaces it (with a warning,
        // not an error).
        eng.submit(&mut g, id, None).unwrap();
        eng.submit(&mut g, id, None).unwrap();
        eng.fetch(&mut g).unwrap();
        eng.fetch(&mut g).unwrap();
        assert!(g.tile(id).data().is_some());
        assert_eq!(eng.pending_configs(), 0);
    }

    #[test]
    fn still_computing_idle_sim() {
        let eng = engine(SimLimits::default());
        assert!(!eng.still_computing().unwrap());
    }

    #[test]
    fn multi_packet_fetch_reassembles() {
        let mut eng = engine(SimLimits::default());
        let mut g = grid(64, 64, 50);
        let id = g.tile_ids().next().unwrap();
        // 4096 pixels in packets of 1000: 4 full + 96-word remainder.
        eng.submit(&mut g, id, NonZeroU32::new(1000)).unwrap();
        eng.fetch(&mut g).unwrap();
        let data = g.tile(id).data().unwrap();
        assert_eq!(data.as_flat().len(), 4096);

        // Same job in one packet must produce identical data.
        let mut g2 = grid(64, 64, 50);
        let id2 = g2.tile_ids().next().unwrap();
        eng.compute(&mut g2, id2).unwrap();
        assert_eq!(g2.tile(id2).data().unwrap(), data);
    }
}
