use std::num::NonZeroU32;

use mandelstream_core::{coord, FractalMode, Grid, GridSettings};
use mandelstream_link::sim::{sim_accelerator, SimLimits, SimRegs, SimRx, SimTx};
use mandelstream_link::StreamingEngine;

fn engine(limits: SimLimits) -> StreamingEngine<SimTx, SimRx, SimRegs> {
    let (tx, rx, regs) = sim_accelerator(limits);
    StreamingEngine::new(tx, rx, regs)
}

#[test]
fn end_to_end_mandelbrot_256() {
    // Standard view: [-2, 2] × [2, -2] over 256×256 pixels.
    let settings = GridSettings::new(256, 256, 1000, FractalMode::Mandelbrot).unwrap();
    let mut grid = Grid::new(settings);
    let id = grid.tile_ids().next().unwrap();

    let mut eng = engine(SimLimits::default());
    let done = eng.compute(&mut grid, id).unwrap();
    assert_eq!(done, id);
    assert!(!eng.still_computing().unwrap());

    let data = grid.tile(id).data().unwrap();
    assert_eq!(data.width(), 256);
    assert_eq!(data.height(), 256);

    // The pixel nearest the plane origin sits inside the main body and
    // must hit the iteration cap.
    assert_eq!(data.get(128, 128), 1000);

    // Corner pixels are far outside the set and escape almost at once.
    for (x, y) in [(0, 0), (255, 0), (0, 255), (255, 255)] {
        assert!(
            data.get(x, y) < 10,
            "corner ({x},{y}) should escape quickly, got {}",
            data.get(x, y)
        );
    }
}

#[test]
fn end_to_end_julia_origin_center() {
    // Julia with c = 0 iterates z², so the plane origin never escapes.
    let mut settings = GridSettings::new(128, 128, 500, FractalMode::Julia).unwrap();
    settings.set_center(coord(0.0), coord(0.0));
    let mut grid = Grid::new(settings);
    let id = grid.tile_ids().next().unwrap();

    let mut eng = engine(SimLimits::default());
    eng.compute(&mut grid, id).unwrap();

    let data = grid.tile(id).data().unwrap();
    assert_eq!(data.get(64, 64), 500);
    assert!(data.get(0, 0) < 5, "corner |z| > 2 escapes immediately");
}

#[test]
fn explicit_packet_size_survives_the_round_trip() {
    let settings = GridSettings::new(200, 200, 100, FractalMode::Mandelbrot).unwrap();
    let mut grid = Grid::new(settings);
    let id = grid.tile_ids().next().unwrap();

    // 40000 pixels in 7-word packets: 5714 full packets + 2-word tail.
    let mut eng = engine(SimLimits::default());
    eng.submit(&mut grid, id, NonZeroU32::new(7)).unwrap();
    eng.fetch(&mut grid).unwrap();
    assert_eq!(grid.tile(id).data().unwrap().as_flat().len(), 40_000);
}

#[test]
fn snapshot_reload_computes_the_same_image() {
    let mut settings = GridSettings::new(96, 96, 300, FractalMode::Mandelbrot).unwrap();
    settings
        .set_plane_rect(coord(-1.5), coord(1.0), coord(0.5), coord(-1.0))
        .unwrap();

    let json = serde_json::to_string(&settings).unwrap();
    let reloaded: GridSettings = serde_json::from_str(&json).unwrap();

    let mut g1 = Grid::new(settings);
    let mut g2 = Grid::new(reloaded);
    let id1 = g1.tile_ids().next().unwrap();
    let id2 = g2.tile_ids().next().unwrap();

    let mut eng = engine(SimLimits::default());
    eng.compute(&mut g1, id1).unwrap();
    eng.compute(&mut g2, id2).unwrap();
    assert_eq!(g1.tile(id1).data(), g2.tile(id2).data());
}

#[test]
fn resize_then_recompute() {
    let settings = GridSettings::new(64, 64, 200, FractalMode::Mandelbrot).unwrap();
    let mut grid = Grid::new(settings);
    let id = grid.tile_ids().next().unwrap();

    let mut eng = engine(SimLimits::default());
    eng.compute(&mut grid, id).unwrap();
    assert!(grid.tile(id).data().is_some());

    // Resizing invalidates the payload; a fresh compute fills the new shape.
    grid.resize(128, 32).unwrap();
    assert!(grid.tile(id).data().is_none());
    eng.compute(&mut grid, id).unwrap();
    let data = grid.tile(id).data().unwrap();
    assert_eq!((data.width(), data.height()), (128, 32));
}
