//! Software model of the accelerator.
//!
//! Implements the channel and register traits over shared state so the
//! protocol stack can run — and be tested — without hardware. Config
//! streams are parsed with the same offset constants the encoder uses, the
//! escape-time loop runs in `f64`, and results are queued as packets of
//! exactly the configured size.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use tracing::debug;

use mandelstream_core::{Fixed256, FIXED_WORDS};

use crate::channel::{ChannelError, RxChannel, TxChannel};
use crate::config::{
    CONFIG_WORDS, W_CENTER_X, W_CENTER_Y, W_HEIGHT, W_H_STEP, W_MAX_ITER, W_MODE, W_PACKET_SIZE,
    W_UL_X, W_UL_Y, W_V_STEP, W_WIDTH,
};
use crate::probe::{RegisterFile, StatusReg};

/// Capability registers reported by the simulated accelerator.
#[derive(Debug, Clone, Copy)]
pub struct SimLimits {
    pub max_width: u32,
    pub max_height: u32,
    pub lane_count: u32,
}

impl Default for SimLimits {
    fn default() -> Self {
        Self {
            max_width: 4096,
            max_height: 4096,
            lane_count: 4,
        }
    }
}

struct SimState {
    limits: SimLimits,
    /// Result packets awaiting pickup, oldest first.
    outbound: VecDeque<Vec<u32>>,
}

/// Outbound (config) endpoint of the simulator.
pub struct SimTx {
    state: Rc<RefCell<SimState>>,
}

/// Inbound (result) endpoint of the simulator.
pub struct SimRx {
    state: Rc<RefCell<SimState>>,
}

/// Status-register endpoint of the simulator.
pub struct SimRegs {
    state: Rc<RefCell<SimState>>,
}

/// Create a connected simulator: config sink, result source and registers
/// all sharing one device state.
pub fn sim_accelerator(limits: SimLimits) -> (SimTx, SimRx, SimRegs) {
    let state = Rc::new(RefCell::new(SimState {
        limits,
        outbound: VecDeque::new(),
    }));
    (
        SimTx {
            state: Rc::clone(&state),
        },
        SimRx {
            state: Rc::clone(&state),
        },
        SimRegs { state },
    )
}

fn fixed_at(words: &[u32], offset: usize) -> f64 {
    let mut field = [0u32; FIXED_WORDS];
    field.copy_from_slice(&words[offset..offset + FIXED_WORDS]);
    Fixed256::from_words(&field).to_f64()
}

/// One escape-time pixel: `z → z² + c` with bailout at `|z|² > 4`.
/// Interior points return exactly `max_iter`.
fn escape_count(z0: (f64, f64), c: (f64, f64), max_iter: u32) -> u32 {
    let (mut zr, mut zi) = z0;
    let mut n = 0;
    while n < max_iter {
        let rr = zr * zr;
        let ii = zi * zi;
        if rr + ii > 4.0 {
            break;
        }
        zi = 2.0 * zr * zi + c.1;
        zr = rr - ii + c.0;
        n += 1;
    }
    n
}

impl TxChannel for SimTx {
    fn send(&mut self, words: &[u32]) -> Result<(), ChannelError> {
        if words.len() != CONFIG_WORDS {
            return Err(ChannelError::Transfer(format!(
                "expected {CONFIG_WORDS} config words, got {}",
                words.len()
            )));
        }
        let mandelbrot = words[W_MODE] == 1;
        let width = words[W_WIDTH];
        let height = words[W_HEIGHT];
        let ul_x = fixed_at(words, W_UL_X);
        let ul_y = fixed_at(words, W_UL_Y);
        let h_step = fixed_at(words, W_H_STEP);
        let v_step = fixed_at(words, W_V_STEP);
        let c_x = fixed_at(words, W_CENTER_X);
        let c_y = fixed_at(words, W_CENTER_Y);
        let max_iter = words[W_MAX_ITER];
        let packet_size = words[W_PACKET_SIZE] as usize;
        if packet_size == 0 {
            return Err(ChannelError::Transfer("packet size must be > 0".to_owned()));
        }

        let mut counts = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            let im = ul_y - f64::from(y) * v_step;
            for x in 0..width {
                let re = ul_x + f64::from(x) * h_step;
                counts.push(if mandelbrot {
                    escape_count((0.0, 0.0), (re, im), max_iter)
                } else {
                    escape_count((re, im), (c_x, c_y), max_iter)
                });
            }
        }
        debug!("sim computed {width}×{height} result, packets of {packet_size}");

        let mut state = self.state.borrow_mut();
        for chunk in counts.chunks(packet_size) {
            state.outbound.push_back(chunk.to_vec());
        }
        Ok(())
    }
}

impl RxChannel for SimRx {
    fn recv(&mut self, buf: &mut [u32]) -> Result<(), ChannelError> {
        let packet = self
            .state
            .borrow_mut()
            .outbound
            .pop_front()
            .ok_or_else(|| ChannelError::Transfer("no result data pending".to_owned()))?;
        if packet.len() > buf.len() {
            return Err(ChannelError::Oversize {
                got: packet.len(),
                capacity: buf.len(),
            });
        }
        buf[..packet.len()].copy_from_slice(&packet);
        Ok(())
    }
}

impl RegisterFile for SimRegs {
    fn read(&self, reg: StatusReg) -> Result<u32, ChannelError> {
        let limits = self.state.borrow().limits;
        Ok(match reg {
            StatusReg::MaxWidth => limits.max_width,
            StatusReg::MaxHeight => limits.max_height,
            // The sim computes synchronously: nothing is ever mid-drain.
            StatusReg::RowsPending | StatusReg::ColsPending => 0,
            StatusReg::LaneCount => limits.lane_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_count_interior_hits_cap() {
        assert_eq!(escape_count((0.0, 0.0), (0.0, 0.0), 500), 500);
        assert_eq!(escape_count((0.0, 0.0), (-1.0, 0.0), 500), 500);
    }

    #[test]
    fn escape_count_far_point_escapes_fast() {
        assert!(escape_count((0.0, 0.0), (2.0, 2.0), 500) < 3);
    }

    #[test]
    fn short_config_is_rejected() {
        let (mut tx, _rx, _regs) = sim_accelerator(SimLimits::default());
        assert!(matches!(
            tx.send(&[0u32; 10]),
            Err(ChannelError::Transfer(_))
        ));
    }

    #[test]
    fn recv_on_empty_queue_is_an_error() {
        let (_tx, mut rx, _regs) = sim_accelerator(SimLimits::default());
        let mut buf = [0u32; 4];
        assert!(rx.recv(&mut buf).is_err());
    }

    #[test]
    fn registers_report_the_configured_limits() {
        let (_tx, _rx, regs) = sim_accelerator(SimLimits {
            max_width: 100,
            max_height: 200,
            lane_count: 6,
        });
        assert_eq!(regs.read(StatusReg::MaxWidth).unwrap(), 100);
        assert_eq!(regs.read(StatusReg::MaxHeight).unwrap(), 200);
        assert_eq!(regs.read(StatusReg::LaneCount).unwrap(), 6);
        assert_eq!(regs.read(StatusReg::RowsPending).unwrap(), 0);
    }
}
