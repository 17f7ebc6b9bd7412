use crate::channel::ChannelError;

/// Read-only accelerator status registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusReg {
    /// Maximum tile width the kernels accept.
    MaxWidth,
    /// Maximum tile height the kernels accept.
    MaxHeight,
    /// Rows remaining in the computation currently draining.
    RowsPending,
    /// Columns remaining in the computation currently draining.
    ColsPending,
    /// Number of parallel kernel lanes; tile widths must be a multiple.
    LaneCount,
}

/// Register-read primitive exposed by the accelerator block.
pub trait RegisterFile {
    fn read(&self, reg: StatusReg) -> Result<u32, ChannelError>;
}

/// Typed queries against the accelerator's capability/status registers.
///
/// Purely read-only; failures are channel-read errors and propagate as-is.
#[derive(Debug)]
pub struct CapabilityProbe<R> {
    regs: R,
}

impl<R: RegisterFile> CapabilityProbe<R> {
    pub fn new(regs: R) -> Self {
        Self { regs }
    }

    pub fn max_tile_width(&self) -> Result<u32, ChannelError> {
        self.regs.read(StatusReg::MaxWidth)
    }

    pub fn max_tile_height(&self) -> Result<u32, ChannelError> {
        self.regs.read(StatusReg::MaxHeight)
    }

    pub fn rows_pending(&self) -> Result<u32, ChannelError> {
        self.regs.read(StatusReg::RowsPending)
    }

    pub fn cols_pending(&self) -> Result<u32, ChannelError> {
        self.regs.read(StatusReg::ColsPending)
    }

    /// Kernel lane count, the divisor tile widths are padded up to.
    pub fn lane_count(&self) -> Result<u32, ChannelError> {
        self.regs.read(StatusReg::LaneCount)
    }

    /// Whether the accelerator is still draining a previous computation.
    pub fn still_computing(&self) -> Result<bool, ChannelError> {
        Ok(self.rows_pending()? > 0 && self.cols_pending()? > 0)
    }
}
