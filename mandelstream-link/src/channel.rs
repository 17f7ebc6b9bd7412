use thiserror::Error;

/// Failures from the underlying transfer/register primitives.
///
/// The protocol layer performs no retry: a stalled hardware channel is not
/// self-healing, so these propagate unmodified to the caller.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("transfer failed: {0}")]
    Transfer(String),

    #[error("register read failed: {0}")]
    Register(String),

    #[error("packet of {got} words does not fit a {capacity}-word buffer")]
    Oversize { got: usize, capacity: usize },
}

/// Outbound word stream carrying configuration words to the accelerator.
///
/// `send` corresponds to a transfer-then-wait pair on the DMA primitive:
/// it enqueues the words and blocks until the hardware has accepted them.
/// Backpressure from a saturated command queue (bounded depth, on the
/// order of 1K words) is therefore implicit in the call.
pub trait TxChannel {
    fn send(&mut self, words: &[u32]) -> Result<(), ChannelError>;
}

/// Inbound word stream carrying iteration counts back to the host.
///
/// `recv` blocks until one complete packet has arrived. A packet shorter
/// than `buf` fills only the head of the buffer and leaves the tail
/// untouched; a packet longer than `buf` is an error.
pub trait RxChannel {
    fn recv(&mut self, buf: &mut [u32]) -> Result<(), ChannelError>;
}
