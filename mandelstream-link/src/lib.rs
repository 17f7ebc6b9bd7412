pub mod channel;
pub mod config;
pub mod engine;
pub mod error;
pub mod probe;
pub mod sim;

// Re-export primary types for convenience.
pub use channel::{ChannelError, RxChannel, TxChannel};
pub use config::{encode_config, packet_layout, TileCaps, TileConfig, CONFIG_WORDS};
pub use engine::StreamingEngine;
pub use error::LinkError;
pub use probe::{CapabilityProbe, RegisterFile, StatusReg};

/// Convenience result type for the link crate.
pub type Result<T> = std::result::Result<T, LinkError>;
