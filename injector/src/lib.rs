//! The write channel to the HID microcontroller: a serial device opened once
//! at startup, an ordered command queue with a fixed inter-command gap, and a
//! diagnostic reader for whatever the firmware prints back.

mod link;
mod queue;
mod stop;
#[cfg(test)]
mod test_support;

use async_trait::async_trait;
use formpilot_protocol::InjectorCommand;
use thiserror::Error;

pub use link::InjectorLink;
pub use queue::CommandQueue;
pub use queue::SerialSink;
pub use stop::EmergencyStop;

pub type Result<T> = std::result::Result<T, InjectorError>;

#[derive(Debug, Error)]
pub enum InjectorError {
    #[error("failed to open serial device {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: serialport::Error,
    },

    #[error("no serial device with a manufacturer matching {0:?}")]
    NotDetected(String),

    #[error("serial port enumeration failed: {0}")]
    Enumerate(#[from] serialport::Error),

    #[error("serial write failed: {0}")]
    Write(#[from] std::io::Error),

    #[error("refusing to send {0}: blocked key")]
    BlockedKey(String),

    #[error("command queue is closed")]
    QueueClosed,
}

/// The seam the motion and action engines write through. Production wires
/// this to the serial queue; tests record the lines instead.
#[async_trait]
pub trait CommandSink: Send + Sync {
    /// Enqueue a command behind the ordered pipeline and wait until it has
    /// been written and its gap has elapsed.
    async fn send(&self, command: InjectorCommand) -> Result<()>;

    /// Write a `MOVE` delta directly. Callers must hold the sequencer so the
    /// stream stays ordered; everything else goes through `send`.
    fn write_move(&self, dx: i32, dy: i32) -> Result<()>;
}
