//! Instrument-facing side of the logger.
//!
//! - [`frame`]: turns a byte stream into terminated lines
//! - [`link`]: the [`SerialLink`] seam and the `serialport` implementation
//! - [`session`]: one open port with its frame reader
//! - [`mock`]: scripted link for tests

pub mod frame;
pub mod link;
pub mod mock;
pub mod session;

pub use frame::{FrameOverflow, FrameReader, MAX_FRAME_LEN};
pub use link::{open_port, DynLink, SerialLink};
pub use session::{PortSession, PortStatus};
