//! Serial link abstraction.
//!
//! The scheduler only needs two things from a connection: how many bytes are
//! waiting, and the next byte. [`SerialLink`] captures exactly that so the
//! acquisition loop can run against real hardware (`serialport`) or the scripted
//! [`MockLink`](super::mock::MockLink) in tests.

use crate::config::PortConfig;
#[cfg(feature = "instrument_serial")]
use crate::config::Parity;
use crate::error::{AppResult, LoggerError};
use std::io;
use std::time::Duration;
#[cfg(feature = "instrument_serial")]
use tracing::debug;

/// A byte-oriented connection to one instrument.
///
/// Dropping the link closes the connection.
pub trait SerialLink: Send {
    /// Bytes that can be read without blocking.
    fn bytes_available(&mut self) -> io::Result<usize>;

    /// Read one byte. `Ok(None)` means the channel reported end-of-stream.
    fn read_byte(&mut self) -> io::Result<Option<u8>>;
}

/// Type-erased link owned by a port session.
pub type DynLink = Box<dyn SerialLink>;

#[cfg(feature = "instrument_serial")]
impl SerialLink for Box<dyn serialport::SerialPort> {
    fn bytes_available(&mut self) -> io::Result<usize> {
        self.bytes_to_read()
            .map(|n| n as usize)
            .map_err(io::Error::from)
    }

    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        use std::io::Read;

        let mut byte = [0u8; 1];
        match self.read(&mut byte)? {
            0 => Ok(None),
            _ => Ok(Some(byte[0])),
        }
    }
}

/// Open and flush the serial port described by `config`.
///
/// `read_timeout` bounds each byte read once data is known to be present.
#[cfg(feature = "instrument_serial")]
pub fn open_port(config: &PortConfig, read_timeout: Duration) -> AppResult<DynLink> {
    use serialport::{ClearBuffer, DataBits, FlowControl, StopBits};

    let open_error = |source: io::Error| LoggerError::PortOpen {
        prefix: config.prefix.clone(),
        address: config.address.clone(),
        source,
    };

    let data_bits = match config.data_bits {
        5 => DataBits::Five,
        6 => DataBits::Six,
        7 => DataBits::Seven,
        _ => DataBits::Eight,
    };
    let stop_bits = match config.stop_bits {
        2 => StopBits::Two,
        _ => StopBits::One,
    };
    let parity = match config.parity {
        Parity::None => serialport::Parity::None,
        Parity::Even => serialport::Parity::Even,
        Parity::Odd => serialport::Parity::Odd,
    };

    let port = serialport::new(&config.address, config.baud_rate)
        .data_bits(data_bits)
        .parity(parity)
        .stop_bits(stop_bits)
        .flow_control(FlowControl::None)
        .timeout(read_timeout)
        .open()
        .map_err(|e| open_error(e.into()))?;

    port.clear(ClearBuffer::All)
        .map_err(|e| open_error(e.into()))?;
    debug!(prefix = %config.prefix, address = %config.address, "port opened and flushed");

    Ok(Box::new(port))
}

/// Open and flush the serial port described by `config`.
#[cfg(not(feature = "instrument_serial"))]
pub fn open_port(_config: &PortConfig, _read_timeout: Duration) -> AppResult<DynLink> {
    Err(LoggerError::SerialFeatureDisabled)
}
