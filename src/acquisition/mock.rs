//! Scripted in-memory serial link for tests.
//!
//! [`pair`] returns a [`MockLink`] to hand to a port session and a [`MockDevice`]
//! kept by the test to feed bytes, inject faults, and observe whether the link
//! has been closed.
//!
//! # Example
//!
//! ```
//! use multiserial_logger::acquisition::{mock, SerialLink};
//!
//! let (mut link, device) = mock::pair();
//! device.send(b"12.3\n");
//! assert_eq!(link.bytes_available().unwrap(), 5);
//! assert_eq!(link.read_byte().unwrap(), Some(b'1'));
//! ```

use super::link::SerialLink;
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct MockState {
    incoming: VecDeque<u8>,
    fail_next: Option<io::ErrorKind>,
    fail_always: Option<io::ErrorKind>,
    end_of_stream: bool,
    closed: bool,
    reads: usize,
}

/// Application side of the mock: implements [`SerialLink`].
#[derive(Debug)]
pub struct MockLink {
    state: Arc<Mutex<MockState>>,
}

/// Test side of the mock.
#[derive(Debug, Clone)]
pub struct MockDevice {
    state: Arc<Mutex<MockState>>,
}

/// Create a connected link/device pair.
pub fn pair() -> (MockLink, MockDevice) {
    let state = Arc::new(Mutex::new(MockState::default()));
    (
        MockLink {
            state: Arc::clone(&state),
        },
        MockDevice { state },
    )
}

fn lock(state: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

impl MockLink {
    fn injected_fault(state: &mut MockState) -> Option<io::Error> {
        state
            .fail_always
            .or_else(|| state.fail_next.take())
            .map(|kind| io::Error::new(kind, "injected mock fault"))
    }
}

impl SerialLink for MockLink {
    fn bytes_available(&mut self) -> io::Result<usize> {
        let mut state = lock(&self.state);
        if let Some(err) = Self::injected_fault(&mut state) {
            return Err(err);
        }
        if state.end_of_stream && state.incoming.is_empty() {
            // A vanished channel still reports readiness so the read can observe EOF.
            return Ok(1);
        }
        Ok(state.incoming.len())
    }

    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        let mut state = lock(&self.state);
        if let Some(err) = Self::injected_fault(&mut state) {
            return Err(err);
        }
        state.reads += 1;
        match state.incoming.pop_front() {
            Some(byte) => Ok(Some(byte)),
            None if state.end_of_stream => Ok(None),
            None => Err(io::Error::new(io::ErrorKind::TimedOut, "mock read timed out")),
        }
    }
}

impl Drop for MockLink {
    fn drop(&mut self) {
        lock(&self.state).closed = true;
    }
}

impl MockDevice {
    /// Queue bytes for the application to read.
    pub fn send(&self, bytes: &[u8]) {
        lock(&self.state).incoming.extend(bytes.iter().copied());
    }

    /// Fail the next link call with `kind`.
    pub fn fail_next(&self, kind: io::ErrorKind) {
        lock(&self.state).fail_next = Some(kind);
    }

    /// Fail every link call with `kind` until [`MockDevice::recover`].
    pub fn fail_always(&self, kind: io::ErrorKind) {
        lock(&self.state).fail_always = Some(kind);
    }

    /// Stop injecting persistent faults.
    pub fn recover(&self) {
        lock(&self.state).fail_always = None;
    }

    /// Simulate the device disappearing.
    pub fn unplug(&self) {
        self.fail_always(io::ErrorKind::NotFound);
    }

    /// Report end-of-stream once queued bytes are drained.
    pub fn hang_up(&self) {
        lock(&self.state).end_of_stream = true;
    }

    /// Bytes not yet read by the application.
    pub fn unread(&self) -> usize {
        lock(&self.state).incoming.len()
    }

    /// Number of `read_byte` calls that reached the byte queue.
    pub fn reads(&self) -> usize {
        lock(&self.state).reads
    }

    /// Whether the application has dropped its link.
    pub fn is_closed(&self) -> bool {
        lock(&self.state).closed
    }
}
