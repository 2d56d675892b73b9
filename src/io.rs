//! Boundary traits for the transport/session and the hardware capability
//! object.
//!
//! This module contains the seams to the two external collaborators the
//! control plane talks through:
//!
//! - [`Transport`] / [`Connector`] - the serial session that frames bytes
//!   over a physical or virtual link. The core never assumes message
//!   boundaries beyond newline reassembly (see [`crate::protocol`]).
//! - [`Capability`] - the hardware-protocol facade offering pin I/O and I2C.
//!   Its byte-level wire encoding is out of scope here; the core only calls
//!   its methods.
//!
//! # Possible implementations
//!
//! - For desktop hosts: a serialport-backed session plus a firmata-style
//!   codec behind [`Capability`]
//! - For tests: in-memory queues recording writes and replaying replies

// MIT License

use crate::Result;

#[cfg(feature = "async")]
use async_trait::async_trait;

/// Outbound half of an open serial session.
///
/// `send` is fire-and-forget at this layer; delivery failures surface as
/// [`crate::Error::Io`]. Inbound bytes are pushed by the session owner into
/// [`crate::protocol::Reporter::feed`].
pub trait Transport {
    /// Send already-framed text down the link.
    fn send(&mut self, text: &str) -> Result<()>;

    /// Close the session. Further sends fail with
    /// [`crate::Error::NotConnected`].
    fn close(&mut self);
}

/// Session establishment.
///
/// Kept async because device enumeration and opening are slow paths on every
/// real backend; everything after `connect` is callback-driven.
#[cfg(feature = "async")]
#[async_trait(?Send)]
pub trait Connector {
    /// The session type produced on success.
    type Session: Transport;

    /// Open a session to the peripheral identified by `id`.
    ///
    /// Failures are reported upward as [`crate::Error::ConnectFailed`] and
    /// logged; they are never raised into block execution.
    async fn connect(&mut self, id: &str) -> Result<Self::Session>;
}

/// Pin mode constants understood by the capability object.
///
/// These are the wire values of the underlying hardware protocol, not the
/// user-facing menu values - see [`PinModeValue::from_user`] for the
/// mapping.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinModeValue {
    Input = 0,
    Output = 1,
    Analog = 2,
    Pwm = 3,
    Servo = 4,
    InputPullup = 11,
}

impl PinModeValue {
    /// Map a user-facing menu value {0: Input, 1: Output, 2: PullUp} to the
    /// capability constant.
    pub fn from_user(mode: u8) -> Option<Self> {
        match mode {
            0 => Some(PinModeValue::Input),
            1 => Some(PinModeValue::Output),
            2 => Some(PinModeValue::InputPullup),
            _ => None,
        }
    }
}

/// Callback invoked on every fresh sample of a subscribed digital pin.
pub type ReadCallback = Box<dyn FnMut(i32) + Send>;

/// Callback invoked once with a single analog sample.
pub type ReadOnceCallback = Box<dyn FnOnce(i32) + Send>;

/// Callback invoked once with the bytes of a single I2C read.
pub type I2cReadCallback = Box<dyn FnOnce(Vec<u8>) + Send>;

/// The hardware-control facade.
///
/// Methods are either synchronous fire-and-forget or callback-completing;
/// the adapter in [`crate::board`] bridges the callbacks into futures.
/// Implementations must tolerate repeated `i2c_config` calls.
pub trait Capability {
    /// Configure a pin's mode.
    fn pin_mode(&mut self, line: u8, mode: PinModeValue);

    /// Drive a digital line low (0) or high (non-zero).
    fn digital_write(&mut self, line: u8, value: u8);

    /// Drive a PWM-capable line with a duty value.
    fn analog_write(&mut self, line: u8, value: u16);

    /// Subscribe to a digital line. `cb` fires on every fresh sample for the
    /// rest of the session.
    fn digital_read(&mut self, line: u8, cb: ReadCallback);

    /// Sample an analog channel once. `cb` fires with exactly one value.
    fn analog_read(&mut self, channel: u8, cb: ReadOnceCallback);

    /// Enable the I2C peripheral. Harmless when already enabled.
    fn i2c_config(&mut self);

    /// Write `data` to the device at `addr`.
    fn i2c_write(&mut self, addr: u8, data: &[u8]);

    /// Read `len` bytes from `register` of the device at `addr`; `cb` fires
    /// once with the byte sequence.
    fn i2c_read_once(&mut self, addr: u8, register: u8, len: usize, cb: I2cReadCallback);

    /// Release the device at `addr`.
    fn i2c_stop(&mut self, addr: u8);
}
