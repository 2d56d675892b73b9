//! Live control-plane adapter.
//!
//! [`Board`] sits between block invocations and the hardware capability
//! object. It translates pin tokens, tracks per-pin mode and last confirmed
//! reading so redundant configuration is skipped, brackets I2C traffic in a
//! begin/end transaction, and bridges the capability's callback completions
//! into [`crate::promise::Promise`] futures for blocks that suspend.
//!
//! Pin state is created lazily on first touch and lives for the session.
//! The state table sits behind an `Arc<Mutex>` solely so capability
//! callbacks can deposit confirmed samples into it; there is still a single
//! logical thread of control per board.

// MIT License

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use crate::io::{Capability, PinModeValue};
use crate::pin::{ANALOG_BASE, PinRef};
use crate::promise::{Promise, promise};
use crate::{Error, Result};

/// Board-level knobs. The default matches the reference Uno-style board.
#[derive(Debug, Clone)]
pub struct BoardConfig {
    /// First analog pin in the unified line numbering.
    pub analog_base: u8,
    /// Capability mode used for analog (PWM) output.
    pub pwm_mode: PinModeValue,
    /// Ceiling for analog write duty values.
    pub analog_write_max: u16,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            analog_base: ANALOG_BASE,
            pwm_mode: PinModeValue::Pwm,
            analog_write_max: 255,
        }
    }
}

/// Cached mode of a pin, as last commanded by this adapter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PinMode {
    #[default]
    Unset,
    Input,
    Output,
    PullUp,
    Analog,
}

impl PinMode {
    fn capability_value(self) -> Option<PinModeValue> {
        match self {
            PinMode::Unset => None,
            PinMode::Input => Some(PinModeValue::Input),
            PinMode::Output => Some(PinModeValue::Output),
            PinMode::PullUp => Some(PinModeValue::InputPullup),
            PinMode::Analog => Some(PinModeValue::Pwm),
        }
    }

    fn from_user(mode: u8) -> Result<Self> {
        match mode {
            0 => Ok(PinMode::Input),
            1 => Ok(PinMode::Output),
            2 => Ok(PinMode::PullUp),
            _ => Err(Error::InvalidMode),
        }
    }
}

/// Per-pin record, created lazily on first touch.
#[derive(Debug, Clone, Copy, Default)]
pub struct PinState {
    /// Last commanded mode.
    pub mode: PinMode,
    /// Last reading confirmed by a capability callback.
    pub last_value: i32,
    /// Whether a standing digital-read subscription exists.
    subscribed: bool,
}

type PinTable = Arc<Mutex<HashMap<u8, PinState>>>;

fn lock(table: &PinTable) -> MutexGuard<'_, HashMap<u8, PinState>> {
    table.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Open I2C bracket. At most one per board instance.
#[derive(Debug, Clone, Copy)]
struct I2cTransaction {
    address: u8,
}

/// Live adapter over a capability object.
pub struct Board<C: Capability> {
    capability: C,
    config: BoardConfig,
    pins: PinTable,
    transaction: Option<I2cTransaction>,
}

impl<C: Capability> Board<C> {
    /// Wrap a capability object with default configuration.
    pub fn new(capability: C) -> Self {
        Self::with_config(capability, BoardConfig::default())
    }

    pub fn with_config(capability: C, config: BoardConfig) -> Self {
        Self {
            capability,
            config,
            pins: Arc::new(Mutex::new(HashMap::new())),
            transaction: None,
        }
    }

    fn line(&self, token: &str) -> Result<u8> {
        Ok(PinRef::parse(token)?.line_from(self.config.analog_base))
    }

    fn cached_mode(&self, line: u8) -> PinMode {
        lock(&self.pins).get(&line).map(|s| s.mode).unwrap_or_default()
    }

    fn set_cached_mode(&self, line: u8, mode: PinMode) {
        lock(&self.pins).entry(line).or_default().mode = mode;
    }

    /// Last reading confirmed for `line`, if the pin has been touched.
    pub fn last_value(&self, line: u8) -> Option<i32> {
        lock(&self.pins).get(&line).map(|s| s.last_value)
    }

    /// Configure a pin mode from the user-facing menu value {0, 1, 2}.
    pub fn set_pin_mode(&mut self, pin: &str, user_mode: u8) -> Result<()> {
        let line = self.line(pin)?;
        let mode = PinMode::from_user(user_mode)?;
        // from_user only yields Input/Output/PullUp, never Unset
        let value = mode.capability_value().ok_or(Error::InvalidMode)?;
        debug!("pin {line} mode -> {mode:?}");
        self.capability.pin_mode(line, value);
        self.set_cached_mode(line, mode);
        Ok(())
    }

    /// Drive a digital line. Non-zero coerces to high.
    ///
    /// A write on a pin whose cached mode is not Output transitions it to
    /// Output first. The source system had a variant that skipped this
    /// transition; the explicit path is the deliberate choice here.
    pub fn digital_write(&mut self, pin: &str, value: i32) -> Result<()> {
        let line = self.line(pin)?;
        if self.cached_mode(line) != PinMode::Output {
            self.capability.pin_mode(line, PinModeValue::Output);
            self.set_cached_mode(line, PinMode::Output);
        }
        let level = u8::from(value != 0);
        trace!("digital write {line} <- {level}");
        self.capability.digital_write(line, level);
        Ok(())
    }

    /// Drive a PWM-capable line with a duty value, clamped to the configured
    /// ceiling. Coerces the pin into the analog-output mode when the cached
    /// mode disagrees.
    pub fn analog_write(&mut self, pin: &str, value: i32) -> Result<()> {
        let line = self.line(pin)?;
        if self.cached_mode(line) != PinMode::Analog {
            self.capability.pin_mode(line, self.config.pwm_mode);
            self.set_cached_mode(line, PinMode::Analog);
        }
        let duty = value.clamp(0, i32::from(self.config.analog_write_max)) as u16;
        trace!("analog write {line} <- {duty}");
        self.capability.analog_write(line, duty);
        Ok(())
    }

    /// Report the latest cached sample of a digital line, synchronously.
    ///
    /// Fails with [`Error::PinModeUndefined`] if the pin was never
    /// configured. The first call registers a standing subscription with the
    /// capability object; until its first callback the cached value is the
    /// default zero, so the very first reading may be stale. Re-registration
    /// is a no-op.
    pub fn digital_read(&mut self, pin: &str) -> Result<i32> {
        let line = self.line(pin)?;
        let needs_subscription = {
            let mut pins = lock(&self.pins);
            let state = pins.entry(line).or_default();
            if state.mode == PinMode::Unset {
                return Err(Error::PinModeUndefined);
            }
            let first = !state.subscribed;
            state.subscribed = true;
            first
        };
        // Register outside the table lock: the capability may invoke the
        // callback synchronously with the current level.
        if needs_subscription {
            let pins = Arc::clone(&self.pins);
            self.capability.digital_read(
                line,
                Box::new(move |value| {
                    lock(&pins).entry(line).or_default().last_value = value;
                }),
            );
        }
        Ok(lock(&self.pins).get(&line).map(|s| s.last_value).unwrap_or(0))
    }

    /// Sample an analog pin once, suspending until the capability callback
    /// fires. No standing subscription is left behind.
    pub fn analog_read(&mut self, pin: &str) -> Result<Promise<i32>> {
        let pin = PinRef::parse(pin)?;
        let channel = pin.channel();
        let line = pin.line_from(self.config.analog_base);
        let (reading, resolver) = promise();
        let pins = Arc::clone(&self.pins);
        self.capability.analog_read(
            channel,
            Box::new(move |value| {
                lock(&pins).entry(line).or_default().last_value = value;
                resolver.resolve(value);
            }),
        );
        Ok(reading)
    }

    /// Open an I2C bracket to the device at `addr` (hex token, `0x` prefix
    /// optional). Re-issues `i2c_config`, which the capability contract
    /// keeps harmless on repetition.
    pub fn i2c_begin(&mut self, addr: &str) -> Result<()> {
        let address = parse_hex(addr)?;
        debug!("i2c begin {address:#04x}");
        self.capability.i2c_config();
        self.transaction = Some(I2cTransaction { address });
        Ok(())
    }

    /// Write bytes to the open transaction's target.
    pub fn i2c_write(&mut self, data: &[u8]) -> Result<()> {
        let transaction = self.transaction.ok_or(Error::NoOpenTransaction)?;
        self.capability.i2c_write(transaction.address, data);
        Ok(())
    }

    /// Read `len` bytes from `register` (hex token) of the open
    /// transaction's target, suspending until the single-shot callback
    /// fires.
    pub fn i2c_read(&mut self, register: &str, len: usize) -> Result<Promise<Vec<u8>>> {
        let transaction = self.transaction.ok_or(Error::NoOpenTransaction)?;
        let register = parse_hex(register)?;
        let (bytes, resolver) = promise();
        self.capability.i2c_read_once(
            transaction.address,
            register,
            len,
            Box::new(move |data| resolver.resolve(data)),
        );
        Ok(bytes)
    }

    /// Close the open bracket and release the target.
    pub fn i2c_end(&mut self) -> Result<()> {
        let transaction = self.transaction.take().ok_or(Error::NoOpenTransaction)?;
        debug!("i2c end {:#04x}", transaction.address);
        self.capability.i2c_stop(transaction.address);
        Ok(())
    }
}

/// Parse a hexadecimal address token, with or without a `0x` prefix.
fn parse_hex(token: &str) -> Result<u8> {
    let digits = token
        .trim()
        .strip_prefix("0x")
        .or_else(|| token.trim().strip_prefix("0X"))
        .unwrap_or_else(|| token.trim());
    u8::from_str_radix(digits, 16).map_err(|_| Error::InvalidAddress)
}

/// Linear range mapping, formatted to two decimal places.
///
/// `from_high == from_low` divides by zero and formats the resulting
/// infinity/NaN; accepted edge case, not guarded.
pub fn map_range(value: f64, from_low: f64, from_high: f64, to_low: f64, to_high: f64) -> String {
    let mapped = (value - from_low) * (to_high - to_low) / (from_high - from_low) + to_low;
    format!("{mapped:.2}")
}
