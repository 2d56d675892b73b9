//! Pin address translation.
//!
//! User-facing pin tokens come from the block menus: decimal digital lines
//! (`"0"`..`"13"`) and prefixed analog pins (`"A0"`..`"A5"`). The same
//! physical analog pin is addressed in two numeric spaces: the board's
//! unified line numbering (analog index plus [`ANALOG_BASE`]) used by
//! digital-capable operations, and the bare analog channel index used by
//! capability calls that expect an analog-channel number.
//!
//! Translation is pure and total over the declared menus. Whether a line
//! actually exists on the attached board is not checked here; the capability
//! object rejects that at call time.

// MIT License

use crate::{Error, Result};

/// First analog pin in the reference board's unified line numbering.
pub const ANALOG_BASE: u8 = 14;

/// Prefix marking an analog pin token.
pub const ANALOG_PREFIX: char = 'A';

/// Pin addressing kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinKind {
    Digital,
    Analog,
}

/// Normalized hardware pin address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinRef {
    pub kind: PinKind,
    pub index: u8,
}

impl PinRef {
    /// Parse a user-facing pin token.
    ///
    /// Returns [`Error::InvalidPinToken`] if the token is neither an analog
    /// form nor a decimal integer.
    pub fn parse(token: &str) -> Result<Self> {
        let token = token.trim();
        if let Some(rest) = token.strip_prefix(ANALOG_PREFIX) {
            let index = rest.parse::<u8>().map_err(|_| Error::InvalidPinToken)?;
            Ok(Self {
                kind: PinKind::Analog,
                index,
            })
        } else {
            let index = token.parse::<u8>().map_err(|_| Error::InvalidPinToken)?;
            Ok(Self {
                kind: PinKind::Digital,
                index,
            })
        }
    }

    /// Unified line number, with analog pins offset from `base`.
    pub fn line_from(&self, base: u8) -> u8 {
        match self.kind {
            PinKind::Digital => self.index,
            PinKind::Analog => base + self.index,
        }
    }

    /// Unified line number in the reference board's numbering.
    pub fn line(&self) -> u8 {
        self.line_from(ANALOG_BASE)
    }

    /// Analog channel index (no offset). For digital pins this is the line
    /// number itself.
    pub fn channel(&self) -> u8 {
        self.index
    }
}

/// Translate a pin token to a hardware number.
///
/// With `analog_indexed` set, analog tokens yield the bare channel index
/// instead of the offset line number.
pub fn translate(token: &str, analog_indexed: bool) -> Result<u8> {
    let pin = PinRef::parse(token)?;
    if analog_indexed {
        Ok(pin.channel())
    } else {
        Ok(pin.line())
    }
}
