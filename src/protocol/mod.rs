//! Legacy textual line protocol.
//!
//! The first transport generation spoke whitespace-delimited command lines:
//! requests `"M<code> <args>\r\n"`, replies as whitespace-delimited tokens
//! with the integer payload at a code-dependent position. This module keeps
//! that path alive: [`LineAssembler`] turns arbitrarily-chunked inbound
//! bytes into discrete lines, [`decode`] extracts a reply value, and
//! [`Request`] formats outbound frames.
//!
//! See [`Reporter`] for the write/reply correlation layer on top.

// MIT License

use std::fmt;

pub mod report;

pub use report::Reporter;

/// Reassembles newline-terminated lines from arbitrarily-chunked input.
///
/// Fragments are never lost, partial lines are never yielded, and arrival
/// order is preserved. A trailing partial line stays buffered for the next
/// feed.
#[derive(Debug, Default)]
pub struct LineAssembler {
    residual: String,
}

impl LineAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and drain every complete line it completes.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.residual.push_str(&String::from_utf8_lossy(bytes));
        let mut lines = Vec::new();
        while let Some(pos) = self.residual.find('\n') {
            let line = self.residual[..pos].to_string();
            self.residual.drain(..=pos);
            lines.push(line);
        }
        lines
    }
}

/// Decode one reply line to its integer payload.
///
/// `M3` and `M5` replies carry the payload in the third token, `M250` in the
/// second. Anything else - unknown command codes, short lines, non-numeric
/// payloads - decodes to 0 rather than failing. Firmware in the field
/// depends on that neutral-on-unknown policy, so it is preserved verbatim;
/// note it also masks genuinely corrupt replies as zero readings.
pub fn decode(line: &str) -> i32 {
    let tokens: Vec<&str> = line.trim().split_whitespace().collect();
    let Some(head) = tokens.first() else {
        return 0;
    };
    let payload = if head.contains("M3") {
        tokens.get(2)
    } else if head.contains("M5") {
        tokens.get(2)
    } else if head.contains("M250") {
        tokens.get(1)
    } else {
        None
    };
    payload
        .and_then(|token| token.parse::<i32>().ok())
        .unwrap_or(0)
}

/// Outbound request frame. `Display` emits the wire form, trailing `\r\n`
/// included. Pin fields are unified line numbers (see [`crate::pin`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    /// `M1` - configure a pin mode (user-facing mode value)
    PinMode { pin: u8, mode: u8 },
    /// `M2` - drive a digital line
    DigitalWrite { pin: u8, value: u8 },
    /// `M3` - sample a digital line
    DigitalRead { pin: u8 },
    /// `M4` - drive a PWM line
    AnalogWrite { pin: u8, value: u16 },
    /// `M5` - sample an analog line
    AnalogRead { pin: u8 },
    /// `M250` - trigger an ultrasonic ranging cycle
    Ultrasonic { trig: u8, echo: u8 },
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Request::PinMode { pin, mode } => write!(f, "M1 {pin} {mode}\r\n"),
            Request::DigitalWrite { pin, value } => write!(f, "M2 {pin} {value}\r\n"),
            Request::DigitalRead { pin } => write!(f, "M3 {pin}\r\n"),
            Request::AnalogWrite { pin, value } => write!(f, "M4 {pin} {value}\r\n"),
            Request::AnalogRead { pin } => write!(f, "M5 {pin}\r\n"),
            Request::Ultrasonic { trig, echo } => write!(f, "M250 {trig} {echo}\r\n"),
        }
    }
}
