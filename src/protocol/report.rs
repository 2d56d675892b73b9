//! Report correlator - single-slot request/response matching for the legacy
//! line protocol.

// MIT License

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use crate::io::Transport;
#[cfg(feature = "async")]
use crate::io::Connector;
use crate::pin::translate;
use crate::promise::{Promise, Resolver, promise};
use crate::protocol::{LineAssembler, Request, decode};
use crate::Result;

/// Pairs one outstanding write with the next decoded reply line.
///
/// The transport carries at most one in-flight request, so correlation is a
/// single slot with no request id. Usage contract: callers serialize their
/// own reports - a second [`Reporter::report`] issued before the first
/// resolves silently replaces the armed slot, and the first caller's promise
/// never fires.
pub struct Reporter<T: Transport> {
    transport: T,
    lines: LineAssembler,
    pending: Option<Resolver<i32>>,
}

impl<T: Transport> Reporter<T> {
    /// Wrap an open session.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            lines: LineAssembler::new(),
            pending: None,
        }
    }

    /// Send raw text, completing the newline framing if absent.
    pub fn write(&mut self, text: &str) -> Result<()> {
        trace!("write: {text:?}");
        if text.ends_with('\n') {
            self.transport.send(text)
        } else {
            let mut framed = String::with_capacity(text.len() + 1);
            framed.push_str(text);
            framed.push('\n');
            self.transport.send(&framed)
        }
    }

    /// Send a command and arm the reply slot.
    ///
    /// The returned promise resolves with the decoded value of the next
    /// complete reply line. Any previously armed, unresolved slot is
    /// replaced and starves.
    pub fn report(&mut self, command: &str) -> Result<Promise<i32>> {
        self.write(command)?;
        let (reply, resolver) = promise();
        if self.pending.replace(resolver).is_some() {
            warn!("report issued while another was outstanding; earlier reply slot replaced");
        }
        Ok(reply)
    }

    /// Push inbound session bytes through reassembly and decoding.
    ///
    /// Each complete line resolves the armed slot if one exists; otherwise
    /// the reply is discarded.
    pub fn feed(&mut self, bytes: &[u8]) {
        for line in self.lines.feed(bytes) {
            let value = decode(&line);
            match self.pending.take() {
                Some(resolver) => {
                    trace!("reply {line:?} resolves to {value}");
                    resolver.resolve(value);
                }
                None => debug!("discarding unsolicited reply: {line:?}"),
            }
        }
    }

    /// Close the underlying session.
    pub fn close(&mut self) {
        self.transport.close();
    }

    // Typed wrappers over the M-code request set. Pin arguments are
    // user-facing tokens; translation failures surface before any I/O.

    /// `M1` - configure a pin mode (user-facing mode value 0/1/2).
    pub fn pin_mode(&mut self, pin: &str, mode: u8) -> Result<()> {
        let pin = translate(pin, false)?;
        self.write(&Request::PinMode { pin, mode }.to_string())
    }

    /// `M2` - drive a digital line.
    pub fn digital_write(&mut self, pin: &str, value: u8) -> Result<()> {
        let pin = translate(pin, false)?;
        self.write(&Request::DigitalWrite { pin, value }.to_string())
    }

    /// `M3` - sample a digital line; resolves with the reported level.
    pub fn digital_read(&mut self, pin: &str) -> Result<Promise<i32>> {
        let pin = translate(pin, false)?;
        self.report(&Request::DigitalRead { pin }.to_string())
    }

    /// `M4` - drive a PWM line.
    pub fn analog_write(&mut self, pin: &str, value: u16) -> Result<()> {
        let pin = translate(pin, false)?;
        self.write(&Request::AnalogWrite { pin, value }.to_string())
    }

    /// `M5` - sample an analog line; resolves with the reported reading.
    pub fn analog_read(&mut self, pin: &str) -> Result<Promise<i32>> {
        let pin = translate(pin, false)?;
        self.report(&Request::AnalogRead { pin }.to_string())
    }

    /// `M250` - ultrasonic ranging; resolves with the measured distance.
    pub fn ultrasonic(&mut self, trig: &str, echo: &str) -> Result<Promise<i32>> {
        let trig = translate(trig, false)?;
        let echo = translate(echo, false)?;
        self.report(&Request::Ultrasonic { trig, echo }.to_string())
    }
}

/// Open a session through `connector` and wrap it in a [`Reporter`].
///
/// Connection failures are logged and reported upward as
/// [`crate::Error::ConnectFailed`]; they never panic into block execution.
#[cfg(feature = "async")]
pub async fn connect<C: Connector>(connector: &mut C, id: &str) -> Result<Reporter<C::Session>> {
    match connector.connect(id).await {
        Ok(session) => {
            info!("peripheral {id} connected");
            Ok(Reporter::new(session))
        }
        Err(err) => {
            warn!("connect peripheral fail: {err:?}");
            Err(crate::Error::ConnectFailed)
        }
    }
}
