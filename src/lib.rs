//! Control-plane crate for driving Arduino-style boards from a visual
//! block-programming environment.
//!
//! One block surface, two execution models:
//!
//! - **Live mode**: blocks drive hardware pins in real time through a
//!   capability object (the hardware-protocol facade) over a serial session.
//!   Fire-and-forget operations (pin mode, digital/analog write) complete
//!   immediately; sampling operations bridge the capability's callbacks into
//!   one-shot futures so a block can suspend until its value arrives.
//! - **Compile mode**: blocks are translated into source text for a
//!   standalone firmware sketch. Each block handler contributes include
//!   directives, one-time setup statements, and named helper functions to a
//!   shared accumulator, which merges them without duplication into a single
//!   emitted program.
//!
//! An earlier transport generation spoke a textual line protocol
//! (`M1`..`M250` command codes over newline-framed replies); that path is
//! kept alive as [`protocol`], with [`protocol::Reporter`] pairing each
//! outstanding request with the next decoded reply line.
//!
//! ## Modules
//!
//! - [`pin`] - pin token translation to hardware line numbers
//! - [`io`] - boundary traits: serial transport, session connector, and the
//!   hardware capability object
//! - [`promise`] - one-shot future used to suspend blocks on callbacks
//! - [`protocol`] - legacy line protocol: reassembly, decoding, and the
//!   single-slot report correlator
//! - [`board`] - live control-plane adapter over a capability object
//! - [`codegen`] - compile-mode code assembler and snippet model
//! - [`blocks`] - opcode-to-handler dispatch for both execution models
//!
//! ## Concurrency model
//!
//! A board instance is a single logical thread of control. Suspending
//! operations follow a single-outstanding-request discipline: the caller
//! (the block scheduler) awaits one block's resolution before starting
//! another that touches the same pin or transaction. No timeouts are
//! implemented at this layer; a transport that drops silently leaves the
//! pending future unresolved.
//!
//! ## Features
//!
//! Default features:
//! - `async` - Enable the async [`io::Connector`] session trait.

// MIT License

pub mod blocks;
pub mod board;
pub mod codegen;
pub mod io;
pub mod pin;
pub mod promise;
pub mod protocol;

/// Block operation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Pin token is neither an analog form ("A0") nor a decimal line number
    InvalidPinToken,
    /// Malformed hexadecimal I2C address or register token
    InvalidAddress,
    /// Pin mode value outside the user-facing {Input, Output, PullUp} set
    InvalidMode,
    /// Block invoked without a required argument
    MissingArgument,
    /// Read attempted on a pin whose mode was never configured
    PinModeUndefined,
    /// I2C operation outside a begin/end bracket
    NoOpenTransaction,
    /// No session is currently open
    NotConnected,
    /// Session establishment failed
    ConnectFailed,
    /// Transport-level I/O failure
    Io,
}

/// Type to represent the result of a block operation
pub type Result<T> = core::result::Result<T, Error>;
