//! Opcode dispatch for the block surface.
//!
//! Every opcode maps to a tagged handler variant: a live handler executing
//! against a [`Board`], or a compile-mode handler emitting text into a
//! [`CodeAssembly`]. Dispatch is an explicit table lookup through
//! [`handler_for`]; the two execution paths never run concurrently against
//! the same block instance.

// MIT License

use std::collections::HashMap;

use crate::board::{Board, map_range};
use crate::codegen::{CodeAssembly, Emitter, Snippet};
use crate::io::Capability;
use crate::promise::Promise;
use crate::{Error, Result};

/// Block opcodes surviving on the shared surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    PinMode,
    DigitalWrite,
    AnalogWrite,
    DigitalRead,
    AnalogRead,
    Led,
    Mapping,
    Ultrasonic,
    WireBegin,
    WireWrite,
    WireRead,
    WireEnd,
    WireEndRet,
    StringTypo,
    TypeCast,
    SerialAvailable,
}

impl Opcode {
    /// Parse the host runtime's opcode id.
    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "pinmode" => Some(Opcode::PinMode),
            "digitalwrite" => Some(Opcode::DigitalWrite),
            "analogwrite" => Some(Opcode::AnalogWrite),
            "digitalread" => Some(Opcode::DigitalRead),
            "analogread" => Some(Opcode::AnalogRead),
            "led" => Some(Opcode::Led),
            "mapping" => Some(Opcode::Mapping),
            "ultrasonic" => Some(Opcode::Ultrasonic),
            "wireBegin" => Some(Opcode::WireBegin),
            "wireWrite" => Some(Opcode::WireWrite),
            "wireRead" => Some(Opcode::WireRead),
            "wireEnd" => Some(Opcode::WireEnd),
            "wireEndRet" => Some(Opcode::WireEndRet),
            "stringtypo" => Some(Opcode::StringTypo),
            "typecast" => Some(Opcode::TypeCast),
            "serialavailable" => Some(Opcode::SerialAvailable),
            _ => None,
        }
    }
}

/// Opaque handle to a block instance in the host's program tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    pub id: u64,
    pub opcode: Opcode,
}

/// Widget argument values of a live invocation, keyed by argument name.
#[derive(Debug, Default, Clone)]
pub struct Args(HashMap<String, String>);

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, name: &str, value: &str) -> Self {
        self.0.insert(name.to_string(), value.to_string());
        self
    }

    /// Raw string value of `name`.
    pub fn str(&self, name: &str) -> Result<&str> {
        self.0
            .get(name)
            .map(String::as_str)
            .ok_or(Error::MissingArgument)
    }

    /// Numeric value of `name`. Non-numeric widget text coerces to zero,
    /// matching the host runtime's cast rules.
    pub fn num(&self, name: &str) -> Result<f64> {
        Ok(self.str(name)?.trim().parse().unwrap_or(0.0))
    }

    pub fn int(&self, name: &str) -> Result<i32> {
        Ok(self.num(name)? as i32)
    }
}

/// Result of a live handler.
pub enum LiveValue {
    /// Side effect only.
    None,
    Bool(bool),
    Text(String),
    /// Suspend: the block resolves when the promise does.
    Pending(Promise<i32>),
    /// Suspend: resolves with an I2C byte sequence.
    PendingBytes(Promise<Vec<u8>>),
}

/// Live handler: block arguments against a board.
pub type LiveFn<C> = fn(&mut Board<C>, &Args) -> Result<LiveValue>;

/// Compile-mode handler: emits a snippet, with side effects on the assembly.
pub type CodegenFn = fn(&mut CodeAssembly, &mut dyn Emitter, &Block) -> Snippet;

/// Tagged handler variant.
pub enum Handler<C: Capability> {
    Live(LiveFn<C>),
    Codegen(CodegenFn),
}

/// Execution model requested by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecMode {
    Live,
    Codegen,
}

/// Look up the handler for `opcode` under `mode`.
///
/// Not every opcode exists in both models: ultrasonic ranging is live only
/// on the legacy reporter path, and the string/cast/serial blocks only mean
/// something in generated source.
pub fn handler_for<C: Capability>(opcode: Opcode, mode: ExecMode) -> Option<Handler<C>> {
    match mode {
        ExecMode::Live => live_handler(opcode).map(Handler::Live),
        ExecMode::Codegen => codegen_handler(opcode).map(Handler::Codegen),
    }
}

fn live_handler<C: Capability>(opcode: Opcode) -> Option<LiveFn<C>> {
    match opcode {
        Opcode::PinMode => Some(live_pin_mode),
        Opcode::DigitalWrite | Opcode::Led => Some(live_digital_write),
        Opcode::AnalogWrite => Some(live_analog_write),
        Opcode::DigitalRead => Some(live_digital_read),
        Opcode::AnalogRead => Some(live_analog_read),
        Opcode::Mapping => Some(live_mapping),
        Opcode::WireBegin => Some(live_wire_begin),
        Opcode::WireWrite => Some(live_wire_write),
        Opcode::WireRead => Some(live_wire_read),
        Opcode::WireEnd | Opcode::WireEndRet => Some(live_wire_end),
        Opcode::Ultrasonic
        | Opcode::StringTypo
        | Opcode::TypeCast
        | Opcode::SerialAvailable => None,
    }
}

fn codegen_handler(opcode: Opcode) -> Option<CodegenFn> {
    match opcode {
        Opcode::PinMode => Some(gen_pin_mode),
        Opcode::DigitalWrite | Opcode::Led => Some(gen_digital_write),
        Opcode::AnalogWrite => Some(gen_analog_write),
        Opcode::DigitalRead => Some(gen_digital_read),
        Opcode::AnalogRead => Some(gen_analog_read),
        Opcode::Mapping => Some(gen_mapping),
        Opcode::Ultrasonic => Some(gen_ultrasonic),
        Opcode::WireBegin => Some(gen_wire_begin),
        Opcode::WireWrite => Some(gen_wire_write),
        Opcode::WireRead => Some(gen_wire_read),
        Opcode::WireEnd => Some(gen_wire_end),
        Opcode::WireEndRet => Some(gen_wire_end_ret),
        Opcode::StringTypo => Some(gen_string_typo),
        Opcode::TypeCast => Some(gen_type_cast),
        Opcode::SerialAvailable => Some(gen_serial_available),
    }
}

// Live handlers

fn live_pin_mode<C: Capability>(board: &mut Board<C>, args: &Args) -> Result<LiveValue> {
    board.set_pin_mode(args.str("PIN")?, args.int("MODE")? as u8)?;
    Ok(LiveValue::None)
}

fn live_digital_write<C: Capability>(board: &mut Board<C>, args: &Args) -> Result<LiveValue> {
    board.digital_write(args.str("PIN")?, args.int("VALUE")?)?;
    Ok(LiveValue::None)
}

fn live_analog_write<C: Capability>(board: &mut Board<C>, args: &Args) -> Result<LiveValue> {
    board.analog_write(args.str("PIN")?, args.int("VALUE")?)?;
    Ok(LiveValue::None)
}

fn live_digital_read<C: Capability>(board: &mut Board<C>, args: &Args) -> Result<LiveValue> {
    let value = board.digital_read(args.str("PIN")?)?;
    Ok(LiveValue::Bool(value != 0))
}

fn live_analog_read<C: Capability>(board: &mut Board<C>, args: &Args) -> Result<LiveValue> {
    Ok(LiveValue::Pending(board.analog_read(args.str("PIN")?)?))
}

fn live_mapping<C: Capability>(_board: &mut Board<C>, args: &Args) -> Result<LiveValue> {
    Ok(LiveValue::Text(map_range(
        args.num("VAL")?,
        args.num("FROMLOW")?,
        args.num("FROMHIGH")?,
        args.num("TOLOW")?,
        args.num("TOHIGH")?,
    )))
}

fn live_wire_begin<C: Capability>(board: &mut Board<C>, args: &Args) -> Result<LiveValue> {
    board.i2c_begin(args.str("ADDR")?)?;
    Ok(LiveValue::None)
}

fn live_wire_write<C: Capability>(board: &mut Board<C>, args: &Args) -> Result<LiveValue> {
    board.i2c_write(args.str("DATA")?.as_bytes())?;
    Ok(LiveValue::None)
}

fn live_wire_read<C: Capability>(board: &mut Board<C>, args: &Args) -> Result<LiveValue> {
    let len = args.int("LEN")?.max(0) as usize;
    Ok(LiveValue::PendingBytes(
        board.i2c_read(args.str("ADDR")?, len)?,
    ))
}

fn live_wire_end<C: Capability>(board: &mut Board<C>, _args: &Args) -> Result<LiveValue> {
    board.i2c_end()?;
    Ok(LiveValue::None)
}

// Compile-mode handlers

fn wire_common(assembly: &mut CodeAssembly) {
    assembly.add_include("wire", "#include <Wire.h>\n");
    assembly.add_setup("wire", "Wire.begin()");
}

fn gen_pin_mode(_assembly: &mut CodeAssembly, emitter: &mut dyn Emitter, block: &Block) -> Snippet {
    let pin = emitter.value_to_code(block, "PIN");
    let mode = emitter.value_to_code(block, "MODE");
    Snippet::Statement(format!("pinMode({pin}, {mode});"))
}

fn gen_digital_write(
    _assembly: &mut CodeAssembly,
    emitter: &mut dyn Emitter,
    block: &Block,
) -> Snippet {
    let pin = emitter.value_to_code(block, "PIN");
    let value = emitter.value_to_code(block, "VALUE");
    Snippet::Statement(format!("digitalWrite({pin}, {value});"))
}

fn gen_analog_write(
    _assembly: &mut CodeAssembly,
    emitter: &mut dyn Emitter,
    block: &Block,
) -> Snippet {
    let pin = emitter.value_to_code(block, "PIN");
    let value = emitter.value_to_code(block, "VALUE");
    Snippet::Statement(format!("analogWrite({pin}, {value});"))
}

fn gen_digital_read(
    _assembly: &mut CodeAssembly,
    emitter: &mut dyn Emitter,
    block: &Block,
) -> Snippet {
    let pin = emitter.value_to_code(block, "PIN");
    Snippet::Expression(format!("digitalRead({pin})"), 0)
}

fn gen_analog_read(
    _assembly: &mut CodeAssembly,
    emitter: &mut dyn Emitter,
    block: &Block,
) -> Snippet {
    let pin = emitter.value_to_code(block, "PIN");
    Snippet::Expression(format!("analogRead({pin})"), 0)
}

fn gen_mapping(_assembly: &mut CodeAssembly, emitter: &mut dyn Emitter, block: &Block) -> Snippet {
    let val = emitter.value_to_code(block, "VAL");
    let from_low = emitter.value_to_code(block, "FROMLOW");
    let from_high = emitter.value_to_code(block, "FROMHIGH");
    let to_low = emitter.value_to_code(block, "TOLOW");
    let to_high = emitter.value_to_code(block, "TOHIGH");
    Snippet::Expression(
        format!("map({val}, {from_low}, {from_high}, {to_low}, {to_high})"),
        0,
    )
}

fn gen_ultrasonic(assembly: &mut CodeAssembly, emitter: &mut dyn Emitter, block: &Block) -> Snippet {
    assembly.add_function(
        "ultrasonic",
        "float ultrasonic(int trig, int echo) {\n\
         \x20 pinMode(trig, OUTPUT);\n\
         \x20 digitalWrite(trig, LOW);\n\
         \x20 delayMicroseconds(2);\n\
         \x20 digitalWrite(trig, HIGH);\n\
         \x20 delayMicroseconds(10);\n\
         \x20 digitalWrite(trig, LOW);\n\
         \x20 pinMode(echo, INPUT);\n\
         \x20 return pulseIn(echo, HIGH, 20000) / 58.0;\n\
         }\n",
    );
    let trig = emitter.value_to_code(block, "TRIG");
    let echo = emitter.value_to_code(block, "ECHO");
    Snippet::Expression(format!("ultrasonic({trig}, {echo})"), 0)
}

fn gen_wire_begin(assembly: &mut CodeAssembly, emitter: &mut dyn Emitter, block: &Block) -> Snippet {
    wire_common(assembly);
    let addr = emitter.value_to_code(block, "ADDR");
    Snippet::Statement(format!("Wire.beginTransmission({addr});"))
}

fn gen_wire_write(
    _assembly: &mut CodeAssembly,
    emitter: &mut dyn Emitter,
    block: &Block,
) -> Snippet {
    let data = emitter.value_to_code(block, "DATA");
    Snippet::Statement(format!("Wire.write({data});"))
}

fn gen_wire_read(
    _assembly: &mut CodeAssembly,
    _emitter: &mut dyn Emitter,
    _block: &Block,
) -> Snippet {
    Snippet::Expression("Wire.read()".to_string(), 0)
}

fn gen_wire_end(
    _assembly: &mut CodeAssembly,
    _emitter: &mut dyn Emitter,
    _block: &Block,
) -> Snippet {
    Snippet::Statement("Wire.endTransmission();".to_string())
}

fn gen_wire_end_ret(
    _assembly: &mut CodeAssembly,
    _emitter: &mut dyn Emitter,
    _block: &Block,
) -> Snippet {
    Snippet::Expression("Wire.endTransmission()".to_string(), 0)
}

fn gen_string_typo(
    _assembly: &mut CodeAssembly,
    emitter: &mut dyn Emitter,
    block: &Block,
) -> Snippet {
    let text = emitter.value_to_code(block, "TEXT");
    let typo = emitter.value_to_code(block, "TYPO");
    Snippet::Expression(format!("String({text}, {typo})"), 0)
}

fn gen_type_cast(
    _assembly: &mut CodeAssembly,
    emitter: &mut dyn Emitter,
    block: &Block,
) -> Snippet {
    let value = emitter.value_to_code(block, "VALUE");
    let typo = emitter.value_to_code(block, "TYPO");
    Snippet::Expression(format!("{typo}({value})"), 0)
}

fn gen_serial_available(
    _assembly: &mut CodeAssembly,
    emitter: &mut dyn Emitter,
    block: &Block,
) -> Snippet {
    let serial = emitter.value_to_code(block, "SERIAL");
    Snippet::Expression(format!("{serial}.available()"), 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct LiteralEmitter;

    impl Emitter for LiteralEmitter {
        fn value_to_code(&mut self, block: &Block, arg: &str) -> String {
            format!("{arg}_{}", block.id)
        }

        fn statement_to_code(&mut self, _block: &Block, _branch: &str) -> String {
            String::new()
        }
    }

    fn run_codegen(opcode: Opcode, assembly: &mut CodeAssembly) -> Snippet {
        let handler = codegen_handler(opcode).unwrap();
        let block = Block { id: 1, opcode };
        handler(assembly, &mut LiteralEmitter, &block)
    }

    #[test]
    fn opcode_ids_round_trip() {
        for id in ["pinmode", "wireBegin", "stringtypo", "serialavailable"] {
            assert!(Opcode::from_id(id).is_some(), "{id}");
        }
        assert_eq!(Opcode::from_id("wirebegin"), None);
    }

    #[test]
    fn wire_begin_contributes_include_and_setup_once() {
        let mut assembly = CodeAssembly::new();
        let first = run_codegen(Opcode::WireBegin, &mut assembly);
        let second = run_codegen(Opcode::WireBegin, &mut assembly);
        assert_eq!(first, second);
        assert_eq!(
            first,
            Snippet::Statement("Wire.beginTransmission(ADDR_1);".to_string())
        );
        let sketch = assembly.finalize();
        assert_eq!(sketch.matches("#include <Wire.h>").count(), 1);
        assert_eq!(sketch.matches("Wire.begin();").count(), 1);
    }

    #[test]
    fn value_blocks_emit_precedence_tagged_expressions() {
        let mut assembly = CodeAssembly::new();
        assert_eq!(
            run_codegen(Opcode::TypeCast, &mut assembly),
            Snippet::Expression("TYPO_1(VALUE_1)".to_string(), 0)
        );
        assert_eq!(
            run_codegen(Opcode::SerialAvailable, &mut assembly),
            Snippet::Expression("SERIAL_1.available()".to_string(), 0)
        );
    }

    #[test]
    fn ultrasonic_registers_its_helper() {
        let mut assembly = CodeAssembly::new();
        let snippet = run_codegen(Opcode::Ultrasonic, &mut assembly);
        assert_eq!(
            snippet,
            Snippet::Expression("ultrasonic(TRIG_1, ECHO_1)".to_string(), 0)
        );
        let sketch = assembly.finalize();
        assert!(sketch.contains("float ultrasonic(int trig, int echo)"));
        assert!(sketch.contains("pulseIn(echo, HIGH, 20000)"));
    }

    #[test]
    fn args_coercion() {
        let args = Args::new().set("PIN", "A0").set("VALUE", "abc");
        assert_eq!(args.str("PIN"), Ok("A0"));
        assert_eq!(args.int("VALUE"), Ok(0));
        assert_eq!(args.str("MISSING"), Err(Error::MissingArgument));
    }
}
