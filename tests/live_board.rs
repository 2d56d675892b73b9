//! Live control-plane tests against a recording mock capability.

// MIT License

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};

use blocklink::blocks::{Args, ExecMode, Handler, LiveValue, Opcode, handler_for};
use blocklink::board::Board;
use blocklink::io::{Capability, I2cReadCallback, PinModeValue, ReadCallback, ReadOnceCallback};
use blocklink::promise::Promise;
use blocklink::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    PinMode(u8, PinModeValue),
    DigitalWrite(u8, u8),
    AnalogWrite(u8, u16),
    I2cConfig,
    I2cWrite(u8, Vec<u8>),
    I2cStop(u8),
}

#[derive(Default, Clone)]
struct MockCapability {
    calls: Arc<Mutex<Vec<Call>>>,
    digital_subs: Arc<Mutex<HashMap<u8, ReadCallback>>>,
    analog_reqs: Arc<Mutex<Vec<(u8, ReadOnceCallback)>>>,
    i2c_reads: Arc<Mutex<Vec<(u8, u8, usize, I2cReadCallback)>>>,
}

impl MockCapability {
    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Fire the standing digital subscription on `line` with `value`.
    fn push_digital_sample(&self, line: u8, value: i32) {
        let mut subs = self.digital_subs.lock().unwrap();
        let cb = subs.get_mut(&line).expect("no subscription on line");
        cb(value);
    }
}

impl Capability for MockCapability {
    fn pin_mode(&mut self, line: u8, mode: PinModeValue) {
        self.calls.lock().unwrap().push(Call::PinMode(line, mode));
    }

    fn digital_write(&mut self, line: u8, value: u8) {
        self.calls.lock().unwrap().push(Call::DigitalWrite(line, value));
    }

    fn analog_write(&mut self, line: u8, value: u16) {
        self.calls.lock().unwrap().push(Call::AnalogWrite(line, value));
    }

    fn digital_read(&mut self, line: u8, cb: ReadCallback) {
        let replaced = self.digital_subs.lock().unwrap().insert(line, cb);
        assert!(replaced.is_none(), "duplicate subscription on line {line}");
    }

    fn analog_read(&mut self, channel: u8, cb: ReadOnceCallback) {
        self.analog_reqs.lock().unwrap().push((channel, cb));
    }

    fn i2c_config(&mut self) {
        self.calls.lock().unwrap().push(Call::I2cConfig);
    }

    fn i2c_write(&mut self, addr: u8, data: &[u8]) {
        self.calls
            .lock()
            .unwrap()
            .push(Call::I2cWrite(addr, data.to_vec()));
    }

    fn i2c_read_once(&mut self, addr: u8, register: u8, len: usize, cb: I2cReadCallback) {
        self.i2c_reads.lock().unwrap().push((addr, register, len, cb));
    }

    fn i2c_stop(&mut self, addr: u8) {
        self.calls.lock().unwrap().push(Call::I2cStop(addr));
    }
}

fn poll_once<T>(promise: &mut Promise<T>) -> Poll<T> {
    let mut cx = Context::from_waker(Waker::noop());
    Pin::new(promise).poll(&mut cx)
}

#[test]
fn digital_read_requires_a_configured_mode() {
    let capability = MockCapability::default();
    let mut board = Board::new(capability);
    assert_eq!(board.digital_read("3"), Err(Error::PinModeUndefined));
}

#[test]
fn digital_read_is_cached_and_subscribes_once() {
    let capability = MockCapability::default();
    let handle = capability.clone();
    let mut board = Board::new(capability);

    board.set_pin_mode("3", 0).unwrap();
    // First read reports the default sample before any callback fired.
    assert_eq!(board.digital_read("3"), Ok(0));
    // Re-registration is a no-op; the mock would panic on a duplicate.
    assert_eq!(board.digital_read("3"), Ok(0));

    handle.push_digital_sample(3, 1);
    assert_eq!(board.digital_read("3"), Ok(1));
    assert_eq!(board.last_value(3), Some(1));
}

#[test]
fn digital_write_coerces_output_mode_once() {
    let capability = MockCapability::default();
    let handle = capability.clone();
    let mut board = Board::new(capability);

    board.digital_write("13", 5).unwrap();
    board.digital_write("13", 0).unwrap();

    assert_eq!(
        handle.calls(),
        vec![
            Call::PinMode(13, PinModeValue::Output),
            Call::DigitalWrite(13, 1),
            Call::DigitalWrite(13, 0),
        ]
    );
}

#[test]
fn digital_write_skips_coercion_when_already_output() {
    let capability = MockCapability::default();
    let handle = capability.clone();
    let mut board = Board::new(capability);

    board.set_pin_mode("13", 1).unwrap();
    board.digital_write("13", 1).unwrap();

    assert_eq!(
        handle.calls(),
        vec![
            Call::PinMode(13, PinModeValue::Output),
            Call::DigitalWrite(13, 1),
        ]
    );
}

#[test]
fn analog_write_clamps_and_sets_pwm_mode() {
    let capability = MockCapability::default();
    let handle = capability.clone();
    let mut board = Board::new(capability);

    board.analog_write("3", 300).unwrap();
    board.analog_write("3", -4).unwrap();

    assert_eq!(
        handle.calls(),
        vec![
            Call::PinMode(3, PinModeValue::Pwm),
            Call::AnalogWrite(3, 255),
            Call::AnalogWrite(3, 0),
        ]
    );
}

#[test]
fn pullup_maps_to_capability_constant() {
    let capability = MockCapability::default();
    let handle = capability.clone();
    let mut board = Board::new(capability);

    board.set_pin_mode("A1", 2).unwrap();
    assert_eq!(handle.calls(), vec![Call::PinMode(15, PinModeValue::InputPullup)]);
}

#[test]
fn analog_read_suspends_for_one_sample() {
    let capability = MockCapability::default();
    let handle = capability.clone();
    let mut board = Board::new(capability);

    let mut reading = board.analog_read("A0").unwrap();
    assert!(poll_once(&mut reading).is_pending());

    let (channel, cb) = handle.analog_reqs.lock().unwrap().pop().unwrap();
    assert_eq!(channel, 0, "analog reads address the bare channel index");
    cb(512);

    assert_eq!(poll_once(&mut reading), Poll::Ready(512));
    // The confirmed sample lands in the unified-line cache.
    assert_eq!(board.last_value(14), Some(512));
    // One invocation, one request; no standing subscription remains.
    assert!(handle.analog_reqs.lock().unwrap().is_empty());
}

#[test]
fn i2c_bracket_lifecycle() {
    let capability = MockCapability::default();
    let handle = capability.clone();
    let mut board = Board::new(capability);

    assert_eq!(board.i2c_write(b"abc"), Err(Error::NoOpenTransaction));

    board.i2c_begin("0x12").unwrap();
    board.i2c_write(b"abc").unwrap();

    let mut bytes = board.i2c_read("0x03", 6).unwrap();
    assert!(poll_once(&mut bytes).is_pending());
    let (addr, register, len, cb) = handle.i2c_reads.lock().unwrap().pop().unwrap();
    assert_eq!((addr, register, len), (0x12, 0x03, 6));
    cb(vec![1, 2, 3, 4, 5, 6]);
    assert_eq!(poll_once(&mut bytes), Poll::Ready(vec![1, 2, 3, 4, 5, 6]));

    board.i2c_end().unwrap();
    assert_eq!(board.i2c_end(), Err(Error::NoOpenTransaction));

    assert_eq!(
        handle.calls(),
        vec![
            Call::I2cConfig,
            Call::I2cWrite(0x12, b"abc".to_vec()),
            Call::I2cStop(0x12),
        ]
    );
}

#[test]
fn repeated_i2c_begin_reconfigures_harmlessly() {
    let capability = MockCapability::default();
    let handle = capability.clone();
    let mut board = Board::new(capability);

    board.i2c_begin("0x12").unwrap();
    board.i2c_begin("0x34").unwrap();
    board.i2c_write(&[9]).unwrap();

    assert_eq!(
        handle.calls(),
        vec![
            Call::I2cConfig,
            Call::I2cConfig,
            Call::I2cWrite(0x34, vec![9]),
        ]
    );
}

#[test]
fn dispatch_runs_live_handlers_by_lookup() {
    let capability = MockCapability::default();
    let handle = capability.clone();
    let mut board = Board::new(capability);

    let Some(Handler::Live(write)) = handler_for(Opcode::DigitalWrite, ExecMode::Live) else {
        panic!("digitalwrite must have a live handler");
    };
    let args = Args::new().set("PIN", "13").set("VALUE", "1");
    assert!(matches!(write(&mut board, &args), Ok(LiveValue::None)));
    assert!(handle.calls().contains(&Call::DigitalWrite(13, 1)));

    let Some(Handler::Live(mapping)) = handler_for(Opcode::Mapping, ExecMode::Live) else {
        panic!("mapping must have a live handler");
    };
    let args = Args::new()
        .set("VAL", "100")
        .set("FROMLOW", "0")
        .set("FROMHIGH", "255")
        .set("TOLOW", "0")
        .set("TOHIGH", "1024");
    match mapping(&mut board, &args) {
        Ok(LiveValue::Text(text)) => assert_eq!(text, "401.57"),
        _ => panic!("mapping must report formatted text"),
    }

    // Ultrasonic rides the legacy reporter path, not the capability object.
    assert!(handler_for::<MockCapability>(Opcode::Ultrasonic, ExecMode::Live).is_none());
}
