#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::convert::Infallible;
use std::rc::Rc;

use embassy_time::{Duration, Instant};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorKind, ErrorType, InputPin, OutputPin};
use macropad::clock::Clock;
use macropad::controls::Reset;
use macropad::engine::{EngineState, MainLoop};
use macropad::hid::{HidError, HidKeyboard};
use macropad::pins::{gpio_number, PinError, PinProvider};
use macropad::storage::MemoryStorage;
use macropad::types::{Keycode, PinId};

// Init logger for tests
#[ctor::ctor]
pub fn init_log() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init();
}

pub const KC_A: u8 = 0x04;
pub const KC_B: u8 = 0x05;

/// Something the engine did to the outside world
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Press(u8),
    Release(u8),
    Delay(Duration),
    Reset,
}

/// Everything the fakes share: simulated time and what happened when
#[derive(Clone, Default)]
pub struct Bench {
    now_us: Rc<Cell<u64>>,
    timeline: Rc<RefCell<Vec<(u64, Event)>>>,
}

impl Bench {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.now_us.set(self.now_us.get() + by.as_micros());
    }

    pub fn now(&self) -> Instant {
        Instant::from_micros(self.now_us.get())
    }

    fn record(&self, event: Event) {
        self.timeline.borrow_mut().push((self.now_us.get(), event));
    }

    pub fn events(&self) -> Vec<Event> {
        self.timeline.borrow().iter().map(|(_, e)| e.clone()).collect()
    }

    /// Times (in ms) at which `keycode` was pressed
    pub fn press_times_ms(&self, keycode: u8) -> Vec<u64> {
        self.timeline
            .borrow()
            .iter()
            .filter(|(_, e)| *e == Event::Press(keycode))
            .map(|(t, _)| t / 1000)
            .collect()
    }

    pub fn clear(&self) {
        self.timeline.borrow_mut().clear();
    }

    pub fn clock(&self) -> ManualClock {
        ManualClock(self.clone())
    }

    pub fn delay(&self) -> FakeDelay {
        FakeDelay(self.clone())
    }

    pub fn keyboard(&self) -> RecordingHid {
        RecordingHid(self.clone())
    }

    pub fn resetter(&self) -> RecordingReset {
        RecordingReset(self.clone())
    }
}

// ===================================================================
// Time
// ===================================================================

pub struct ManualClock(Bench);

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.0.now()
    }
}

/// Records every delay and moves the shared clock forward by it
pub struct FakeDelay(Bench);

impl FakeDelay {
    fn sleep(&mut self, duration: Duration) {
        self.0.record(Event::Delay(duration));
        self.0.advance(duration);
    }
}

impl DelayNs for FakeDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.sleep(Duration::from_micros(u64::from(ns) / 1000));
    }

    fn delay_us(&mut self, us: u32) {
        self.sleep(Duration::from_micros(u64::from(us)));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.sleep(Duration::from_millis(u64::from(ms)));
    }
}

// ===================================================================
// Host-visible effects
// ===================================================================

pub struct RecordingHid(Bench);

impl HidKeyboard for RecordingHid {
    fn press(&mut self, keycode: Keycode) -> Result<(), HidError> {
        self.0.record(Event::Press(keycode.0));
        Ok(())
    }

    fn release(&mut self, keycode: Keycode) -> Result<(), HidError> {
        self.0.record(Event::Release(keycode.0));
        Ok(())
    }
}

pub struct RecordingReset(Bench);

impl Reset for RecordingReset {
    fn reset(&mut self) {
        self.0.record(Event::Reset);
    }
}

// ===================================================================
// GPIO
// ===================================================================

#[derive(Clone, Default)]
struct Line {
    level: Rc<Cell<bool>>,
    broken: Rc<Cell<bool>>,
}

pub struct FakeInput(Line);

impl ErrorType for FakeInput {
    type Error = ErrorKind;
}

impl InputPin for FakeInput {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        if self.0.broken.get() {
            return Err(ErrorKind::Other);
        }
        Ok(self.0.level.get())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|high| !high)
    }
}

pub struct FakeOutput(Line);

impl ErrorType for FakeOutput {
    type Error = Infallible;
}

impl OutputPin for FakeOutput {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.0.level.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.0.level.set(true);
        Ok(())
    }
}

/// A board whose buttons the test presses by name
#[derive(Default)]
pub struct FakePins {
    lines: HashMap<String, Line>,
    claimed: HashSet<String>,
}

impl FakePins {
    pub fn new() -> Self {
        Self::default()
    }

    fn line(&mut self, pin: &PinId) -> Result<Line, PinError> {
        if gpio_number(pin).is_none() {
            return Err(PinError::Invalid(pin.clone()));
        }
        Ok(self.lines.entry(pin.to_string()).or_default().clone())
    }

    fn known(&self, name: &str) -> &Line {
        self.lines
            .get(name)
            .unwrap_or_else(|| panic!("{name} was never opened"))
    }

    /// Assert a button; the line is created if nothing opened it yet.
    pub fn press(&mut self, name: &str) {
        self.lines.entry(name.to_string()).or_default().level.set(true);
    }

    pub fn release(&mut self, name: &str) {
        self.lines.entry(name.to_string()).or_default().level.set(false);
    }

    /// Make every read of `name` fail from now on.
    pub fn break_line(&mut self, name: &str) {
        self.known(name).broken.set(true);
    }

    /// Level last driven on an output
    pub fn level(&self, name: &str) -> bool {
        self.known(name).level.get()
    }

    pub fn is_claimed(&self, name: &str) -> bool {
        self.claimed.contains(name)
    }

    fn claim(&mut self, pin: &PinId) -> Result<Line, PinError> {
        let line = self.line(pin)?;
        if !self.claimed.insert(pin.to_string()) {
            return Err(PinError::InUse(pin.clone()));
        }
        Ok(line)
    }
}

impl PinProvider for FakePins {
    type Input = FakeInput;
    type Output = FakeOutput;

    fn input(&mut self, pin: &PinId) -> Result<Self::Input, PinError> {
        self.claim(pin).map(FakeInput)
    }

    fn output(&mut self, pin: &PinId, initial: bool) -> Result<Self::Output, PinError> {
        let line = self.claim(pin)?;
        line.level.set(initial);
        Ok(FakeOutput(line))
    }

    fn sample(&mut self, pin: &PinId) -> Result<bool, PinError> {
        if self.claimed.contains(pin.as_str()) {
            return Err(PinError::InUse(pin.clone()));
        }
        Ok(self.line(pin)?.level.get())
    }
}

// ===================================================================
// Engine harness
// ===================================================================

pub type TestLoop = MainLoop<RecordingHid, FakeDelay, ManualClock, MemoryStorage, RecordingReset>;
pub type TestState = EngineState<FakeInput, FakeOutput>;

pub fn main_loop(bench: &Bench, storage: MemoryStorage) -> TestLoop {
    MainLoop::new(
        bench.keyboard(),
        bench.delay(),
        bench.clock(),
        storage,
        bench.resetter(),
    )
}

/// Storage holding `config` as `config.json`
pub fn storage_with(config: &str) -> MemoryStorage {
    MemoryStorage::new().with_file("config.json", config)
}

/// Tick `count` times, `step` apart
pub fn tick_for(main_loop: &mut TestLoop, state: &mut TestState, bench: &Bench, count: usize, step: Duration) {
    for _ in 0..count {
        main_loop.tick(state).unwrap();
        bench.advance(step);
    }
}
