//! Configuration model
//!
//! The macropad is described by a JSON document read once at startup:
//!
//! ```json
//! {
//!   "controls": [ { "GPIO": "GP1", "control": "led" } ],
//!   "leds":     [ "GP2", "GP3" ],
//!   "keys":     [ { "GPIO": "GP0", "repeating": false,
//!                   "sequence": [ ["press", "A"], ["delay", 0.05], ["release", "A"] ] } ]
//! }
//! ```
//!
//! Loading happens in two passes. [`validate`] checks the shape of the raw
//! document and reports every problem it finds. Only a document that passes is
//! turned into a [`Configuration`], resolving keycodes and delays on the way.
//! The result is immutable; the engine never looks at the JSON again.

use alloc::string::{String, ToString};
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

use embassy_time::Duration;
use serde_json::{json, Map, Value};

use crate::constants::{CONFIG_FILE, CONFIG_MAX_SIZE};
use crate::controls::ControlAction;
use crate::keycode;
use crate::storage::{Storage, StorageError};
use crate::types::{MacroStep, PinId};

// ===================================================================
// Document Keys
// ===================================================================

const CONTROLS: &str = "controls";
const LEDS: &str = "leds";
const KEYS: &str = "keys";
const GPIO: &str = "GPIO";
const CONTROL: &str = "control";
const REPEATING: &str = "repeating";
const SEQUENCE: &str = "sequence";

const STEP_PRESS: &str = "press";
const STEP_RELEASE: &str = "release";
const STEP_DELAY: &str = "delay";

// ===================================================================
// Typed Model
// ===================================================================

/// Validated macropad configuration
#[derive(Clone, Debug, PartialEq)]
pub struct Configuration {
    pub controls: Vec<ControlSpec>,
    /// Indicator outputs, switched on at startup
    pub leds: Vec<PinId>,
    pub keys: Vec<KeySpec>,
}

/// A button bound to a macro sequence
#[derive(Clone, Debug, PartialEq)]
pub struct KeySpec {
    pub gpio: PinId,
    /// Re-fire the sequence while the button stays held
    pub repeating: bool,
    pub sequence: Vec<MacroStep>,
}

/// A button bound to a device action
#[derive(Clone, Debug, PartialEq)]
pub struct ControlSpec {
    pub gpio: PinId,
    /// Action name as written in the document
    pub control: String,
    /// `None` for names the firmware does not know; such controls are skipped
    pub action: Option<ControlAction>,
}

// ===================================================================
// Errors
// ===================================================================

/// One shape problem found by [`validate`]
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Violation {
    #[error("Config is not a dict")]
    NotAnObject,
    #[error("Missing an expected top level config key '{0}'. Expected: 'controls', 'leds', 'keys'")]
    MissingSection(&'static str),
    #[error("Config value '{0}' is not a list")]
    SectionNotArray(&'static str),
    #[error("Control {value} is not a dictionary")]
    ControlNotObject { index: usize, value: String },
    #[error("Control {index} is missing an expected key. Expected: 'GPIO', 'control'")]
    ControlMissingKey { index: usize },
    #[error("Control {value} does not have string values")]
    ControlNotStrings { index: usize, value: String },
    #[error("LED pin {value} is not a string")]
    LedNotString { index: usize, value: String },
    #[error("Key {value} is not a dictionary")]
    KeyNotObject { index: usize, value: String },
    #[error("Key {index} is missing an expected key. Expected: 'GPIO', 'repeating', 'sequence'")]
    KeyMissingKey { index: usize },
    #[error("Key {value} does not have expected value types")]
    KeyWrongTypes { index: usize, value: String },
    #[error("Command {value} of key {key} is not a list")]
    StepNotArray { key: usize, step: usize, value: String },
    #[error("Command list {value} of key {key} is not proper length")]
    StepWrongLength { key: usize, step: usize, value: String },
}

/// Every violation found in a rejected document, in document order
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Violations(pub Vec<Violation>);

impl Violations {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.as_slice() {
            [] => f.write_str("no violations"),
            [only] => write!(f, "{}", only),
            [first, rest @ ..] => write!(f, "{} (and {} more)", first, rest.len()),
        }
    }
}

/// Why a configuration could not be loaded
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// The document could not be read from storage
    #[error("Error trying to get config file: {0}")]
    Unreadable(#[from] StorageError),
    /// The document is not JSON
    #[error("Config file is invalid JSON: {0}")]
    NotJson(String),
    /// The document has the wrong shape
    #[error("Config is invalid: {0}")]
    Invalid(Violations),
    /// A press/release token is not a keycode by any interpretation
    #[error("Keycode {token} is invalid (key {key}, command {step})")]
    UnknownKeycode { key: usize, step: usize, token: String },
    /// A delay is not a non-negative number of seconds
    #[error("Delay {value} is invalid (key {key}, command {step})")]
    InvalidDelay { key: usize, step: usize, value: String },
}

// ===================================================================
// Validation
// ===================================================================

/// Check the shape of a raw configuration document.
///
/// The top-level checks stop at the first failure since nothing below them can
/// be inspected. Element checks run over the whole document so that every
/// problem is logged at once.
pub fn validate(document: &Value) -> Result<(), Violations> {
    let mut violations = Vec::new();

    let Some(root) = document.as_object() else {
        return Err(report(vec![Violation::NotAnObject]));
    };
    for name in [CONTROLS, LEDS, KEYS] {
        match root.get(name) {
            None | Some(Value::Null) => violations.push(Violation::MissingSection(name)),
            Some(Value::Array(_)) => {}
            Some(_) => violations.push(Violation::SectionNotArray(name)),
        }
    }
    if !violations.is_empty() {
        return Err(report(violations));
    }

    validate_controls(section(root, CONTROLS), &mut violations);
    validate_leds(section(root, LEDS), &mut violations);
    validate_keys(section(root, KEYS), &mut violations);

    if violations.is_empty() {
        Ok(())
    } else {
        Err(report(violations))
    }
}

fn validate_controls(controls: &[Value], violations: &mut Vec<Violation>) {
    for (index, control) in controls.iter().enumerate() {
        let Some(entry) = control.as_object() else {
            violations.push(Violation::ControlNotObject {
                index,
                value: control.to_string(),
            });
            continue;
        };
        match (present(entry, GPIO), present(entry, CONTROL)) {
            (Some(gpio), Some(action)) => {
                if !gpio.is_string() || !action.is_string() {
                    violations.push(Violation::ControlNotStrings {
                        index,
                        value: control.to_string(),
                    });
                }
            }
            _ => violations.push(Violation::ControlMissingKey { index }),
        }
    }
}

fn validate_leds(leds: &[Value], violations: &mut Vec<Violation>) {
    for (index, led) in leds.iter().enumerate() {
        if !led.is_string() {
            violations.push(Violation::LedNotString {
                index,
                value: led.to_string(),
            });
        }
    }
}

fn validate_keys(keys: &[Value], violations: &mut Vec<Violation>) {
    for (index, key) in keys.iter().enumerate() {
        let Some(entry) = key.as_object() else {
            violations.push(Violation::KeyNotObject {
                index,
                value: key.to_string(),
            });
            continue;
        };
        let (Some(gpio), Some(repeating), Some(sequence)) = (
            present(entry, GPIO),
            present(entry, REPEATING),
            present(entry, SEQUENCE),
        ) else {
            violations.push(Violation::KeyMissingKey { index });
            continue;
        };
        if !gpio.is_string() || !repeating.is_boolean() || !sequence.is_array() {
            violations.push(Violation::KeyWrongTypes {
                index,
                value: key.to_string(),
            });
        }
        let Some(steps) = sequence.as_array() else {
            continue;
        };
        for (step, command) in steps.iter().enumerate() {
            match command.as_array() {
                None => violations.push(Violation::StepNotArray {
                    key: index,
                    step,
                    value: command.to_string(),
                }),
                Some(pair) if pair.len() != 2 => violations.push(Violation::StepWrongLength {
                    key: index,
                    step,
                    value: command.to_string(),
                }),
                Some(_) => {}
            }
        }
    }
}

/// A key counts as absent when missing or `null`.
fn present<'a>(entry: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    entry.get(key).filter(|value| !value.is_null())
}

fn section<'a>(root: &'a Map<String, Value>, name: &str) -> &'a [Value] {
    root.get(name)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn report(violations: Vec<Violation>) -> Violations {
    for violation in &violations {
        error!("{}", violation);
    }
    Violations(violations)
}

// ===================================================================
// Loading
// ===================================================================

impl Configuration {
    /// Read and parse `config.json` from storage.
    pub fn load<S: Storage>(storage: &mut S) -> Result<Self, ConfigError> {
        let bytes = storage.read(CONFIG_FILE, CONFIG_MAX_SIZE)?;
        debug!("Read {} ({} bytes)", CONFIG_FILE, bytes.len());
        Self::from_slice(&bytes)
    }

    /// Parse a JSON document.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ConfigError> {
        let document: Value =
            serde_json::from_slice(bytes).map_err(|e| ConfigError::NotJson(e.to_string()))?;
        Self::from_value(&document)
    }

    /// Validate a parsed document and build the typed model.
    pub fn from_value(document: &Value) -> Result<Self, ConfigError> {
        validate(document).map_err(ConfigError::Invalid)?;
        let Some(root) = document.as_object() else {
            return Err(ConfigError::Invalid(Violations(vec![Violation::NotAnObject])));
        };

        let controls = section(root, CONTROLS)
            .iter()
            .map(parse_control)
            .collect();
        let leds = section(root, LEDS)
            .iter()
            .filter_map(Value::as_str)
            .map(PinId::from)
            .collect();
        let keys = section(root, KEYS)
            .iter()
            .enumerate()
            .map(|(index, key)| parse_key(index, key))
            .collect::<Result<Vec<_>, _>>()?;

        let config = Self {
            controls,
            leds,
            keys,
        };
        info!(
            "Configuration loaded: {} keys, {} controls, {} leds",
            config.keys.len(),
            config.controls.len(),
            config.leds.len()
        );
        Ok(config)
    }

    /// Render the model back into a document that loads to an equal value.
    ///
    /// Keycodes are written as decimal strings and delays in seconds.
    pub fn to_value(&self) -> Value {
        let controls: Vec<Value> = self
            .controls
            .iter()
            .map(|c| json!({ GPIO: c.gpio.as_str(), CONTROL: c.control.as_str() }))
            .collect();
        let leds: Vec<Value> = self.leds.iter().map(|led| json!(led.as_str())).collect();
        let keys: Vec<Value> = self
            .keys
            .iter()
            .map(|key| {
                let sequence: Vec<Value> = key.sequence.iter().map(step_to_value).collect();
                json!({ GPIO: key.gpio.as_str(), REPEATING: key.repeating, SEQUENCE: sequence })
            })
            .collect();
        json!({ CONTROLS: controls, LEDS: leds, KEYS: keys })
    }
}

fn parse_control(control: &Value) -> ControlSpec {
    let gpio = control.get(GPIO).and_then(Value::as_str).unwrap_or_default();
    let name = control.get(CONTROL).and_then(Value::as_str).unwrap_or_default();
    let action = ControlAction::from_name(name);
    if action.is_none() {
        warn!("Unknown control '{}' on {}, ignoring it", name, gpio);
    }
    ControlSpec {
        gpio: PinId::from(gpio),
        control: name.to_string(),
        action,
    }
}

fn parse_key(index: usize, key: &Value) -> Result<KeySpec, ConfigError> {
    let gpio = key.get(GPIO).and_then(Value::as_str).unwrap_or_default();
    let repeating = key.get(REPEATING).and_then(Value::as_bool).unwrap_or_default();
    let commands = key
        .get(SEQUENCE)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);

    let mut sequence = Vec::with_capacity(commands.len());
    for (step, command) in commands.iter().enumerate() {
        let pair = command.as_array().map(Vec::as_slice).unwrap_or(&[]);
        let [verb, token] = pair else {
            continue;
        };
        if let Some(parsed) = parse_step(index, step, verb, token)? {
            sequence.push(parsed);
        }
    }

    Ok(KeySpec {
        gpio: PinId::from(gpio),
        repeating,
        sequence,
    })
}

fn parse_step(
    key: usize,
    step: usize,
    verb: &Value,
    token: &Value,
) -> Result<Option<MacroStep>, ConfigError> {
    let unknown_keycode = || ConfigError::UnknownKeycode {
        key,
        step,
        token: token_text(token),
    };
    match verb.as_str() {
        Some(STEP_PRESS) => keycode::resolve(token)
            .map(|k| Some(MacroStep::Press(k)))
            .ok_or_else(unknown_keycode),
        Some(STEP_RELEASE) => keycode::resolve(token)
            .map(|k| Some(MacroStep::Release(k)))
            .ok_or_else(unknown_keycode),
        Some(STEP_DELAY) => parse_delay(token)
            .map(|d| Some(MacroStep::Delay(d)))
            .ok_or_else(|| ConfigError::InvalidDelay {
                key,
                step,
                value: token_text(token),
            }),
        _ => {
            warn!("Skipping unknown command {} in key {}", verb.to_string().as_str(), key);
            Ok(None)
        }
    }
}

fn parse_delay(token: &Value) -> Option<Duration> {
    let seconds = match token {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !seconds.is_finite() || seconds < 0.0 {
        return None;
    }
    Some(Duration::from_micros((seconds * 1_000_000.0 + 0.5) as u64))
}

fn step_to_value(step: &MacroStep) -> Value {
    match step {
        MacroStep::Press(k) => json!([STEP_PRESS, k.0.to_string()]),
        MacroStep::Release(k) => json!([STEP_RELEASE, k.0.to_string()]),
        MacroStep::Delay(d) => json!([STEP_DELAY, d.as_micros() as f64 / 1_000_000.0]),
    }
}

/// Strings are shown without their JSON quotes.
fn token_text(token: &Value) -> String {
    match token {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
