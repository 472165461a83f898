pub mod common;

use embassy_time::Duration;
use macropad::config::{validate, ConfigError, Configuration, ControlSpec, KeySpec, Violation};
use macropad::controls::ControlAction;
use macropad::storage::{MemoryStorage, StorageError};
use macropad::types::{Keycode, MacroStep, PinId};
use serde_json::json;

const FULL: &str = r#"{
    "controls": [
        { "GPIO": "GP1", "control": "led" },
        { "GPIO": "GP2", "control": "program" },
        { "GPIO": "GP3", "control": "reboot" }
    ],
    "leds": [ "GP15", "LED" ],
    "keys": [
        { "GPIO": "GP0", "repeating": false,
          "sequence": [ ["press", "A"], ["delay", 0.05], ["release", "A"] ] },
        { "GPIO": "GP4", "repeating": true,
          "sequence": [ ["press", "LEFT_CONTROL"], ["press", "0x06"], ["release", "6"], ["release", 224] ] }
    ]
}"#;

#[test]
fn test_full_document() {
    let config = Configuration::from_slice(FULL.as_bytes()).unwrap();

    assert_eq!(
        config.controls,
        vec![
            ControlSpec {
                gpio: PinId::from("GP1"),
                control: "led".into(),
                action: Some(ControlAction::ToggleLeds),
            },
            ControlSpec {
                gpio: PinId::from("GP2"),
                control: "program".into(),
                action: Some(ControlAction::Program),
            },
            ControlSpec {
                gpio: PinId::from("GP3"),
                control: "reboot".into(),
                action: None,
            },
        ]
    );
    assert_eq!(config.leds, vec![PinId::from("GP15"), PinId::from("LED")]);
    assert_eq!(
        config.keys,
        vec![
            KeySpec {
                gpio: PinId::from("GP0"),
                repeating: false,
                sequence: vec![
                    MacroStep::Press(Keycode(0x04)),
                    MacroStep::Delay(Duration::from_millis(50)),
                    MacroStep::Release(Keycode(0x04)),
                ],
            },
            KeySpec {
                gpio: PinId::from("GP4"),
                repeating: true,
                sequence: vec![
                    MacroStep::Press(Keycode(0xE0)),
                    MacroStep::Press(Keycode(0x06)),
                    MacroStep::Release(Keycode(0x06)),
                    MacroStep::Release(Keycode(0xE0)),
                ],
            },
        ]
    );
}

#[test]
fn test_empty_sections_are_valid() {
    let config = Configuration::from_value(&json!({ "controls": [], "leds": [], "keys": [] })).unwrap();
    assert!(config.controls.is_empty());
    assert!(config.leds.is_empty());
    assert!(config.keys.is_empty());
}

#[test]
fn test_top_level_checks_short_circuit() {
    assert_eq!(validate(&json!([1, 2])).unwrap_err().0, vec![Violation::NotAnObject]);

    // element problems are not reported while a section is missing
    let missing_keys = json!({ "controls": [42], "leds": [] });
    assert_eq!(
        validate(&missing_keys).unwrap_err().0,
        vec![Violation::MissingSection("keys")]
    );

    let wrong_container = json!({ "controls": {}, "leds": [], "keys": "none" });
    assert_eq!(
        validate(&wrong_container).unwrap_err().0,
        vec![Violation::SectionNotArray("controls"), Violation::SectionNotArray("keys")]
    );
}

#[test]
fn test_every_element_violation_is_reported() {
    let document = json!({
        "controls": [
            "GP1",
            { "GPIO": "GP2" },
            { "GPIO": 2, "control": "led" }
        ],
        "leds": [ "GP3", 4 ],
        "keys": [
            { "GPIO": "GP5", "repeating": "yes", "sequence": [] },
            { "GPIO": "GP6", "sequence": [] },
            { "GPIO": "GP7", "repeating": false, "sequence": [ "press", ["press"], ["press", "A", 1] ] }
        ]
    });
    let violations = validate(&document).unwrap_err();
    assert_eq!(violations.len(), 9);
    assert!(!violations.is_empty());

    assert_eq!(
        violations.0,
        vec![
            Violation::ControlNotObject {
                index: 0,
                value: r#""GP1""#.into()
            },
            Violation::ControlMissingKey { index: 1 },
            Violation::ControlNotStrings {
                index: 2,
                value: r#"{"GPIO":2,"control":"led"}"#.into()
            },
            Violation::LedNotString {
                index: 1,
                value: "4".into()
            },
            Violation::KeyWrongTypes {
                index: 0,
                value: r#"{"GPIO":"GP5","repeating":"yes","sequence":[]}"#.into()
            },
            Violation::KeyMissingKey { index: 1 },
            Violation::StepNotArray {
                key: 2,
                step: 0,
                value: r#""press""#.into()
            },
            Violation::StepWrongLength {
                key: 2,
                step: 1,
                value: r#"["press"]"#.into()
            },
            Violation::StepWrongLength {
                key: 2,
                step: 2,
                value: r#"["press","A",1]"#.into()
            },
        ]
    );
    assert!(matches!(
        Configuration::from_value(&document),
        Err(ConfigError::Invalid(v)) if v == violations
    ));
}

#[test]
fn test_null_counts_as_missing() {
    let document = json!({
        "controls": [ { "GPIO": "GP1", "control": null } ],
        "leds": [],
        "keys": null
    });
    assert_eq!(
        validate(&document).unwrap_err().0,
        vec![Violation::MissingSection("keys")]
    );

    let document = json!({ "controls": [ { "GPIO": "GP1", "control": null } ], "leds": [], "keys": [] });
    assert_eq!(
        validate(&document).unwrap_err().0,
        vec![Violation::ControlMissingKey { index: 0 }]
    );
}

#[test]
fn test_unresolvable_keycode_names_the_step() {
    let document = json!({
        "controls": [], "leds": [],
        "keys": [ { "GPIO": "GP0", "repeating": false,
                    "sequence": [ ["press", "A"], ["release", "NOPE"] ] } ]
    });
    assert_eq!(
        Configuration::from_value(&document),
        Err(ConfigError::UnknownKeycode {
            key: 0,
            step: 1,
            token: "NOPE".into()
        })
    );

    let document = json!({
        "controls": [], "leds": [],
        "keys": [ { "GPIO": "GP0", "repeating": false, "sequence": [ ["press", 300] ] } ]
    });
    assert!(matches!(
        Configuration::from_value(&document),
        Err(ConfigError::UnknownKeycode { token, .. }) if token == "300"
    ));
}

#[test]
fn test_names_win_over_numbers() {
    let document = json!({
        "controls": [], "leds": [],
        "keys": [ { "GPIO": "GP0", "repeating": false,
                    "sequence": [ ["press", "F1"], ["press", "10"], ["press", "E0"] ] } ]
    });
    let config = Configuration::from_value(&document).unwrap();
    assert_eq!(
        config.keys[0].sequence,
        vec![
            MacroStep::Press(Keycode(0x3A)),
            MacroStep::Press(Keycode(10)),
            MacroStep::Press(Keycode(0xE0)),
        ]
    );
}

#[test]
fn test_delays() {
    let document = json!({
        "controls": [], "leds": [],
        "keys": [ { "GPIO": "GP0", "repeating": false,
                    "sequence": [ ["delay", 1], ["delay", "0.25"], ["delay", 0] ] } ]
    });
    let config = Configuration::from_value(&document).unwrap();
    assert_eq!(
        config.keys[0].sequence,
        vec![
            MacroStep::Delay(Duration::from_secs(1)),
            MacroStep::Delay(Duration::from_millis(250)),
            MacroStep::Delay(Duration::from_ticks(0)),
        ]
    );

    for bad in [json!(-0.5), json!("soon"), json!(true)] {
        let document = json!({
            "controls": [], "leds": [],
            "keys": [ { "GPIO": "GP0", "repeating": false, "sequence": [ ["delay", bad] ] } ]
        });
        assert!(
            matches!(
                Configuration::from_value(&document),
                Err(ConfigError::InvalidDelay { key: 0, step: 0, .. })
            ),
            "{bad}"
        );
    }
}

#[test]
fn test_unknown_commands_are_skipped() {
    let document = json!({
        "controls": [], "leds": [],
        "keys": [ { "GPIO": "GP0", "repeating": false,
                    "sequence": [ ["tap", "A"], ["press", "B"], [1, 2], ["release", "B"] ] } ]
    });
    let config = Configuration::from_value(&document).unwrap();
    assert_eq!(
        config.keys[0].sequence,
        vec![MacroStep::Press(Keycode(0x05)), MacroStep::Release(Keycode(0x05))]
    );
}

#[test]
fn test_round_trip() {
    let config = Configuration::from_slice(FULL.as_bytes()).unwrap();
    let rendered = config.to_value();

    validate(&rendered).unwrap();
    assert_eq!(Configuration::from_value(&rendered).unwrap(), config);
}

#[test]
fn test_load_from_storage() {
    let mut storage = MemoryStorage::new().with_file("config.json", FULL);
    let config = Configuration::load(&mut storage).unwrap();
    assert_eq!(config.keys.len(), 2);

    let mut empty = MemoryStorage::new();
    assert_eq!(
        Configuration::load(&mut empty),
        Err(ConfigError::Unreadable(StorageError::NotFound("config.json".into())))
    );

    let mut garbage = MemoryStorage::new().with_file("config.json", "{ keys: ");
    assert!(matches!(
        Configuration::load(&mut garbage),
        Err(ConfigError::NotJson(_))
    ));

    let mut huge = MemoryStorage::new().with_file("config.json", vec![b' '; 9000]);
    assert!(matches!(
        Configuration::load(&mut huge),
        Err(ConfigError::Unreadable(StorageError::TooLarge { .. }))
    ));
}
