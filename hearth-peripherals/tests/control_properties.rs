//! Property tests for the thermostat control core.

use std::time::{Duration, Instant};

use chrono::{TimeZone, Utc};
use hearth_peripherals::control::{ChannelState, ControlCore, Mode};
use proptest::prelude::*;

prop_compose! {
    fn arbitrary_mode()(variant in 0..3u8) -> Mode {
        match variant {
            0 => Mode::Off,
            1 => Mode::Heat,
            _ => Mode::Cool,
        }
    }
}

fn wire_name(mode: Mode) -> &'static str {
    match mode {
        Mode::Off => "OFF",
        Mode::Heat => "HEAT",
        Mode::Cool => "COOL",
    }
}

fn core_in(mode: Mode, setpoint: i32, now: Instant) -> ControlCore {
    let mut core = ControlCore::new(setpoint, now);
    while core.mode() != mode {
        core.toggle_mode();
    }
    core
}

proptest! {
    #[test]
    fn three_toggles_return_to_start(mode in arbitrary_mode(), setpoint in -500..500i32) {
        let mut core = core_in(mode, setpoint, Instant::now());
        for _ in 0..3 {
            core.toggle_mode();
        }
        prop_assert_eq!(core.mode(), mode);
        prop_assert_eq!(core.setpoint(), setpoint);
    }

    #[test]
    fn off_never_drives_indicators(temp in -100.0f64..200.0, setpoint in -500..500i32) {
        let core = core_in(Mode::Off, setpoint, Instant::now());
        let directive = core.compute_actuator_directive(temp);
        prop_assert_eq!(directive.primary, ChannelState::Off);
        prop_assert_eq!(directive.secondary, ChannelState::Off);
    }

    #[test]
    fn heat_fades_iff_below_setpoint(temp in -100.0f64..200.0, setpoint in -100..200i32) {
        let core = core_in(Mode::Heat, setpoint, Instant::now());
        let directive = core.compute_actuator_directive(temp);
        let expected = if temp < setpoint as f64 { ChannelState::Fading } else { ChannelState::Solid };
        prop_assert_eq!(directive.primary, expected);
        prop_assert_eq!(directive.secondary, ChannelState::Off);
    }

    #[test]
    fn cool_fades_iff_above_setpoint(temp in -100.0f64..200.0, setpoint in -100..200i32) {
        let core = core_in(Mode::Cool, setpoint, Instant::now());
        let directive = core.compute_actuator_directive(temp);
        let expected = if temp > setpoint as f64 { ChannelState::Fading } else { ChannelState::Solid };
        prop_assert_eq!(directive.primary, ChannelState::Off);
        prop_assert_eq!(directive.secondary, expected);
    }

    #[test]
    fn setpoint_steps_cancel_out(
        setpoint in prop_oneof![Just(i32::MIN), Just(i32::MAX), any::<i32>()],
        up_first in any::<bool>(),
    ) {
        let mut core = ControlCore::new(setpoint, Instant::now());
        if up_first {
            core.increase_setpoint();
            core.decrease_setpoint();
        } else {
            core.decrease_setpoint();
            core.increase_setpoint();
        }
        prop_assert_eq!(core.setpoint(), setpoint);
    }

    #[test]
    fn computations_are_repeatable(
        mode in arbitrary_mode(),
        setpoint in -100..200i32,
        temp in -100.0f64..200.0,
        secs in 0i64..2_000_000_000,
    ) {
        let core = core_in(mode, setpoint, Instant::now());
        let now = Utc.timestamp_opt(secs, 0).unwrap();
        prop_assert_eq!(core.compute_actuator_directive(temp), core.compute_actuator_directive(temp));
        prop_assert_eq!(core.compute_display_content(temp, &now), core.compute_display_content(temp, &now));
    }

    #[test]
    fn reports_only_after_interval(
        mode in arbitrary_mode(),
        interval_ms in 0u64..120_000,
        elapsed_ms in 0u64..240_000,
        temp in -100.0f64..200.0,
    ) {
        let start = Instant::now();
        let mut core = core_in(mode, 72, start);
        let interval = Duration::from_millis(interval_ms);
        let now = start + Duration::from_millis(elapsed_ms);

        let report = core.maybe_build_report(temp, now, interval);
        if elapsed_ms >= interval_ms {
            let report = report.expect("report due");
            prop_assert_eq!(report.mode, mode);
            prop_assert_eq!(report.setpoint, 72);
            prop_assert_eq!(core.last_report_time(), now);
            let payload = report.payload();
            let fields: Vec<&str> = payload.split(',').collect();
            prop_assert_eq!(fields.len(), 3);
            prop_assert_eq!(fields[0], wire_name(mode));
            prop_assert_eq!(fields[2], "72");
            let (_, decimals) = fields[1].split_once('.').expect("one decimal place");
            prop_assert_eq!(decimals.len(), 1);
            let shown: f64 = fields[1].parse().expect("numeric temperature");
            prop_assert!((shown - temp).abs() <= 0.05 + 1e-9, "{} shown as {}", temp, shown);
        } else {
            prop_assert!(report.is_none());
            prop_assert_eq!(core.last_report_time(), start);
        }
    }

    #[test]
    fn report_time_never_decreases(offsets in proptest::collection::vec(0u64..100, 1..20)) {
        let start = Instant::now();
        let mut core = ControlCore::new(72, start);
        let mut previous = core.last_report_time();
        for offset in offsets {
            core.maybe_build_report(70.0, start + Duration::from_secs(offset), Duration::from_secs(10));
            prop_assert!(core.last_report_time() >= previous);
            previous = core.last_report_time();
        }
    }
}

#[test]
fn cool_report_matches_wire_format() {
    let start = Instant::now();
    let mut core = core_in(Mode::Cool, 65, start);
    let report = core
        .maybe_build_report(68.04, start + Duration::from_secs(30), Duration::from_secs(30))
        .unwrap();
    assert_eq!(report.to_string(), "COOL,68.0,65");
}

#[test]
fn reports_carry_the_mode_name() {
    let start = Instant::now();
    let due = start + Duration::from_secs(30);
    let interval = Duration::from_secs(30);
    let expected = [
        (Mode::Off, "OFF,70.0,72"),
        (Mode::Heat, "HEAT,70.0,72"),
        (Mode::Cool, "COOL,70.0,72"),
    ];
    for (mode, payload) in expected {
        let mut core = core_in(mode, 72, start);
        let report = core.maybe_build_report(70.0, due, interval).unwrap();
        assert_eq!(report.payload(), payload);
    }
}
