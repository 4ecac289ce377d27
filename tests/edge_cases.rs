//! Edge cases: malformed input, duplicate work, and odd orderings

use fieldlink::{
    codec::{decode, DecodeError, Decoded},
    config::BrokerConfig,
    controller::FieldController,
    device::{DeviceRegistration, DeviceType, RegistrationError},
    hal::MockLink,
    state::StateDelta,
    DeviceAction, DeviceState,
};

const TOPIC: &str = "9876543210_TTMA3R3P";

fn connected_controller() -> FieldController<MockLink> {
    let mut ctl = FieldController::new(MockLink::new(), BrokerConfig::default());
    let reg = DeviceRegistration::new("9876543210", "Field1", DeviceType::Ttma3r3p).unwrap();
    ctl.register(reg, 0).unwrap();
    ctl
}

#[test]
fn empty_inbound_payload_changes_nothing_and_does_not_crash() {
    let mut ctl = connected_controller();

    assert_eq!(decode(b""), Err(DecodeError::Malformed));

    ctl.link_mut().queue_message(TOPIC, b"".to_vec());
    ctl.poll(10);

    assert_eq!(ctl.state(TOPIC), Some(DeviceState::default()));
}

#[test]
fn binary_garbage_is_dropped() {
    let mut ctl = connected_controller();
    let rx = ctl.device_events();

    ctl.link_mut().queue_message(TOPIC, vec![0x00, 0xFF, 0x80, 0xFE]);
    ctl.poll(10);

    assert!(rx.try_recv().is_err());
    assert_eq!(ctl.state(TOPIC), Some(DeviceState::default()));
}

#[test]
fn duplicate_delivery_is_harmless() {
    // At-least-once delivery can hand us the same confirmation twice
    let mut ctl = connected_controller();

    ctl.link_mut().queue_message(TOPIC, b"101".to_vec());
    ctl.link_mut().queue_message(TOPIC, b"101".to_vec());
    ctl.poll(10);

    let state = ctl.state(TOPIC).unwrap();
    assert!(state.motor_on);
    let expected = DeviceState {
        motor_on: true,
        ..Default::default()
    };
    assert_eq!(state, expected);
}

#[test]
fn stale_confirmation_after_newer_toggle_still_wins_per_field() {
    // Last writer wins: a late "off" confirmation overwrites the local "on"
    let mut ctl = connected_controller();

    ctl.toggle(TOPIC, DeviceAction::Motor, true).unwrap();
    ctl.link_mut().queue_message(TOPIC, b"100".to_vec());
    ctl.poll(10);

    assert!(!ctl.state(TOPIC).unwrap().motor_on);
}

#[test]
fn confirmations_only_touch_their_own_field() {
    let mut ctl = connected_controller();
    ctl.toggle(TOPIC, DeviceAction::AutoMode, true).unwrap();

    ctl.link_mut().queue_message(TOPIC, b"501".to_vec());
    ctl.poll(10);

    let state = ctl.state(TOPIC).unwrap();
    assert!(state.locked);
    assert!(state.auto_mode_on, "unrelated field must survive");
}

#[test]
fn codes_with_leading_zeros_or_padding_variants() {
    // "100" toggles; "0100" and "10" are untabled text
    assert!(matches!(
        decode(b"100").unwrap(),
        Decoded::Toggle { on: false, .. }
    ));
    assert_eq!(decode(b"0100").unwrap(), Decoded::Text("0100"));
    assert_eq!(decode(b"10").unwrap(), Decoded::Text("10"));
}

#[test]
fn whitespace_padded_code_still_counts() {
    let mut ctl = connected_controller();
    ctl.link_mut().queue_message(TOPIC, b"101\r\n".to_vec());
    ctl.poll(10);
    assert!(ctl.state(TOPIC).unwrap().motor_on);
}

#[test]
fn message_on_foreign_topic_is_isolated() {
    let mut ctl = connected_controller();
    ctl.link_mut().queue_message("someoneelse_TTMA3R3P", b"101".to_vec());
    ctl.poll(10);

    assert_eq!(ctl.state(TOPIC), Some(DeviceState::default()));
    assert!(ctl.state("someoneelse_TTMA3R3P").is_none());
}

#[test]
fn registration_boundary_lengths() {
    // 10 chars is the documented limit; 11 is out
    assert!(DeviceRegistration::new("1234567890", "1234567890", DeviceType::Ttma3r3p).is_ok());
    assert_eq!(
        DeviceRegistration::new("12345678901", "x", DeviceType::Ttma3r3p).unwrap_err(),
        RegistrationError::OwnerIdTooLong
    );
}

#[test]
fn delta_with_no_fields_set_is_a_true_noop() {
    let mut ctl = connected_controller();
    ctl.toggle(TOPIC, DeviceAction::DryRun, true).unwrap();
    let before = ctl.state(TOPIC).unwrap();

    ctl.store().apply(TOPIC, &StateDelta::default());
    assert_eq!(ctl.state(TOPIC).unwrap(), before);
}

#[test]
fn disconnect_before_any_registration_is_silent() {
    let mut ctl = FieldController::new(MockLink::new(), BrokerConfig::default());
    let status = ctl.status_events();

    ctl.disconnect();
    ctl.disconnect();

    assert!(status.try_recv().is_err());
    assert_eq!(ctl.link_mut().disconnect_calls, 0);
}
