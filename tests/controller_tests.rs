//! Integration tests for the controller-facing flow

use fieldlink::{
    codec::{decode, encode, Decoded, DeviceAction, QueryKind},
    config::BrokerConfig,
    controller::FieldController,
    device::{DeviceRegistration, DeviceType, RegistrationError},
    hal::MockLink,
    ConnectionState, DeviceEvent,
};

const TOPIC: &str = "9876543210_TTMA3R3P";

fn registration() -> DeviceRegistration {
    DeviceRegistration::new("9876543210", "Field1", DeviceType::Ttma3r3p).unwrap()
}

fn connected_controller() -> FieldController<MockLink> {
    let mut ctl = FieldController::new(MockLink::new(), BrokerConfig::default());
    ctl.register(registration(), 0).unwrap();
    ctl
}

#[test]
fn register_toggle_confirm_scenario() {
    // Register {9876543210, Field1, TTMA3R3P} -> topic 9876543210_TTMA3R3P
    let mut ctl = FieldController::new(MockLink::new(), BrokerConfig::default());
    let topic = ctl.register(registration(), 0).unwrap();
    assert_eq!(topic.as_str(), TOPIC);
    assert_eq!(ctl.connection_state(), ConnectionState::Connected);

    // Toggle motor on -> "101" published to that topic
    ctl.toggle(TOPIC, DeviceAction::Motor, true).unwrap();
    assert_eq!(ctl.link_mut().published_to(TOPIC), vec![b"101".as_slice()]);
    assert!(ctl.state(TOPIC).unwrap().motor_on);

    // Starter confirms off -> motor_on flips back to false
    ctl.link_mut().queue_message(TOPIC, b"100".to_vec());
    ctl.poll(50);
    assert!(!ctl.state(TOPIC).unwrap().motor_on);
}

#[test]
fn wire_bytes_match_the_command_table() {
    let mut ctl = connected_controller();

    ctl.toggle(TOPIC, DeviceAction::AutoMode, true).unwrap();
    ctl.toggle(TOPIC, DeviceAction::Overload, false).unwrap();
    ctl.toggle(TOPIC, DeviceAction::Lock, true).unwrap();

    assert_eq!(
        ctl.link_mut().published_to(TOPIC),
        vec![b"201".as_slice(), b"400".as_slice(), b"501".as_slice()]
    );

    // And what a starter echoes back decodes to the same meaning
    let echoed = encode(DeviceAction::Overload, false);
    assert_eq!(
        decode(echoed.code.as_bytes()).unwrap(),
        Decoded::Toggle {
            action: DeviceAction::Overload,
            on: false
        }
    );
}

#[test]
fn query_buttons_map_to_query_codes() {
    let mut ctl = connected_controller();

    ctl.query(QueryKind::PhaseCurrent).unwrap();
    ctl.query(QueryKind::Signal).unwrap();
    ctl.refresh().unwrap();

    assert_eq!(
        ctl.link_mut().published_to(TOPIC),
        vec![b"111".as_slice(), b"333".as_slice(), b"999".as_slice()]
    );
}

#[test]
fn invalid_registrations_never_bind() {
    let mut ctl = FieldController::new(MockLink::new(), BrokerConfig::default());

    let empty_owner = DeviceRegistration::new("", "Field1", DeviceType::Ttma3r3p);
    assert_eq!(empty_owner.unwrap_err(), RegistrationError::EmptyOwnerId);

    let empty_field = DeviceRegistration::new("9876543210", "", DeviceType::Ttma3r3p);
    assert_eq!(empty_field.unwrap_err(), RegistrationError::EmptyFieldName);

    // Nothing connected, nothing bound
    assert_eq!(ctl.connection_state(), ConnectionState::Disconnected);
    assert!(ctl.bound_topic().is_none());
    assert_eq!(ctl.link_mut().connect_calls, 0);
}

#[test]
fn observers_see_state_updates_and_raw_text() {
    let mut ctl = connected_controller();
    let rx = ctl.device_events();

    ctl.link_mut().queue_message(TOPIC, b"201".to_vec());
    ctl.link_mut().queue_message(TOPIC, b"SIGNAL 080%".to_vec());
    ctl.poll(10);

    let events: Vec<_> = rx.try_iter().collect();
    assert_eq!(events.len(), 2);
    match &events[0] {
        DeviceEvent::StateUpdated { topic, state } => {
            assert_eq!(topic.as_str(), TOPIC);
            assert!(state.auto_mode_on);
        }
        other => panic!("unexpected event {:?}", other),
    }
    match &events[1] {
        DeviceEvent::Raw { text, .. } => assert_eq!(text, "SIGNAL 080%"),
        other => panic!("unexpected event {:?}", other),
    }
}

#[test]
fn commands_from_any_device_card_go_to_the_bound_topic() {
    // The session carries one bound topic; a second device's toggles still
    // publish there, mirroring the deployed single-channel behavior.
    let mut ctl = connected_controller();
    let second =
        DeviceRegistration::new("5550001111", "Field2", DeviceType::Ttma3r3p).unwrap();
    let second_topic = ctl.register(second, 10).unwrap();

    ctl.toggle(second_topic.as_str(), DeviceAction::DryRun, true)
        .unwrap();

    // Local state is per-device...
    assert!(ctl.state(second_topic.as_str()).unwrap().dry_run);
    assert!(!ctl.state(TOPIC).unwrap().dry_run);
    // ...but the wire command went to the bound topic
    assert_eq!(ctl.link_mut().published_to(TOPIC), vec![b"301".as_slice()]);
    assert!(ctl.link_mut().published_to(second_topic.as_str()).is_empty());
}
