//! Low-voltage relay variant: bus control and battery management.

use super::mock_hw::make_relay_node;

use regnode::config::BmsConfig;
use regnode::error::NodeError;
use regnode::modules::relay::{
    CONTROL_1, CONTROL_1_MASK_RLST, FLAGS_1, FLAGS_1_MASK_BMSF, FLAGS_1_MASK_RLFH, STATUS_1,
};
use regnode::node::RequestSource::{External, Internal};
use regnode::node::field::{self, BitState};
use regnode::node::{Node, common};
use regnode::ports::AnalogChannel;
use regnode::power::{DomainState, PowerControl, PowerDomain};

#[test]
fn bus_switches_relay() {
    let mut node = make_relay_node(false, None);
    let flags = node.read_register(External, FLAGS_1).unwrap();
    assert_eq!(field::read(flags, FLAGS_1_MASK_BMSF), 0);
    assert_eq!(node.read_register(External, common::NODE_ID).unwrap() >> 8, 0x01);

    node.write_register(External, CONTROL_1, CONTROL_1_MASK_RLST, CONTROL_1_MASK_RLST)
        .unwrap();
    assert_eq!(node.adapter().output().calls, vec![true]);
    assert_eq!(
        node.read_register(External, STATUS_1).unwrap(),
        BitState::One as u32
    );
}

#[test]
fn forced_relay_refuses_bus_control() {
    let mut node = make_relay_node(true, None);
    let flags = node.read_register(External, FLAGS_1).unwrap();
    assert_eq!(field::read(flags, FLAGS_1_MASK_RLFH), 1);
    assert_eq!(
        node.write_register(External, CONTROL_1, CONTROL_1_MASK_RLST, CONTROL_1_MASK_RLST),
        Err(NodeError::ForcedHardwareConflict)
    );
    assert!(node.adapter().output().calls.is_empty());
}

#[test]
fn bms_applies_hysteresis_on_its_period() {
    let mut node = make_relay_node(false, Some(BmsConfig::default()));
    let flags = node.read_register(External, FLAGS_1).unwrap();
    assert_eq!(field::read(flags, FLAGS_1_MASK_BMSF), 1);

    // Above the high threshold: close.
    node.process(0).unwrap();
    assert_eq!(node.adapter().output().calls, vec![true]);
    assert_eq!(node.read_register(Internal, CONTROL_1).unwrap(), 1);
    assert_eq!(
        node.read_register(Internal, STATUS_1).unwrap(),
        BitState::One as u32
    );
    assert_eq!(node.power().state(PowerDomain::Analog), DomainState::Off);

    // Not due yet.
    node.board_mut()
        .analog_mut()
        .set(AnalogChannel::VcomMv, 9_000);
    node.process(30).unwrap();
    assert_eq!(node.adapter().output().calls.len(), 1);

    // Between thresholds: hold.
    node.board_mut()
        .analog_mut()
        .set(AnalogChannel::VcomMv, 11_000);
    node.process(60).unwrap();
    assert_eq!(node.adapter().output().calls.len(), 1);

    // Below the low threshold: open.
    node.board_mut()
        .analog_mut()
        .set(AnalogChannel::VcomMv, 9_000);
    node.process(120).unwrap();
    assert_eq!(node.adapter().output().calls, vec![true, false]);
    assert_eq!(node.read_register(Internal, CONTROL_1).unwrap(), 0);
    assert_eq!(
        node.read_register(Internal, STATUS_1).unwrap(),
        BitState::Zero as u32
    );
}

#[test]
fn bms_does_not_drive_a_forced_relay() {
    use super::mock_hw::{MockLoad, make_board, make_power};
    use regnode::config::{ModuleConfig, NodeConfig};
    use regnode::modules::RelayModule;

    let bms = Some(BmsConfig::default());
    let config = NodeConfig {
        module: ModuleConfig::Relay {
            forced_hardware: true,
            bms,
        },
        iout_indicator: None,
        ..NodeConfig::default()
    };
    let module = RelayModule::new(MockLoad::default(), true, bms);
    let mut node = Node::new(config, module, make_board(), make_power()).unwrap();
    node.init().unwrap();

    node.process(0).unwrap();
    assert!(node.adapter().output().calls.is_empty());
    assert_eq!(node.board().analog().conversions(), 0);
}
