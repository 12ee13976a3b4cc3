//! Node-level behaviour shared by every variant: identity, dispatch, byte
//! arrays, error stack, reset and the current indicator.

use super::mock_hw::{load_config, make_board, make_load_node, make_load_node_on};

use regnode::config::NodeConfig;
use regnode::drivers::led::LedColor;
use regnode::error::NodeError;
use regnode::modules::load_control::{self, CONFIGURATION_0, CONTROL_1, STATUS_1};
use regnode::node::NodeState;
use regnode::node::RequestSource::{External, Internal};
use regnode::node::common::{
    CONTROL_0, CONTROL_0_MASK_BFC, CONTROL_0_MASK_MTRG, CONTROL_0_MASK_RTRG, ERROR_STACK, FLAGS_0,
    HW_VERSION, NODE_ID, STATUS_0, STATUS_0_MASK_BF, STATUS_0_MASK_ESF, SW_VERSION,
};
use regnode::node::field;
use regnode::ports::{AnalogChannel, AnalogError};
use regnode::power::{DomainState, PowerControl, PowerDomain};

// ── Identity ──────────────────────────────────────────────────

#[test]
fn identity_registers_after_init() {
    let mut node = make_load_node(false);
    assert_eq!(node.last_address(), usize::from(load_control::LAST));
    assert_eq!(node.read_register(External, NODE_ID).unwrap(), 0x0B00);
    assert_eq!(node.read_register(External, HW_VERSION).unwrap(), 0x0001);
    assert_eq!(node.read_register(External, SW_VERSION).unwrap(), 0x0100);
    assert_eq!(node.read_register(External, FLAGS_0).unwrap(), 1);
    let status = node.read_register(External, STATUS_0).unwrap();
    assert_eq!(field::read(status, STATUS_0_MASK_BF), 1);
    assert_eq!(field::read(status, STATUS_0_MASK_ESF), 0);
}

#[test]
fn addresses_past_the_layout_are_invalid() {
    let mut node = make_load_node(false);
    for addr in [load_control::LAST, 0x80, 0xFF] {
        assert_eq!(
            node.read_register(External, addr),
            Err(NodeError::InvalidAddress)
        );
        assert_eq!(
            node.write_register(Internal, addr, 0, u32::MAX),
            Err(NodeError::InvalidAddress)
        );
    }
}

#[test]
fn boot_flag_clears_on_request() {
    let mut node = make_load_node(false);
    node.write_register(External, CONTROL_0, CONTROL_0_MASK_BFC, CONTROL_0_MASK_BFC)
        .unwrap();
    let status = node.read_register(External, STATUS_0).unwrap();
    assert_eq!(field::read(status, STATUS_0_MASK_BF), 0);
    assert_eq!(
        node.read_register(Internal, CONTROL_0).unwrap() & CONTROL_0_MASK_BFC,
        0
    );
}

// ── Byte arrays ───────────────────────────────────────────────

#[test]
fn byte_array_touches_only_covered_bytes() {
    let mut node = make_load_node(false);
    node.write_register(Internal, STATUS_1, 0xAABB_CCDD, u32::MAX)
        .unwrap();
    node.write_register(Internal, CONTROL_1, 0x1111_1111, u32::MAX)
        .unwrap();

    node.write_byte_array(Internal, CONFIGURATION_0, &[1, 2, 3, 4, 5, 6])
        .unwrap();

    assert_eq!(
        node.read_register(Internal, CONFIGURATION_0).unwrap(),
        0x0403_0201
    );
    assert_eq!(node.read_register(Internal, STATUS_1).unwrap(), 0xAABB_0605);
    assert_eq!(node.read_register(Internal, CONTROL_1).unwrap(), 0x1111_1111);

    let mut out = [0u8; 6];
    node.read_byte_array(Internal, CONFIGURATION_0, &mut out)
        .unwrap();
    assert_eq!(out, [1, 2, 3, 4, 5, 6]);
}

#[test]
fn byte_array_bounds_are_checked_up_front() {
    let mut node = make_load_node(false);
    assert_eq!(
        node.write_byte_array(Internal, CONFIGURATION_0, &[]),
        Err(NodeError::NullParameter)
    );
    let mut empty = [0u8; 0];
    assert_eq!(
        node.read_byte_array(Internal, CONFIGURATION_0, &mut empty),
        Err(NodeError::NullParameter)
    );

    let last = load_control::LAST - 2;
    assert_eq!(
        node.write_byte_array(Internal, last, &[0xEE; 9]),
        Err(NodeError::InvalidAddress)
    );
    // Nothing was written before the overflow was detected.
    assert_eq!(
        node.read_register(Internal, last).unwrap(),
        (field::MV_ERROR << 16) | field::MV_ERROR
    );
    node.write_byte_array(Internal, last, &[0xEE; 8]).unwrap();
}

#[test]
fn external_byte_array_respects_access() {
    let mut node = make_load_node(false);
    assert_eq!(
        node.write_byte_array(External, STATUS_1, &[1, 2, 3, 4]),
        Err(NodeError::AccessViolation)
    );
}

// ── Error stack ───────────────────────────────────────────────

#[test]
fn error_stack_reports_oldest_failure_first() {
    let mut node = make_load_node(false);
    node.board_mut()
        .analog_mut()
        .fail(Some(AnalogChannel::VmcuMv));
    let first = node.write_register(External, CONTROL_0, CONTROL_0_MASK_MTRG, CONTROL_0_MASK_MTRG);
    assert_eq!(
        first,
        Err(NodeError::Analog(AnalogError::ConversionFailed(
            AnalogChannel::VmcuMv
        )))
    );
    node.board_mut()
        .analog_mut()
        .fail(Some(AnalogChannel::VinMv));
    node.write_register(External, CONTROL_0, CONTROL_0_MASK_MTRG, CONTROL_0_MASK_MTRG)
        .unwrap_err();
    assert_eq!(node.errors().len(), 2);

    let status = node.read_register(External, STATUS_0).unwrap();
    assert_eq!(field::read(status, STATUS_0_MASK_ESF), 1);

    let code = node.read_register(External, ERROR_STACK).unwrap();
    assert_eq!(
        NodeError::from_code(code as u16),
        Some(NodeError::Analog(AnalogError::ConversionFailed(
            AnalogChannel::VmcuMv
        )))
    );
    let code = node.read_register(External, ERROR_STACK).unwrap();
    assert_eq!(
        NodeError::from_code(code as u16),
        Some(NodeError::Analog(AnalogError::ConversionFailed(
            AnalogChannel::VinMv
        )))
    );
    assert_eq!(node.read_register(External, ERROR_STACK).unwrap(), 0);

    let status = node.read_register(External, STATUS_0).unwrap();
    assert_eq!(field::read(status, STATUS_0_MASK_ESF), 0);
}

#[test]
fn internal_read_does_not_pop_error_stack() {
    let mut node = make_load_node(false);
    node.board_mut()
        .analog_mut()
        .fail(Some(AnalogChannel::VmcuMv));
    node.write_register(External, CONTROL_0, CONTROL_0_MASK_MTRG, CONTROL_0_MASK_MTRG)
        .unwrap_err();
    node.read_register(Internal, ERROR_STACK).unwrap();
    node.refresh_all().unwrap();
    assert_eq!(node.errors().len(), 1);
}

// ── Reset trigger ─────────────────────────────────────────────

#[test]
fn reset_trigger_requests_one_software_reset() {
    let mut node = make_load_node(false);
    node.write_register(External, CONTROL_0, CONTROL_0_MASK_RTRG, CONTROL_0_MASK_RTRG)
        .unwrap();
    assert_eq!(node.board().system().resets(), 0);

    node.process(0).unwrap();
    assert_eq!(node.board().system().resets(), 1);
    assert_eq!(
        node.read_register(Internal, CONTROL_0).unwrap() & CONTROL_0_MASK_RTRG,
        0
    );

    node.process(1).unwrap();
    assert_eq!(node.board().system().resets(), 1);
}

// ── Current indicator ─────────────────────────────────────────

#[test]
fn indicator_blinks_color_of_measured_current() {
    let mut node = make_load_node(false);

    node.process(0).unwrap();
    assert_eq!(node.board().led().blinks, vec![(2000, LedColor::Yellow)]);
    assert_eq!(node.state(), NodeState::Running);
    assert_eq!(node.power().state(PowerDomain::Analog), DomainState::Off);

    node.process(5).unwrap();
    assert_eq!(node.board().led().blinks.len(), 1);

    node.board_mut()
        .analog_mut()
        .set(AnalogChannel::IoutUa, 2_500_000);
    node.process(10).unwrap();
    // Current is only re-sampled on the slow period.
    assert_eq!(node.board().led().blinks[1], (2000, LedColor::Yellow));

    node.process(60).unwrap();
    assert_eq!(node.board().led().blinks[2], (2000, LedColor::Blue));
}

#[test]
fn indicator_is_silent_without_input_power() {
    let mut node = make_load_node(false);
    node.board_mut()
        .analog_mut()
        .set(AnalogChannel::VinMv, 6000);

    node.process(0).unwrap();
    assert!(node.board().led().blinks.is_empty());
    // Input voltage only; current is not converted.
    assert_eq!(node.board().analog().conversions(), 1);
    assert_eq!(node.state(), NodeState::Idle);
}

#[test]
fn indicator_can_be_left_out() {
    let config = NodeConfig {
        iout_indicator: None,
        ..load_config(false)
    };
    let mut node = make_load_node_on(config, make_board());
    assert_eq!(node.read_register(External, FLAGS_0).unwrap(), 0);

    node.process(0).unwrap();
    assert!(node.board().led().blinks.is_empty());
    assert_eq!(node.board().analog().conversions(), 0);
}

#[test]
fn state_follows_led_activity() {
    let mut node = make_load_node(false);
    assert_eq!(node.state(), NodeState::Idle);
    node.process(0).unwrap();
    assert_eq!(node.state(), NodeState::Running);
    node.board_mut().led_mut().active = false;
    assert_eq!(node.state(), NodeState::Idle);
}

#[test]
fn failed_input_sample_silences_indicator() {
    let mut node = make_load_node(false);
    node.process(0).unwrap();
    node.process(5).unwrap();
    assert_eq!(node.board().led().blinks.len(), 2);

    node.board_mut()
        .analog_mut()
        .fail(Some(AnalogChannel::VinMv));
    assert!(node.process(60).is_err());
    // The last good reading no longer counts as powered.
    node.process(65).unwrap();
    node.process(70).unwrap();
    assert_eq!(node.board().led().blinks.len(), 2);

    node.board_mut().analog_mut().fail(None);
    node.process(120).unwrap();
    assert_eq!(node.board().led().blinks.len(), 3);
}

#[test]
fn indicator_failure_is_recorded() {
    let mut node = make_load_node(false);
    node.board_mut()
        .analog_mut()
        .fail(Some(AnalogChannel::VinMv));
    assert!(node.process(0).is_err());
    assert_eq!(node.errors().len(), 1);
    assert_eq!(node.power().state(PowerDomain::Analog), DomainState::Off);
}
