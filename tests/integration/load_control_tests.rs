//! DC-DC load-control variant driven over the bus.

use super::mock_hw::{IOUT_UA, TMCU_DEGREES, VIN_MV, VMCU_MV, VOUT_MV, make_load_node};

use regnode::error::NodeError;
use regnode::modules::load_control::{
    ANALOG_DATA_1, ANALOG_DATA_2, CONFIGURATION_0, CONTROL_1, CONTROL_1_MASK_DDEN, FLAGS_1,
    FLAGS_1_MASK_DDFH, STATUS_1, STATUS_1_MASK_DDENST,
};
use regnode::node::RequestSource::{External, Internal};
use regnode::node::common::{ANALOG_DATA_0, CONTROL_0, CONTROL_0_MASK_MTRG, STATUS_0, STATUS_0_MASK_ESF};
use regnode::node::field::{self, BitState};
use regnode::ports::{AnalogChannel, AnalogError, LoadError};
use regnode::power::{DomainState, PowerControl, PowerDomain};

fn enable(on: bool) -> (u32, u32) {
    (u32::from(on), CONTROL_1_MASK_DDEN)
}

// ── Forced hardware ───────────────────────────────────────────

#[test]
fn forced_output_refuses_enable_and_releases_analog() {
    let mut node = make_load_node(true);
    let (value, mask) = enable(true);

    assert_eq!(
        node.write_register(External, CONTROL_1, value, mask),
        Err(NodeError::ForcedHardwareConflict)
    );
    assert!(node.adapter().output().calls.is_empty());
    assert_eq!(node.power().state(PowerDomain::Analog), DomainState::Off);
    assert_eq!(node.power().holder_count(PowerDomain::Analog), 0);

    let status = node.read_register(External, STATUS_1).unwrap();
    assert_eq!(
        field::read(status, STATUS_1_MASK_DDENST),
        BitState::ForcedHardware as u32
    );
    let flags = node.read_register(External, FLAGS_1).unwrap();
    assert_eq!(field::read(flags, FLAGS_1_MASK_DDFH), 1);
}

// ── Software switching ────────────────────────────────────────

#[test]
fn enable_drives_output_once_and_reports_status() {
    let mut node = make_load_node(false);
    let (value, mask) = enable(true);

    node.write_register(External, CONTROL_1, value, mask).unwrap();
    assert_eq!(node.adapter().output().calls, vec![true]);
    assert_eq!(node.read_register(External, STATUS_1).unwrap(), 0b01);
    assert_eq!(node.power().state(PowerDomain::Analog), DomainState::Off);
    assert_eq!(node.power().delay().inner().elapsed_ms(), 50);

    // Same state again: no actuator call.
    node.write_register(External, CONTROL_1, value, mask).unwrap();
    assert_eq!(node.adapter().output().calls, vec![true]);

    let (value, mask) = enable(false);
    node.write_register(External, CONTROL_1, value, mask).unwrap();
    assert_eq!(node.adapter().output().calls, vec![true, false]);
    assert_eq!(node.read_register(External, STATUS_1).unwrap(), 0b00);
}

#[test]
fn write_outside_enable_mask_does_not_actuate() {
    let mut node = make_load_node(false);
    node.write_register(External, CONTROL_1, 0xFFFF_FFFE, 0xFFFF_FFFE)
        .unwrap();
    assert!(node.adapter().output().calls.is_empty());
    assert_eq!(node.power().holder_count(PowerDomain::Analog), 0);
}

#[test]
fn internal_write_has_no_side_effect() {
    let mut node = make_load_node(false);
    let (value, mask) = enable(true);
    node.write_register(Internal, CONTROL_1, value, mask).unwrap();
    assert!(node.adapter().output().calls.is_empty());
    assert_eq!(node.read_register(Internal, CONTROL_1).unwrap(), 1);
}

#[test]
fn actuator_failure_is_reported_and_rail_released() {
    let mut node = make_load_node(false);
    node.adapter_mut().output_mut().fail_write = true;
    let (value, mask) = enable(true);

    assert_eq!(
        node.write_register(External, CONTROL_1, value, mask),
        Err(NodeError::Load(LoadError::GpioWriteFailed))
    );
    assert_eq!(node.power().state(PowerDomain::Analog), DomainState::Off);
    assert_eq!(node.read_register(Internal, STATUS_1).unwrap(), 0b00);
    // The requested bit stays committed; only the hook reported failure.
    assert_eq!(node.read_register(Internal, CONTROL_1).unwrap() & mask, value & mask);
}

#[test]
fn readback_failure_leaves_error_state_in_status() {
    let mut node = make_load_node(false);
    node.adapter_mut().output_mut().fail_readback = true;
    let (value, mask) = enable(true);

    assert_eq!(
        node.write_register(External, CONTROL_1, value, mask),
        Err(NodeError::Load(LoadError::StateUnknown))
    );
    assert_eq!(node.adapter().output().calls, vec![true]);
    assert_eq!(
        node.read_register(Internal, STATUS_1).unwrap(),
        BitState::Error as u32
    );
}

#[test]
fn read_only_registers_reject_external_writes() {
    let mut node = make_load_node(false);
    for addr in [FLAGS_1, STATUS_1, ANALOG_DATA_1, ANALOG_DATA_2] {
        let before = node.read_register(Internal, addr).unwrap();
        assert_eq!(
            node.write_register(External, addr, 0x1234_5678, u32::MAX),
            Err(NodeError::AccessViolation),
            "0x{addr:02X}"
        );
        assert_eq!(node.read_register(Internal, addr).unwrap(), before);
    }
    // The trusted path may still write them.
    node.write_register(Internal, STATUS_1, 0b11, STATUS_1_MASK_DDENST)
        .unwrap();
    assert_eq!(node.read_register(Internal, STATUS_1).unwrap(), 0b11);
}

// ── Measurement ───────────────────────────────────────────────

#[test]
fn measure_trigger_fills_analog_registers() {
    let mut node = make_load_node(false);
    node.write_register(External, CONTROL_0, CONTROL_0_MASK_MTRG, CONTROL_0_MASK_MTRG)
        .unwrap();

    assert_eq!(
        node.read_register(Internal, ANALOG_DATA_1).unwrap(),
        ((VOUT_MV as u32) << 16) | VIN_MV as u32
    );
    assert_eq!(
        node.read_register(Internal, ANALOG_DATA_2).unwrap(),
        IOUT_UA as u32
    );
    assert_eq!(
        node.read_register(Internal, ANALOG_DATA_0).unwrap(),
        ((TMCU_DEGREES as u32) << 16) | VMCU_MV as u32
    );
    assert_eq!(
        node.read_register(Internal, CONTROL_0).unwrap() & CONTROL_0_MASK_MTRG,
        0
    );
    assert_eq!(node.power().state(PowerDomain::Analog), DomainState::Off);
}

#[test]
fn current_is_not_sampled_below_output_threshold() {
    let mut node = make_load_node(false);
    node.board_mut()
        .analog_mut()
        .set(AnalogChannel::VoutMv, 4000);

    node.write_register(External, CONTROL_0, CONTROL_0_MASK_MTRG, CONTROL_0_MASK_MTRG)
        .unwrap();

    assert_eq!(
        node.read_register(Internal, ANALOG_DATA_1).unwrap(),
        (4000 << 16) | VIN_MV as u32
    );
    assert_eq!(
        node.read_register(Internal, ANALOG_DATA_2).unwrap(),
        field::UA_ERROR
    );
    // VMCU, TMCU, VIN, VOUT; no IOUT conversion.
    assert_eq!(node.board().analog().conversions(), 4);
}

#[test]
fn failed_conversion_keeps_sentinels_and_records_error() {
    let mut node = make_load_node(false);
    node.board_mut()
        .analog_mut()
        .fail(Some(AnalogChannel::VoutMv));

    assert_eq!(
        node.write_register(External, CONTROL_0, CONTROL_0_MASK_MTRG, CONTROL_0_MASK_MTRG),
        Err(NodeError::Analog(AnalogError::ConversionFailed(
            AnalogChannel::VoutMv
        )))
    );
    assert_eq!(
        node.read_register(Internal, ANALOG_DATA_1).unwrap(),
        (field::MV_ERROR << 16) | field::MV_ERROR
    );
    assert_eq!(
        node.read_register(Internal, ANALOG_DATA_2).unwrap(),
        field::UA_ERROR
    );
    // The common measurement still ran.
    assert_eq!(
        node.read_register(Internal, ANALOG_DATA_0).unwrap(),
        ((TMCU_DEGREES as u32) << 16) | VMCU_MV as u32
    );
    assert_eq!(node.errors().len(), 1);
    let status = node.read_register(External, STATUS_0).unwrap();
    assert_eq!(field::read(status, STATUS_0_MASK_ESF), 1);
    assert_eq!(node.power().state(PowerDomain::Analog), DomainState::Off);
    assert_eq!(
        node.read_register(Internal, CONTROL_0).unwrap() & CONTROL_0_MASK_MTRG,
        0
    );
}

// ── Configuration ─────────────────────────────────────────────

#[test]
fn configuration_is_persisted_only_when_changed() {
    let mut node = make_load_node(false);
    node.write_register(External, CONFIGURATION_0, 0x0042, 0xFFFF)
        .unwrap();
    assert_eq!(node.read_nvm(CONFIGURATION_0).unwrap(), 0x0042);

    let writes = node.board().nvm().writes();
    node.write_register(External, CONFIGURATION_0, 0x0042, 0xFFFF)
        .unwrap();
    assert_eq!(node.board().nvm().writes(), writes);
}
