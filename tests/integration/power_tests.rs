//! Power arbiter over GPIO rails, alone and under node traffic.

use super::mock_hw::{MockPower, make_load_node, make_power};

use regnode::adapters::hardware::{GpioRails, HalDelay};
use regnode::adapters::sim::{SimClock, SimPin};
use regnode::modules::load_control::{CONTROL_1, CONTROL_1_MASK_DDEN};
use regnode::node::RequestSource::External;
use regnode::node::common::{CONTROL_0, CONTROL_0_MASK_MTRG};
use regnode::power::{
    DelayMode, DomainState, PowerArbiter, PowerControl, PowerDomain, RequesterId,
};

fn rail_is_high(power: &MockPower, domain: PowerDomain) -> bool {
    power.rails().pin(domain).is_some_and(SimPin::is_high)
}

fn settled_ms(power: &MockPower) -> u64 {
    power.delay().inner().elapsed_ms()
}

#[test]
fn rail_stays_on_until_last_holder_releases() {
    let mut power = make_power();
    power.enable(RequesterId::Ddrm, PowerDomain::Analog, DelayMode::Active);
    power.enable(RequesterId::Node, PowerDomain::Analog, DelayMode::Active);
    assert!(rail_is_high(&power, PowerDomain::Analog));
    assert_eq!(power.holder_count(PowerDomain::Analog), 2);
    // Only the 0 -> 1 transition waits.
    assert_eq!(settled_ms(&power), 50);

    power.disable(RequesterId::Ddrm, PowerDomain::Analog);
    assert!(rail_is_high(&power, PowerDomain::Analog));
    assert_eq!(power.state(PowerDomain::Analog), DomainState::On);

    power.disable(RequesterId::Node, PowerDomain::Analog);
    assert!(!rail_is_high(&power, PowerDomain::Analog));
    assert_eq!(power.state(PowerDomain::Analog), DomainState::Off);
}

#[test]
fn repeated_enable_by_one_requester_counts_once() {
    let mut power = make_power();
    power.enable(RequesterId::Lvrm, PowerDomain::Analog, DelayMode::Active);
    power.enable(RequesterId::Lvrm, PowerDomain::Analog, DelayMode::Active);
    assert_eq!(power.holder_count(PowerDomain::Analog), 1);

    power.disable(RequesterId::Lvrm, PowerDomain::Analog);
    assert_eq!(power.state(PowerDomain::Analog), DomainState::Off);
    assert!(!rail_is_high(&power, PowerDomain::Analog));
}

#[test]
fn release_by_non_holder_is_ignored() {
    let mut power = make_power();
    power.enable(RequesterId::Ddrm, PowerDomain::Analog, DelayMode::Active);
    power.disable(RequesterId::Gpsm, PowerDomain::Analog);
    assert!(power.is_held_by(RequesterId::Ddrm, PowerDomain::Analog));
    assert!(rail_is_high(&power, PowerDomain::Analog));
}

#[test]
fn settle_delay_override_and_sleep_mode() {
    let rails = GpioRails::new().with_rail(PowerDomain::Analog, SimPin::default());
    let mut power: MockPower = PowerArbiter::new(rails, HalDelay::new(SimClock::default()))
        .with_settle_delay(PowerDomain::Analog, 5);
    power.enable(RequesterId::Measure, PowerDomain::Analog, DelayMode::Sleep);
    assert_eq!(settled_ms(&power), 5);
}

#[test]
fn unfitted_rail_is_still_arbitrated() {
    let mut power = make_power();
    power.enable(RequesterId::Gpsm, PowerDomain::Gps, DelayMode::Active);
    assert_eq!(power.state(PowerDomain::Gps), DomainState::On);
    assert!(power.rails().pin(PowerDomain::Gps).is_none());
    power.disable(RequesterId::Gpsm, PowerDomain::Gps);
    assert_eq!(power.state(PowerDomain::Gps), DomainState::Off);
}

#[test]
fn bus_traffic_leaves_every_domain_off() {
    let mut node = make_load_node(false);
    node.write_register(External, CONTROL_1, CONTROL_1_MASK_DDEN, CONTROL_1_MASK_DDEN)
        .unwrap();
    node.write_register(External, CONTROL_0, CONTROL_0_MASK_MTRG, CONTROL_0_MASK_MTRG)
        .unwrap();
    node.process(0).unwrap();

    for domain in PowerDomain::ALL {
        assert_eq!(node.power().state(domain), DomainState::Off, "{domain:?}");
    }
    assert!(!rail_is_high(node.power(), PowerDomain::Analog));
}
