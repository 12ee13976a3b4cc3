//! Fuzz target: `NodeConfig::from_json`
//!
//! Arbitrary bytes must either be rejected or yield a configuration that
//! passes its own validation.
//!
//! cargo fuzz run fuzz_node_config

#![no_main]

use libfuzzer_sys::fuzz_target;
use regnode::config::NodeConfig;

fuzz_target!(|data: &[u8]| {
    if let Ok(config) = NodeConfig::from_json(data) {
        assert_eq!(config.validate(), Ok(()));
        assert!(config.factory_node_address <= 0x7F);
    }
});
