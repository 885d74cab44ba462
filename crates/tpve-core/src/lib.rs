// tpve-core: Pure types, config, validation, environment composition
// No internal talos-pve dependencies — this is the foundation crate.

pub mod config;
pub mod credentials;
pub mod descriptor;
pub mod env;
pub mod error;
pub mod loader;
pub mod paths;
pub mod registry;
pub mod stage;
pub mod validate;
