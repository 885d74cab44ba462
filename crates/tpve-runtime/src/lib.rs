// tpve-runtime: Command execution, deployment stages, node lifecycle
// Depends on tpve-core

pub mod deploy;
pub mod preflight;
pub mod readiness;
pub mod shell;
pub mod shell_mock;
pub mod stage;
