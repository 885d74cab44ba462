// tpve-cli: Clap commands, UI, logging, init wizard
// Depends on tpve-core, tpve-runtime

pub mod commands;
pub mod display;
pub mod logging;
pub mod output;
pub mod ui;
pub mod wizard;

pub use commands::run;
