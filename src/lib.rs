//! # talos-pve — Talos Linux Kubernetes clusters on Proxmox VE
//!
//! Facade crate that re-exports the workspace crates so consumers can
//! depend on a single `talos_pve` library.
//!
//! ## Crate breakdown
//!
//! | Module | Crate | Purpose |
//! |--------|-------|---------|
//! | [`core`] | tpve-core | Descriptor, validation, credentials, environment, errors |
//! | [`runtime`] | tpve-runtime | Command execution, deployment stages, node lifecycle |
//! | [`cli`] | tpve-cli | Clap commands, UI, logging |

pub use tpve_cli as cli;
pub use tpve_core as core;
pub use tpve_runtime as runtime;
