use tpve_core::config::{BOOTSTRAP_SETTLE, TALOSCTL_TIMEOUT};
use tpve_core::error::{ConfigError, StageError};
use tracing::{info, instrument};

use super::{Deployer, path_arg};

impl Deployer<'_> {
    /// Point talosctl at the control planes, bootstrap etcd on the first
    /// one and fetch the kubeconfig.
    #[instrument(skip_all, fields(cluster = %self.desc.cluster_name))]
    pub fn bootstrap(&self) -> Result<(), StageError> {
        let first = self
            .desc
            .first_control_plane()
            .ok_or(ConfigError::NoControlPlane)?;
        let ip = first.ip_address.as_str();

        let endpoints = self.desc.control_plane_addresses().join(",");
        self.runner
            .run_checked(&self.talosctl(["config", "endpoint", endpoints.as_str()]))
            .map_err(StageError::step("talosctl config endpoint"))?;
        self.runner
            .run_checked(&self.talosctl(["config", "node", ip]))
            .map_err(StageError::step("talosctl config node"))?;

        info!(node = %first.name, "waiting for control plane to come up");
        self.readiness.settle(&first.name, BOOTSTRAP_SETTLE);

        info!(node = %first.name, %ip, "bootstrapping cluster");
        self.runner
            .run_checked(&self.talosctl([
                "bootstrap",
                "--nodes",
                ip,
                "--timeout",
                TALOSCTL_TIMEOUT,
            ]))
            .map_err(StageError::step("talosctl bootstrap"))?;

        let kubeconfig = path_arg(&self.paths.kubeconfig());
        self.runner
            .run_checked(&self.talosctl([
                "kubeconfig",
                kubeconfig.as_str(),
                "--nodes",
                ip,
                "--force",
            ]))
            .map_err(StageError::step("talosctl kubeconfig"))?;
        info!(path = %kubeconfig, "kubeconfig written");
        Ok(())
    }
}
