use tpve_core::config::{CONFIG_APPLY_SETTLE, TALOSCTL_TIMEOUT};
use tpve_core::descriptor::{NodeSpec, Role};
use tpve_core::error::StageError;
use tracing::{info, instrument};

use super::{Deployer, path_arg};
use crate::stage::{ExecPolicy, for_each_node};

impl Deployer<'_> {
    /// Push each node's machine config over the insecure maintenance API.
    #[instrument(skip_all, fields(cluster = %self.desc.cluster_name))]
    pub fn apply_config(&self) -> Result<(), StageError> {
        let nodes = &self.desc.nodes;
        for_each_node(ExecPolicy::FailFast, &nodes.control_planes, |node| {
            self.apply_node_config(node, Role::Controlplane)
        })?;
        for_each_node(ExecPolicy::FailFast, &nodes.workers, |node| {
            self.apply_node_config(node, Role::Worker)
        })?;
        Ok(())
    }

    fn apply_node_config(&self, node: &NodeSpec, role: Role) -> Result<(), StageError> {
        let doc = path_arg(&self.paths.machine_config(role));
        info!(node = %node.name, ip = %node.ip_address, %role, "applying machine config");
        self.runner
            .run_checked(&self.talosctl([
                "apply-config",
                "--insecure",
                "--nodes",
                node.ip_address.as_str(),
                "--file",
                doc.as_str(),
                "--timeout",
                TALOSCTL_TIMEOUT,
            ]))
            .map_err(StageError::step("apply-config"))?;
        self.readiness.settle(&node.name, CONFIG_APPLY_SETTLE);
        Ok(())
    }
}
