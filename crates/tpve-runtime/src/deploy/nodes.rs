use tpve_core::config::NODE_START_SETTLE;
use tpve_core::descriptor::NodeSpec;
use tpve_core::error::StageError;
use tracing::{info, instrument};

use super::Deployer;
use crate::stage::{ExecPolicy, for_each_node};

impl Deployer<'_> {
    /// Clone, size and boot every node, control planes first.
    ///
    /// Stops at the first failing node; nodes created before it keep running.
    #[instrument(skip_all, fields(cluster = %self.desc.cluster_name))]
    pub fn create_nodes(&self) -> Result<(), StageError> {
        for_each_node(ExecPolicy::FailFast, self.desc.all_nodes(), |node| {
            self.create_node(node)
        })?;
        Ok(())
    }

    fn create_node(&self, node: &NodeSpec) -> Result<(), StageError> {
        let pve = &self.desc.proxmox;
        let vm_id = node.vm_id.to_string();
        let template = pve.template_vm_id.to_string();
        info!(node = %node.name, vm_id = node.vm_id, ip = %node.ip_address, "creating node");

        self.runner
            .run_checked(&self.qm([
                "clone",
                template.as_str(),
                vm_id.as_str(),
                "--name",
                node.name.as_str(),
                "--full",
                "1",
            ]))
            .map_err(StageError::step("clone"))?;

        let cores = node.cpu.to_string();
        let memory = node.memory.to_string();
        let scsi0 = format!(
            "{}:vm-{}-disk-0,discard=on,cache=writeback,iothread=1,ssd=1,size={}",
            pve.storage_pool, node.vm_id, node.disk
        );
        self.runner
            .run_checked(&self.qm([
                "set",
                vm_id.as_str(),
                "--cores",
                cores.as_str(),
                "--memory",
                memory.as_str(),
                "--scsi0",
                scsi0.as_str(),
            ]))
            .map_err(StageError::step("configure"))?;

        self.runner
            .run_checked(&self.qm(["start", vm_id.as_str()]))
            .map_err(StageError::step("start"))?;

        self.readiness.settle(&node.name, NODE_START_SETTLE);
        Ok(())
    }
}
