use tpve_core::config::TEMPLATE_NAME;
use tpve_core::error::StageError;
use tracing::{info, instrument};

use super::{Deployer, path_arg};

impl Deployer<'_> {
    /// Whether a VM with the template ID already exists on the host.
    pub fn template_exists(&self) -> bool {
        let id = self.desc.proxmox.template_vm_id.to_string();
        self.runner.probe(&self.qm(["status", id.as_str()]).quiet())
    }

    /// Build the golden template VM from the prepared image.
    ///
    /// A present template is left untouched. A half-built one from an
    /// earlier failure is not cleaned up.
    #[instrument(skip_all, fields(template_vm_id = self.desc.proxmox.template_vm_id))]
    pub fn create_template(&self) -> Result<(), StageError> {
        if self.template_exists() {
            info!("template already exists");
            return Ok(());
        }

        let pve = &self.desc.proxmox;
        let id = pve.template_vm_id.to_string();
        let pool = &pve.storage_pool;

        let net0 = format!("virtio,bridge={}", self.desc.network.bridge);
        let efidisk = format!("{pool}:4,format=qcow2");
        let image = path_arg(&self.paths.image());
        let scsi0 = format!("{pool}:vm-{id}-disk-0,discard=on,cache=writeback,iothread=1,ssd=1");

        info!("creating template VM");
        self.runner
            .run_checked(&self.qm([
                "create",
                id.as_str(),
                "--name",
                TEMPLATE_NAME,
                "--memory",
                "1024",
                "--cores",
                "1",
                "--cpu",
                "host",
                "--net0",
                net0.as_str(),
                "--scsihw",
                "virtio-scsi-pci",
                "--machine",
                "q35",
                "--bios",
                "ovmf",
                "--efidisk0",
                efidisk.as_str(),
                "--agent",
                "enabled=1",
            ]))
            .map_err(StageError::step("create"))?;

        info!("importing disk");
        self.runner
            .run_checked(&self.qm([
                "importdisk",
                id.as_str(),
                image.as_str(),
                pool.as_str(),
                "--format",
                "qcow2",
            ]))
            .map_err(StageError::step("importdisk"))?;

        self.runner
            .run_checked(&self.qm(["set", id.as_str(), "--scsi0", scsi0.as_str()]))
            .map_err(StageError::step("attach disk"))?;

        self.runner
            .run_checked(&self.qm(["set", id.as_str(), "--boot", "order=scsi0"]))
            .map_err(StageError::step("set boot order"))?;

        self.runner
            .run_checked(&self.qm(["template", id.as_str()]))
            .map_err(StageError::step("convert to template"))?;

        info!("template ready");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deploy::fixtures;
    use crate::shell_mock::{InstantReadiness, RecordingRunner};

    #[test]
    fn test_existing_template_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let desc = fixtures::two_node();
        let runner = RecordingRunner::new();
        let ready = InstantReadiness::new();
        Deployer::new(&desc, &runner, &ready, dir.path())
            .create_template()
            .unwrap();

        assert_eq!(runner.command_lines(), vec!["qm status 9000"]);
        assert!(runner.calls()[0].quiet);
    }

    #[test]
    fn test_builds_template_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let desc = fixtures::two_node();
        let runner = RecordingRunner::failing_when(|c| c.starts_with("qm status"));
        let ready = InstantReadiness::new();
        let d = Deployer::new(&desc, &runner, &ready, dir.path());
        d.create_template().unwrap();

        let image = path_arg(&d.paths().image());
        assert_eq!(
            runner.command_lines(),
            vec![
                "qm status 9000".to_string(),
                "qm create 9000 --name talos-template --memory 1024 --cores 1 --cpu host \
                 --net0 virtio,bridge=vmbr0 --scsihw virtio-scsi-pci --machine q35 --bios ovmf \
                 --efidisk0 local-lvm:4,format=qcow2 --agent enabled=1"
                    .to_string(),
                format!("qm importdisk 9000 {image} local-lvm --format qcow2"),
                "qm set 9000 --scsi0 local-lvm:vm-9000-disk-0,discard=on,cache=writeback,iothread=1,ssd=1"
                    .to_string(),
                "qm set 9000 --boot order=scsi0".to_string(),
                "qm template 9000".to_string(),
            ]
        );
    }

    #[test]
    fn test_qm_calls_carry_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let desc = fixtures::two_node();
        let runner = RecordingRunner::new();
        let ready = InstantReadiness::new();
        Deployer::new(&desc, &runner, &ready, dir.path())
            .create_template()
            .unwrap();

        let calls = runner.calls();
        let env = &calls[0].env;
        assert_eq!(env.get("PROXMOX_PASSWORD"), Some("secret"));
        assert_eq!(env.get("PROXMOX_HOST"), Some("pve.lan"));
    }

    #[test]
    fn test_failed_step_stops_and_names_step() {
        let dir = tempfile::tempdir().unwrap();
        let desc = fixtures::two_node();
        let runner = RecordingRunner::failing_when(|c| {
            c.starts_with("qm status") || c.starts_with("qm importdisk")
        });
        let ready = InstantReadiness::new();
        let err = Deployer::new(&desc, &runner, &ready, dir.path())
            .create_template()
            .unwrap_err();

        assert_eq!(err.to_string(), "importdisk failed");
        assert!(runner.matching("qm set").is_empty());
        assert!(runner.matching("qm template").is_empty());
    }
}
