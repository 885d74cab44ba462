use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use tpve_core::config::DESTROY_STOP_SETTLE;
use tpve_core::descriptor::NodeSpec;
use tpve_core::error::StageError;
use tracing::{info, instrument, warn};

use super::Deployer;
use crate::stage::{ExecPolicy, NodeFailure, for_each_node};

/// Outcome of a best-effort pass over all nodes.
#[derive(Debug, Default)]
pub struct LifecycleReport {
    pub attempted: usize,
    pub failures: Vec<NodeFailure>,
}

impl LifecycleReport {
    pub fn succeeded(&self) -> usize {
        self.attempted - self.failures.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn absorb(&mut self, other: LifecycleReport) {
        self.attempted += other.attempted;
        self.failures.extend(other.failures);
    }
}

impl Deployer<'_> {
    fn each_node_best_effort(
        &self,
        op: impl FnMut(&NodeSpec) -> Result<(), StageError>,
    ) -> Result<LifecycleReport, StageError> {
        let failures = for_each_node(ExecPolicy::ContinueOnError, self.desc.all_nodes(), op)?;
        Ok(LifecycleReport {
            attempted: self.desc.all_nodes().count(),
            failures,
        })
    }

    fn qm_on_node(&self, node: &NodeSpec, action: &'static str) -> Result<(), StageError> {
        let vm_id = node.vm_id.to_string();
        self.runner
            .run_checked(&self.qm([action, vm_id.as_str()]))
            .map_err(StageError::step(action))
    }

    #[instrument(skip_all, fields(cluster = %self.desc.cluster_name))]
    pub fn start_nodes(&self) -> Result<LifecycleReport, StageError> {
        self.each_node_best_effort(|node| {
            info!(node = %node.name, vm_id = node.vm_id, "starting node");
            self.qm_on_node(node, "start")
        })
    }

    #[instrument(skip_all, fields(cluster = %self.desc.cluster_name))]
    pub fn stop_nodes(&self) -> Result<LifecycleReport, StageError> {
        self.each_node_best_effort(|node| {
            info!(node = %node.name, vm_id = node.vm_id, "stopping node");
            self.qm_on_node(node, "stop")
        })
    }

    /// Stop then start every node. Both passes are best-effort.
    pub fn restart_nodes(&self) -> Result<LifecycleReport, StageError> {
        let mut report = self.stop_nodes()?;
        report.absorb(self.start_nodes()?);
        Ok(report)
    }

    /// Tear down every node and the template, then delete local artifacts.
    ///
    /// Nothing here aborts: stop failures are ignored, destroy failures are
    /// reported, and file cleanup always runs.
    #[instrument(skip_all, fields(cluster = %self.desc.cluster_name))]
    pub fn destroy(&self) -> Result<LifecycleReport, StageError> {
        let report = self.each_node_best_effort(|node| {
            info!(node = %node.name, vm_id = node.vm_id, "destroying node");
            let vm_id = node.vm_id.to_string();
            // usually fails for nodes that are already stopped
            let _ = self.runner.run(&self.qm(["stop", vm_id.as_str()]));
            self.readiness.settle(&node.name, DESTROY_STOP_SETTLE);
            self.runner
                .run_checked(&self.qm(["destroy", vm_id.as_str(), "--purge"]))
                .map_err(StageError::step("destroy"))
        })?;

        let template = self.desc.proxmox.template_vm_id.to_string();
        info!(vm_id = %template, "destroying template");
        let _ = self
            .runner
            .run(&self.qm(["destroy", template.as_str(), "--purge"]));

        remove_path(&self.paths.config_dir());
        remove_path(&self.paths.image());
        info!(destroyed = report.succeeded(), failed = report.failures.len(), "cleanup finished");
        Ok(report)
    }
}

fn remove_path(path: &Path) {
    let result = if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    match result {
        Ok(()) => info!(path = %path.display(), "removed"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "failed to remove"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deploy::fixtures;
    use crate::shell_mock::{InstantReadiness, RecordingRunner};

    #[test]
    fn test_start_continues_past_failures() {
        let dir = tempfile::tempdir().unwrap();
        let desc = fixtures::two_node();
        let runner = RecordingRunner::failing_when(|c| c == "qm start 101");
        let ready = InstantReadiness::new();
        let report = Deployer::new(&desc, &runner, &ready, dir.path())
            .start_nodes()
            .unwrap();

        assert_eq!(runner.command_lines(), vec!["qm start 101", "qm start 201"]);
        assert_eq!(report.attempted, 2);
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failures[0].vm_id, 101);
    }

    #[test]
    fn test_restart_stops_then_starts() {
        let dir = tempfile::tempdir().unwrap();
        let desc = fixtures::two_node();
        let runner = RecordingRunner::new();
        let ready = InstantReadiness::new();
        let report = Deployer::new(&desc, &runner, &ready, dir.path())
            .restart_nodes()
            .unwrap();

        assert_eq!(
            runner.command_lines(),
            vec!["qm stop 101", "qm stop 201", "qm start 101", "qm start 201"]
        );
        assert_eq!(report.attempted, 4);
        assert!(report.is_clean());
    }

    #[test]
    fn test_destroy_sequence_and_cleanup() {
        let dir = tempfile::tempdir().unwrap();
        let desc = fixtures::two_node();
        let runner = RecordingRunner::new();
        let ready = InstantReadiness::new();
        let d = Deployer::new(&desc, &runner, &ready, dir.path());
        fs::create_dir_all(d.paths().config_dir()).unwrap();
        fs::write(d.paths().kubeconfig(), "k").unwrap();
        fs::write(d.paths().image(), "img").unwrap();

        let report = d.destroy().unwrap();

        assert_eq!(
            runner.command_lines(),
            vec![
                "qm stop 101",
                "qm destroy 101 --purge",
                "qm stop 201",
                "qm destroy 201 --purge",
                "qm destroy 9000 --purge",
            ]
        );
        assert_eq!(ready.total(), DESTROY_STOP_SETTLE * 2);
        assert!(report.is_clean());
        assert!(!d.paths().config_dir().exists());
        assert!(!d.paths().image().exists());
    }

    #[test]
    fn test_destroy_attempts_everything_when_all_fail() {
        let dir = tempfile::tempdir().unwrap();
        let desc = fixtures::two_node();
        let runner = RecordingRunner::with_handler(|_| 1);
        let ready = InstantReadiness::new();
        let d = Deployer::new(&desc, &runner, &ready, dir.path());
        fs::create_dir_all(d.paths().config_dir()).unwrap();
        fs::write(d.paths().image(), "img").unwrap();

        let report = d.destroy().unwrap();

        assert_eq!(runner.matching("qm destroy").len(), 3);
        assert_eq!(report.failures.len(), 2);
        assert!(!d.paths().config_dir().exists());
        assert!(!d.paths().image().exists());
    }

    #[test]
    fn test_destroy_without_local_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let desc = fixtures::two_node();
        let runner = RecordingRunner::new();
        let ready = InstantReadiness::new();
        assert!(
            Deployer::new(&desc, &runner, &ready, dir.path())
                .destroy()
                .is_ok()
        );
    }
}
