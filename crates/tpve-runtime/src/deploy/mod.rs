//! Deployment stages against one cluster descriptor.
//!
//! Every stage is a method on [`Deployer`]. Stages only reach the outside
//! world through the injected [`CommandRunner`] and [`Readiness`], and only
//! touch local files under the work directory.

mod apply;
mod bootstrap;
mod image;
mod lifecycle;
mod machineconfig;
mod nodes;
mod pipeline;
mod template;
mod verify;

use std::path::{Path, PathBuf};

use tpve_core::credentials::resolve_credentials;
use tpve_core::descriptor::ClusterDescriptor;
use tpve_core::env::EnvOverlay;
use tpve_core::paths::ArtifactPaths;
use tracing::warn;

use crate::readiness::Readiness;
use crate::shell::{CommandRunner, Invocation};

pub use lifecycle::LifecycleReport;
pub use pipeline::{DeployReport, Pipeline, StageEvent};

/// Environment variable pointing talosctl at the generated client config.
pub const TALOSCONFIG: &str = "TALOSCONFIG";
/// Environment variable pointing kubectl at the retrieved kubeconfig.
pub const KUBECONFIG: &str = "KUBECONFIG";

pub struct Deployer<'a> {
    desc: &'a ClusterDescriptor,
    runner: &'a dyn CommandRunner,
    readiness: &'a dyn Readiness,
    paths: ArtifactPaths,
}

impl<'a> Deployer<'a> {
    pub fn new(
        desc: &'a ClusterDescriptor,
        runner: &'a dyn CommandRunner,
        readiness: &'a dyn Readiness,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        if let (_, Some(warning)) = resolve_credentials(&desc.proxmox) {
            warn!(%warning, "proxmox credentials");
        }
        Self {
            desc,
            runner,
            readiness,
            paths: ArtifactPaths::new(work_dir, desc),
        }
    }

    pub fn descriptor(&self) -> &ClusterDescriptor {
        self.desc
    }

    pub fn paths(&self) -> &ArtifactPaths {
        &self.paths
    }

    /// `qm <args>` carrying the hypervisor credential overlay.
    fn qm<I, S>(&self, args: I) -> Invocation
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Invocation::new("qm")
            .args(args)
            .env(EnvOverlay::hypervisor(&self.desc.proxmox))
    }

    /// `talosctl <args>` bound to the cluster's generated talosconfig.
    fn talosctl<I, S>(&self, args: I) -> Invocation
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Invocation::new("talosctl")
            .args(args)
            .env(EnvOverlay::new().with(TALOSCONFIG, path_arg(&self.paths.talosconfig())))
    }
}

/// Render a path as a command argument.
fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
