use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use tpve_core::config::KUBE_API_PORT;
use tpve_core::descriptor::{RegistryMirror, Role};
use tpve_core::error::{ConfigError, StageError};
use tpve_core::registry::registry_patch;
use tracing::{info, instrument};

use super::{Deployer, path_arg};

impl Deployer<'_> {
    /// Cluster API endpoint on the first control plane.
    pub fn cluster_endpoint(&self) -> Option<String> {
        self.desc
            .first_control_plane()
            .map(|cp| format!("https://{}:{KUBE_API_PORT}", cp.ip_address))
    }

    /// Generate machine configs and the talosconfig, then patch registry
    /// mirrors into both machine configs when any are declared.
    #[instrument(skip_all, fields(cluster = %self.desc.cluster_name))]
    pub fn generate_config(&self) -> Result<(), StageError> {
        let dir = self.paths.config_dir();
        fs::create_dir_all(&dir).map_err(StageError::io(&dir))?;

        let endpoint = self
            .cluster_endpoint()
            .ok_or(ConfigError::NoControlPlane)?;
        let dir_arg = path_arg(&dir);
        let mut args = vec![
            "gen",
            "config",
            self.desc.cluster_name.as_str(),
            endpoint.as_str(),
            "--output",
            dir_arg.as_str(),
        ];
        if !self.desc.kubernetes_version.is_empty() {
            args.extend(["--kubernetes-version", self.desc.kubernetes_version.as_str()]);
        }
        info!(%endpoint, "generating machine configuration");
        self.runner
            .run_checked(&self.talosctl(args))
            .map_err(StageError::step("talosctl gen config"))?;

        if let Some(mirrors) = self.desc.registry_mirrors() {
            for role in [Role::Controlplane, Role::Worker] {
                self.patch_registries(&self.paths.machine_config(role), mirrors)?;
            }
        }
        Ok(())
    }

    fn patch_registries(
        &self,
        doc: &Path,
        mirrors: &BTreeMap<String, RegistryMirror>,
    ) -> Result<(), StageError> {
        info!(doc = %doc.display(), registries = mirrors.len(), "patching registry mirrors");
        self.write_and_apply_patch(doc, mirrors)
            .map_err(|e| StageError::Patch {
                path: doc.to_path_buf(),
                source: Box::new(e),
            })
    }

    fn write_and_apply_patch(
        &self,
        doc: &Path,
        mirrors: &BTreeMap<String, RegistryMirror>,
    ) -> Result<(), StageError> {
        let dir = doc
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.paths.config_dir());
        let patch = serde_json::to_vec_pretty(&registry_patch(mirrors))?;

        // removed when dropped, including on the error paths below
        let mut scratch = tempfile::Builder::new()
            .prefix("registry-")
            .suffix(".patch.json")
            .tempfile_in(&dir)
            .map_err(StageError::io(&dir))?;
        scratch
            .write_all(&patch)
            .and_then(|()| scratch.flush())
            .map_err(StageError::io(scratch.path()))?;

        let doc_arg = path_arg(doc);
        let patch_arg = format!("@{}", path_arg(scratch.path()));
        self.runner
            .run_checked(&self.talosctl([
                "machineconfig",
                "patch",
                doc_arg.as_str(),
                "--patch",
                patch_arg.as_str(),
                "--output",
                doc_arg.as_str(),
            ]))
            .map_err(StageError::step("talosctl machineconfig patch"))
    }
}
