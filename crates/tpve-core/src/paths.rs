use std::path::{Path, PathBuf};

use crate::descriptor::{ClusterDescriptor, Role};

/// Local files produced and consumed by a deployment, rooted at a work dir.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    work_dir: PathBuf,
    cluster_name: String,
    talos_version: String,
}

impl ArtifactPaths {
    pub fn new(work_dir: impl Into<PathBuf>, desc: &ClusterDescriptor) -> Self {
        Self {
            work_dir: work_dir.into(),
            cluster_name: desc.cluster_name.clone(),
            talos_version: desc.talos_version.clone(),
        }
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Converted qcow2 image, e.g. `talos-v1.7.0.qcow2`.
    pub fn image(&self) -> PathBuf {
        self.work_dir
            .join(format!("talos-{}.qcow2", self.talos_version))
    }

    /// Decompressed raw disk, removed after conversion.
    pub fn raw_image(&self) -> PathBuf {
        self.work_dir
            .join(format!("talos-{}-metal-amd64.raw", self.talos_version))
    }

    /// Downloaded archive; `xz -d` on it yields [`Self::raw_image`].
    pub fn compressed_image(&self) -> PathBuf {
        self.work_dir
            .join(format!("talos-{}-metal-amd64.raw.xz", self.talos_version))
    }

    /// Per-cluster output directory, e.g. `lab-config/`.
    pub fn config_dir(&self) -> PathBuf {
        self.work_dir.join(format!("{}-config", self.cluster_name))
    }

    pub fn machine_config(&self, role: Role) -> PathBuf {
        self.config_dir().join(role.config_file())
    }

    pub fn talosconfig(&self) -> PathBuf {
        self.config_dir().join("talosconfig")
    }

    pub fn kubeconfig(&self) -> PathBuf {
        self.config_dir().join("kubeconfig")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths() -> ArtifactPaths {
        let desc: ClusterDescriptor = serde_yaml::from_str(
            "cluster_name: lab\ntalos_version: v1.7.0\nproxmox: {}\n",
        )
        .unwrap();
        ArtifactPaths::new("/work", &desc)
    }

    #[test]
    fn test_image_files_are_versioned() {
        let p = paths();
        assert_eq!(p.image(), PathBuf::from("/work/talos-v1.7.0.qcow2"));
        assert_eq!(
            p.compressed_image(),
            PathBuf::from("/work/talos-v1.7.0-metal-amd64.raw.xz")
        );
        assert_eq!(
            p.compressed_image().with_extension(""),
            p.raw_image(),
            "xz -d strips exactly the .xz suffix"
        );
    }

    #[test]
    fn test_config_dir_layout() {
        let p = paths();
        assert_eq!(p.config_dir(), PathBuf::from("/work/lab-config"));
        assert_eq!(
            p.machine_config(Role::Controlplane),
            PathBuf::from("/work/lab-config/controlplane.yaml")
        );
        assert_eq!(
            p.machine_config(Role::Worker),
            PathBuf::from("/work/lab-config/worker.yaml")
        );
        assert_eq!(p.kubeconfig(), PathBuf::from("/work/lab-config/kubeconfig"));
        assert_eq!(
            p.talosconfig(),
            PathBuf::from("/work/lab-config/talosconfig")
        );
    }
}
