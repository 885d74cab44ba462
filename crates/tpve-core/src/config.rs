use std::path::PathBuf;
use std::time::Duration;

/// Descriptor file read when `--config` is not given.
pub const DEFAULT_DESCRIPTOR_FILE: &str = "cluster-config.yaml";

/// Canonical Talos release download location, suffixed with `/<version>/<asset>`.
pub const TALOS_RELEASE_BASE: &str = "https://github.com/siderolabs/talos/releases/download";

/// Compressed bare-metal disk image published with every Talos release.
pub const METAL_IMAGE_ASSET: &str = "metal-amd64.raw.xz";

/// qcow2 layout used when converting the raw image.
pub const QCOW2_OPTIONS: &str =
    "cluster_size=64k,preallocation=metadata,lazy_refcounts=on,compression_type=zlib";

/// Name given to the golden template VM on the hypervisor.
pub const TEMPLATE_NAME: &str = "talos-template";

/// Kubernetes API port on the first control-plane node.
pub const KUBE_API_PORT: u16 = 6443;

/// Timeout handed to `talosctl apply-config` and `talosctl bootstrap`.
pub const TALOSCTL_TIMEOUT: &str = "5m";

/// Pause after powering on a freshly cloned node.
pub const NODE_START_SETTLE: Duration = Duration::from_secs(2);

/// Pause after each machine-config push.
pub const CONFIG_APPLY_SETTLE: Duration = Duration::from_secs(5);

/// Pause before bootstrapping etcd on the first control plane.
pub const BOOTSTRAP_SETTLE: Duration = Duration::from_secs(30);

/// Pause between stopping and destroying a node during teardown.
pub const DESTROY_STOP_SETTLE: Duration = Duration::from_secs(1);

/// Get the directory holding image artifacts and per-cluster output.
/// Priority: runtime env `TALOS_PVE_WORKDIR` > current directory.
pub fn work_dir() -> PathBuf {
    std::env::var_os("TALOS_PVE_WORKDIR")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}
