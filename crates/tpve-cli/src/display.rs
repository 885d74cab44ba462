use serde::Serialize;
use tabled::Tabled;
use tpve_core::descriptor::{ClusterDescriptor, NodeSpec, Role};

/// Display row for `validate`.
#[derive(Debug, Serialize, Tabled)]
pub struct NodeRow {
    #[tabled(rename = "NAME")]
    pub name: String,
    #[tabled(rename = "ROLE")]
    pub role: Role,
    #[tabled(rename = "VMID")]
    pub vm_id: u32,
    #[tabled(rename = "IP")]
    pub ip_address: String,
    #[tabled(rename = "CPU")]
    pub cpu: u32,
    #[tabled(rename = "MEM (MiB)")]
    pub memory: u32,
    #[tabled(rename = "DISK")]
    pub disk: String,
}

impl NodeRow {
    fn new(node: &NodeSpec, role: Role) -> Self {
        Self {
            name: node.name.clone(),
            role,
            vm_id: node.vm_id,
            ip_address: node.ip_address.clone(),
            cpu: node.cpu,
            memory: node.memory,
            disk: node.disk.clone(),
        }
    }
}

/// Rows for every node, control planes first.
pub fn node_rows(desc: &ClusterDescriptor) -> Vec<NodeRow> {
    let cps = desc
        .nodes
        .control_planes
        .iter()
        .map(|n| NodeRow::new(n, Role::Controlplane));
    let workers = desc
        .nodes
        .workers
        .iter()
        .map(|n| NodeRow::new(n, Role::Worker));
    cps.chain(workers).collect()
}

/// Serialized form of `validate -o json|yaml`.
#[derive(Debug, Serialize)]
pub struct ClusterSummary {
    pub cluster_name: String,
    pub talos_version: String,
    pub kubernetes_version: String,
    pub proxmox_host: String,
    pub storage_pool: String,
    pub template_vm_id: u32,
    pub registry_mirrors: Vec<String>,
    pub nodes: Vec<NodeRow>,
}

impl ClusterSummary {
    pub fn new(desc: &ClusterDescriptor) -> Self {
        Self {
            cluster_name: desc.cluster_name.clone(),
            talos_version: desc.talos_version.clone(),
            kubernetes_version: desc.kubernetes_version.clone(),
            proxmox_host: desc.proxmox.host.clone(),
            storage_pool: desc.proxmox.storage_pool.clone(),
            template_vm_id: desc.proxmox.template_vm_id,
            registry_mirrors: desc
                .registry_mirrors()
                .map(|m| m.keys().cloned().collect())
                .unwrap_or_default(),
            nodes: node_rows(desc),
        }
    }
}
