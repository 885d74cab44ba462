//! Interactive `init`: ask for cluster settings and write a descriptor.

use anyhow::{Context, Result};
use inquire::{Confirm, CustomType, Text};
use tpve_core::descriptor::{
    ClusterDescriptor, NetworkConfig, NodeSpec, NodesConfig, ProxmoxConfig, ProxyConfig, Role,
};

const DEFAULT_NO_PROXY: &str = "localhost,127.0.0.1,192.168.0.0/16,10.0.0.0/8";

fn control_plane(i: usize) -> NodeSpec {
    NodeSpec {
        vm_id: 101 + i as u32,
        ip_address: format!("192.168.1.{}", 101 + i),
        name: format!("talos-cp-{}", i + 1),
        cpu: 2,
        memory: 2048,
        disk: "20G".to_string(),
        role: Some(Role::Controlplane),
    }
}

fn worker(i: usize) -> NodeSpec {
    NodeSpec {
        vm_id: 201 + i as u32,
        ip_address: format!("192.168.1.{}", 201 + i),
        name: format!("talos-worker-{}", i + 1),
        cpu: 4,
        memory: 4096,
        disk: "50G".to_string(),
        role: Some(Role::Worker),
    }
}

/// Descriptor the wizard proposes before asking anything.
pub fn default_descriptor(control_planes: usize, workers: usize) -> ClusterDescriptor {
    ClusterDescriptor {
        cluster_name: "talos-proxmox-cluster".to_string(),
        talos_version: "v1.7.0".to_string(),
        kubernetes_version: String::new(),
        network: NetworkConfig {
            dns_server: "8.8.8.8".to_string(),
            gateway: "192.168.1.1".to_string(),
            ..NetworkConfig::default()
        },
        proxmox: ProxmoxConfig {
            host: "pve".to_string(),
            user: "root@pam".to_string(),
            ..ProxmoxConfig::default()
        },
        nodes: NodesConfig {
            control_planes: (0..control_planes).map(control_plane).collect(),
            workers: (0..workers).map(worker).collect(),
        },
        proxy: ProxyConfig::default(),
        registry: None,
    }
}

fn ask(label: &str, default: &str) -> Result<String> {
    Text::new(label)
        .with_default(default)
        .prompt()
        .with_context(|| format!("prompt '{label}' aborted"))
}

fn ask_num<T>(label: &str, default: T) -> Result<T>
where
    T: Clone + std::str::FromStr + ToString,
{
    CustomType::<T>::new(label)
        .with_default(default)
        .with_error_message("Please enter a number")
        .prompt()
        .with_context(|| format!("prompt '{label}' aborted"))
}

fn ask_node(node: &mut NodeSpec) -> Result<()> {
    node.vm_id = ask_num("VM ID", node.vm_id)?;
    node.ip_address = ask("IP address", &node.ip_address)?;
    node.name = ask("Hostname", &node.name)?;
    Ok(())
}

/// Walk the user through every section, starting from the defaults.
pub fn prompt_descriptor() -> Result<ClusterDescriptor> {
    let mut desc = default_descriptor(0, 0);

    println!("Cluster");
    desc.cluster_name = ask("Cluster name", &desc.cluster_name)?;
    desc.talos_version = ask("Talos version", &desc.talos_version)?;
    desc.kubernetes_version = ask("Kubernetes version (empty for Talos default)", "")?;

    println!("\nNetwork");
    desc.network.bridge = ask("Bridge", &desc.network.bridge)?;
    desc.network.dns_server = ask("DNS server", &desc.network.dns_server)?;
    desc.network.gateway = ask("Gateway", &desc.network.gateway)?;
    desc.network.netmask = ask_num("Netmask bits", desc.network.netmask)?;

    println!("\nProxmox");
    desc.proxmox.host = ask("Host", &desc.proxmox.host)?;
    desc.proxmox.user = ask("User", &desc.proxmox.user)?;
    desc.proxmox.storage_pool = ask("Storage pool", &desc.proxmox.storage_pool)?;
    desc.proxmox.template_vm_id = ask_num("Template VM ID", desc.proxmox.template_vm_id)?;

    println!("\nNodes");
    let cp_count: usize = ask_num("Control-plane nodes", 3)?;
    for i in 0..cp_count {
        println!("\nControl-plane node {}", i + 1);
        let mut node = control_plane(i);
        ask_node(&mut node)?;
        desc.nodes.control_planes.push(node);
    }
    let worker_count: usize = ask_num("Worker nodes", 2)?;
    for i in 0..worker_count {
        println!("\nWorker node {}", i + 1);
        let mut node = worker(i);
        ask_node(&mut node)?;
        desc.nodes.workers.push(node);
    }

    println!("\nProxy (optional)");
    let enabled = Confirm::new("Use an HTTP proxy or download mirror?")
        .with_default(false)
        .prompt()
        .context("prompt aborted")?;
    if enabled {
        let proxy = &mut desc.proxy;
        proxy.enabled = true;
        proxy.http_proxy = ask("HTTP proxy (empty to skip)", "")?;
        proxy.https_proxy = ask("HTTPS proxy (empty reuses HTTP proxy)", "")?;
        if proxy.https_proxy.is_empty() {
            proxy.https_proxy = proxy.http_proxy.clone();
        }
        proxy.no_proxy = ask("No-proxy list", DEFAULT_NO_PROXY)?;
        proxy.mirror_url = ask("Talos image mirror URL (empty for GitHub)", "")?;
    }

    Ok(desc)
}
