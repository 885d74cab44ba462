use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Desired shape of one Talos cluster on one Proxmox host.
/// Read-only input to every deployment stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterDescriptor {
    #[serde(default)]
    pub cluster_name: String,
    #[serde(default)]
    pub talos_version: String,
    /// Forwarded to `talosctl gen config` when non-empty.
    #[serde(default)]
    pub kubernetes_version: String,
    #[serde(default)]
    pub network: NetworkConfig,
    pub proxmox: ProxmoxConfig,
    #[serde(default)]
    pub nodes: NodesConfig,
    #[serde(default)]
    pub proxy: ProxyConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry: Option<RegistryConfig>,
}

impl ClusterDescriptor {
    /// Control planes first, then workers, each in declaration order.
    pub fn all_nodes(&self) -> impl Iterator<Item = &NodeSpec> {
        self.nodes
            .control_planes
            .iter()
            .chain(self.nodes.workers.iter())
    }

    pub fn first_control_plane(&self) -> Option<&NodeSpec> {
        self.nodes.control_planes.first()
    }

    pub fn control_plane_addresses(&self) -> Vec<&str> {
        self.nodes
            .control_planes
            .iter()
            .map(|n| n.ip_address.as_str())
            .collect()
    }

    /// Registry mirrors to patch into machine configs, if any are declared.
    pub fn registry_mirrors(&self) -> Option<&BTreeMap<String, RegistryMirror>> {
        self.registry
            .as_ref()
            .map(|r| &r.mirrors)
            .filter(|m| !m.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_bridge")]
    pub bridge: String,
    #[serde(default)]
    pub dns_server: String,
    #[serde(default)]
    pub gateway: String,
    /// Subnet prefix length in bits. Quoted values (`"24"`) are accepted.
    #[serde(default = "default_netmask", deserialize_with = "deserialize_netmask")]
    pub netmask: u8,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bridge: default_bridge(),
            dns_server: String::new(),
            gateway: String::new(),
            netmask: default_netmask(),
        }
    }
}

fn default_bridge() -> String {
    "vmbr0".to_string()
}

fn default_netmask() -> u8 {
    24
}

fn deserialize_netmask<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Bits(u8),
        Text(String),
    }

    let bits = match Raw::deserialize(deserializer)? {
        Raw::Bits(bits) => bits,
        Raw::Text(text) if text.trim().is_empty() => default_netmask(),
        Raw::Text(text) => text.trim().parse().map_err(|_| {
            serde::de::Error::invalid_value(
                serde::de::Unexpected::Str(&text),
                &"a prefix length between 0 and 32",
            )
        })?,
    };
    if bits > 32 {
        return Err(serde::de::Error::invalid_value(
            serde::de::Unexpected::Unsigned(u64::from(bits)),
            &"a prefix length between 0 and 32",
        ));
    }
    Ok(bits)
}

/// Hypervisor connection and placement settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxmoxConfig {
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub user: String,
    /// "api_token" | "password"; absent means token-then-password fallback.
    #[serde(
        default,
        deserialize_with = "deserialize_auth_method",
        skip_serializing_if = "Option::is_none"
    )]
    pub auth_method: Option<AuthMethod>,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub api_token_id: String,
    #[serde(default)]
    pub api_token: String,
    #[serde(default)]
    pub skip_tls_verify: bool,
    #[serde(default = "default_storage_pool")]
    pub storage_pool: String,
    #[serde(default = "default_template_vm_id")]
    pub template_vm_id: u32,
}

impl Default for ProxmoxConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            user: String::new(),
            auth_method: None,
            password: String::new(),
            api_token_id: String::new(),
            api_token: String::new(),
            skip_tls_verify: false,
            storage_pool: default_storage_pool(),
            template_vm_id: default_template_vm_id(),
        }
    }
}

fn default_storage_pool() -> String {
    "local-lvm".to_string()
}

fn default_template_vm_id() -> u32 {
    9000
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    ApiToken,
    Password,
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMethod::ApiToken => f.write_str("api_token"),
            AuthMethod::Password => f.write_str("password"),
        }
    }
}

/// Hand-written descriptors often carry `auth_method: ""`; treat that as unset.
fn deserialize_auth_method<'de, D>(deserializer: D) -> Result<Option<AuthMethod>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some("api_token") => Ok(Some(AuthMethod::ApiToken)),
        Some("password") => Ok(Some(AuthMethod::Password)),
        Some(other) => Err(serde::de::Error::unknown_variant(
            other,
            &["api_token", "password"],
        )),
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodesConfig {
    #[serde(default)]
    pub control_planes: Vec<NodeSpec>,
    #[serde(default)]
    pub workers: Vec<NodeSpec>,
}

/// One cluster node: identity on the hypervisor plus its resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub vm_id: u32,
    pub ip_address: String,
    pub name: String,
    pub cpu: u32,
    /// MiB
    pub memory: u32,
    /// Size descriptor understood by `qm set`, e.g. "32G".
    pub disk: String,
    /// Defaults to the list the node is declared in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[serde(alias = "control-plane", alias = "control_plane")]
    Controlplane,
    Worker,
}

impl Role {
    /// Machine configuration document generated for this role.
    pub fn config_file(&self) -> &'static str {
        match self {
            Role::Controlplane => "controlplane.yaml",
            Role::Worker => "worker.yaml",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Controlplane => f.write_str("controlplane"),
            Role::Worker => f.write_str("worker"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProxyConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub http_proxy: String,
    #[serde(default)]
    pub https_proxy: String,
    #[serde(default)]
    pub no_proxy: String,
    /// Base URL replacing the GitHub release location for image downloads.
    #[serde(default)]
    pub mirror_url: String,
}

impl ProxyConfig {
    /// Mirror base URL, only when proxying is enabled and a mirror is set.
    pub fn active_mirror(&self) -> Option<&str> {
        let url = self.mirror_url.trim_end_matches('/');
        (self.enabled && !url.is_empty()).then_some(url)
    }
}

/// Container registry mirrors keyed by registry hostname.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default)]
    pub mirrors: BTreeMap<String, RegistryMirror>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryMirror {
    pub endpoints: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(vm_id: u32, ip: &str, name: &str) -> NodeSpec {
        NodeSpec {
            vm_id,
            ip_address: ip.to_string(),
            name: name.to_string(),
            cpu: 2,
            memory: 4096,
            disk: "32G".to_string(),
            role: None,
        }
    }

    #[test]
    fn test_all_nodes_lists_control_planes_first() {
        let yaml = r#"
cluster_name: lab
talos_version: v1.7.0
proxmox:
  host: pve.local
  user: root@pam
nodes:
  workers:
    - { vm_id: 201, ip_address: 10.0.0.21, name: w1, cpu: 2, memory: 4096, disk: 32G }
  control_planes:
    - { vm_id: 101, ip_address: 10.0.0.11, name: cp1, cpu: 2, memory: 4096, disk: 32G }
    - { vm_id: 102, ip_address: 10.0.0.12, name: cp2, cpu: 2, memory: 4096, disk: 32G }
"#;
        let desc: ClusterDescriptor = serde_yaml::from_str(yaml).unwrap();
        let ids: Vec<u32> = desc.all_nodes().map(|n| n.vm_id).collect();
        assert_eq!(ids, vec![101, 102, 201]);
        assert_eq!(desc.first_control_plane().unwrap().name, "cp1");
        assert_eq!(
            desc.control_plane_addresses(),
            vec!["10.0.0.11", "10.0.0.12"]
        );
    }

    #[test]
    fn test_defaults_applied() {
        let desc: ClusterDescriptor =
            serde_yaml::from_str("cluster_name: lab\nproxmox: {}\n").unwrap();
        assert_eq!(desc.network.bridge, "vmbr0");
        assert_eq!(desc.network.netmask, 24);
        assert_eq!(desc.proxmox.storage_pool, "local-lvm");
        assert_eq!(desc.proxmox.template_vm_id, 9000);
        assert!(desc.proxmox.auth_method.is_none());
        assert!(!desc.proxy.enabled);
        assert!(desc.registry_mirrors().is_none());
    }

    #[test]
    fn test_empty_auth_method_is_unset() {
        let cfg: ProxmoxConfig = serde_yaml::from_str("auth_method: \"\"\n").unwrap();
        assert_eq!(cfg.auth_method, None);

        let cfg: ProxmoxConfig = serde_yaml::from_str("auth_method: api_token\n").unwrap();
        assert_eq!(cfg.auth_method, Some(AuthMethod::ApiToken));
    }

    #[test]
    fn test_netmask_accepts_number_or_string() {
        let net: NetworkConfig = serde_yaml::from_str("netmask: 16\n").unwrap();
        assert_eq!(net.netmask, 16);
        let net: NetworkConfig = serde_yaml::from_str("netmask: \"24\"\n").unwrap();
        assert_eq!(net.netmask, 24);
        let net: NetworkConfig = serde_yaml::from_str("netmask: \"\"\n").unwrap();
        assert_eq!(net.netmask, 24);

        assert!(serde_yaml::from_str::<NetworkConfig>("netmask: \"wide\"\n").is_err());
        assert!(serde_yaml::from_str::<NetworkConfig>("netmask: 33\n").is_err());
    }

    #[test]
    fn test_unknown_auth_method_rejected() {
        let result: Result<ProxmoxConfig, _> = serde_yaml::from_str("auth_method: kerberos\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_role_aliases() {
        let n: NodeSpec = serde_yaml::from_str(
            "{ vm_id: 1, ip_address: a, name: n, cpu: 1, memory: 1, disk: 1G, role: control-plane }",
        )
        .unwrap();
        assert_eq!(n.role, Some(Role::Controlplane));
        assert_eq!(Role::Worker.config_file(), "worker.yaml");
    }

    #[test]
    fn test_active_mirror_requires_enabled_proxy() {
        let mut proxy = ProxyConfig {
            mirror_url: "https://mirror.example/talos/".to_string(),
            ..Default::default()
        };
        assert_eq!(proxy.active_mirror(), None);
        proxy.enabled = true;
        assert_eq!(proxy.active_mirror(), Some("https://mirror.example/talos"));
    }

    #[test]
    fn test_empty_registry_has_no_mirrors() {
        let mut desc: ClusterDescriptor =
            serde_yaml::from_str("cluster_name: lab\nproxmox: {}\n").unwrap();
        desc.registry = Some(RegistryConfig::default());
        assert!(desc.registry_mirrors().is_none());
        desc.nodes.control_planes.push(node(101, "10.0.0.11", "cp1"));
        assert_eq!(desc.all_nodes().count(), 1);
    }
}
