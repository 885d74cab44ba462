use std::collections::HashMap;

use crate::descriptor::{ClusterDescriptor, NodeSpec, Role};
use crate::error::ConfigError;

/// Check a descriptor before any stage touches the hypervisor.
pub fn validate(desc: &ClusterDescriptor) -> Result<(), ConfigError> {
    validate_cluster_name(&desc.cluster_name)?;
    validate_talos_version(&desc.talos_version)?;
    if desc.nodes.control_planes.is_empty() {
        return Err(ConfigError::NoControlPlane);
    }

    for node in &desc.nodes.control_planes {
        validate_node(node, Role::Controlplane)?;
    }
    for node in &desc.nodes.workers {
        validate_node(node, Role::Worker)?;
    }

    let mut seen: HashMap<u32, &str> = HashMap::new();
    for node in desc.all_nodes() {
        if node.vm_id == desc.proxmox.template_vm_id {
            return Err(ConfigError::TemplateVmIdConflict {
                vm_id: node.vm_id,
                node: node.name.clone(),
            });
        }
        if let Some(first) = seen.insert(node.vm_id, &node.name) {
            return Err(ConfigError::DuplicateVmId {
                vm_id: node.vm_id,
                first: first.to_string(),
                second: node.name.clone(),
            });
        }
    }

    if let Some(mirrors) = desc.registry_mirrors() {
        for (registry, mirror) in mirrors {
            if mirror.endpoints.iter().all(|e| e.trim().is_empty()) {
                return Err(ConfigError::EmptyMirror {
                    registry: registry.clone(),
                });
            }
        }
    }

    Ok(())
}

/// The cluster name doubles as the output directory name (`<name>-config`).
pub fn validate_cluster_name(name: &str) -> Result<(), ConfigError> {
    if name.trim().is_empty() {
        return Err(ConfigError::MissingField("cluster_name"));
    }
    match path_component_problem(name) {
        Some(reason) => Err(ConfigError::InvalidClusterName {
            name: name.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

/// The Talos version is embedded in the image file names.
pub fn validate_talos_version(version: &str) -> Result<(), ConfigError> {
    if version.trim().is_empty() {
        return Err(ConfigError::MissingField("talos_version"));
    }
    match path_component_problem(version) {
        Some(reason) => Err(ConfigError::InvalidTalosVersion {
            version: version.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

fn path_component_problem(value: &str) -> Option<&'static str> {
    if value.chars().any(|c| c == '/' || c == '\\') {
        return Some("must not contain path separators");
    }
    if value.chars().any(char::is_whitespace) {
        return Some("must not contain whitespace");
    }
    if value == "." || value == ".." {
        return Some("must not be a relative path component");
    }
    None
}

fn validate_node(node: &NodeSpec, expected: Role) -> Result<(), ConfigError> {
    let invalid = |reason| ConfigError::InvalidNode {
        node: if node.name.is_empty() {
            format!("vm {}", node.vm_id)
        } else {
            node.name.clone()
        },
        reason,
    };
    if node.name.trim().is_empty() {
        return Err(invalid("name must not be empty"));
    }
    if node.ip_address.trim().is_empty() {
        return Err(invalid("ip_address must not be empty"));
    }
    if node.cpu == 0 {
        return Err(invalid("cpu must be at least 1"));
    }
    if node.memory == 0 {
        return Err(invalid("memory must be at least 1 MiB"));
    }
    if node.disk.trim().is_empty() {
        return Err(invalid("disk size must not be empty"));
    }
    if let Some(declared) = node.role {
        if declared != expected {
            return Err(ConfigError::RoleMismatch {
                node: node.name.clone(),
                declared,
                expected,
            });
        }
    }
    Ok(())
}
