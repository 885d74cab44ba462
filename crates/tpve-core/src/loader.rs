use std::path::Path;

use tracing::debug;

use crate::descriptor::ClusterDescriptor;
use crate::error::ConfigError;
use crate::validate::validate;

/// Read a descriptor file. Format follows the extension: `.toml`, `.json`,
/// anything else is YAML.
pub fn load(path: &Path) -> Result<ClusterDescriptor, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let parse_err = |reason: String| ConfigError::Parse {
        path: path.to_path_buf(),
        reason,
    };

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    let desc: ClusterDescriptor = match ext.as_deref() {
        Some("toml") => toml::from_str(&text).map_err(|e| parse_err(e.to_string()))?,
        Some("json") => serde_json::from_str(&text).map_err(|e| parse_err(e.to_string()))?,
        _ => serde_yaml::from_str(&text).map_err(|e| parse_err(e.to_string()))?,
    };
    debug!(path = %path.display(), "loaded cluster descriptor");
    Ok(desc)
}

/// Load and validate in one step.
pub fn load_and_validate(path: &Path) -> Result<ClusterDescriptor, ConfigError> {
    let desc = load(path)?;
    validate(&desc)?;
    Ok(desc)
}
