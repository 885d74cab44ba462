use tpve_core::stage::{Stage, StageSelection};

/// External programs the enabled deploy stages shell out to, deduplicated,
/// in first-use order.
pub fn required_tools(selection: &StageSelection) -> Vec<&'static str> {
    let mut tools: Vec<&'static str> = Vec::new();
    for stage in selection.enabled() {
        let needed: &[&'static str] = match stage {
            Stage::PrepareImage => &["wget", "xz", "qemu-img"],
            Stage::CreateTemplate | Stage::CreateNodes => &["qm"],
            Stage::GenerateConfig | Stage::ApplyConfig | Stage::Bootstrap => &["talosctl"],
            _ => &[],
        };
        for tool in needed {
            if !tools.contains(tool) {
                tools.push(tool);
            }
        }
    }
    tools
}

/// Tools from `tools` that cannot be found on `PATH`.
pub fn missing_tools<'a>(tools: &[&'a str]) -> Vec<&'a str> {
    tools
        .iter()
        .copied()
        .filter(|t| which::which(t).is_err())
        .collect()
}
