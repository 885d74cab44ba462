use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

/// Named units of work. The first six form the deploy pipeline, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    PrepareImage,
    CreateTemplate,
    CreateNodes,
    GenerateConfig,
    ApplyConfig,
    Bootstrap,
    StartNodes,
    StopNodes,
    Destroy,
    Verify,
}

impl Stage {
    /// Fixed deploy order.
    pub const DEPLOY: [Stage; 6] = [
        Stage::PrepareImage,
        Stage::CreateTemplate,
        Stage::CreateNodes,
        Stage::GenerateConfig,
        Stage::ApplyConfig,
        Stage::Bootstrap,
    ];

    /// Whether the stage belongs to the deploy pipeline.
    pub fn is_deploy(&self) -> bool {
        Stage::DEPLOY.contains(self)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Stage::PrepareImage => "image-prepare",
            Stage::CreateTemplate => "template-create",
            Stage::CreateNodes => "node-create",
            Stage::GenerateConfig => "config-generate",
            Stage::ApplyConfig => "config-apply",
            Stage::Bootstrap => "bootstrap",
            Stage::StartNodes => "node-start",
            Stage::StopNodes => "node-stop",
            Stage::Destroy => "destroy",
            Stage::Verify => "verify",
        }
    }

    /// Short human description for progress output.
    pub fn describe(&self) -> &'static str {
        match self {
            Stage::PrepareImage => "Preparing Talos disk image",
            Stage::CreateTemplate => "Creating template VM",
            Stage::CreateNodes => "Creating cluster nodes",
            Stage::GenerateConfig => "Generating machine configuration",
            Stage::ApplyConfig => "Applying machine configuration",
            Stage::Bootstrap => "Bootstrapping Kubernetes",
            Stage::StartNodes => "Starting nodes",
            Stage::StopNodes => "Stopping nodes",
            Stage::Destroy => "Destroying cluster",
            Stage::Verify => "Verifying cluster",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which deploy stages a run executes. Everything is enabled by default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageSelection {
    skipped: BTreeSet<Stage>,
}

impl StageSelection {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn skip(mut self, stage: Stage) -> Self {
        self.skipped.insert(stage);
        self
    }

    /// Skip `stage` when `flag` is set; convenient for CLI switches.
    pub fn skip_if(self, flag: bool, stage: Stage) -> Self {
        if flag { self.skip(stage) } else { self }
    }

    pub fn is_enabled(&self, stage: Stage) -> bool {
        !self.skipped.contains(&stage)
    }

    /// Enabled deploy stages in pipeline order.
    pub fn enabled(&self) -> Vec<Stage> {
        Stage::DEPLOY
            .into_iter()
            .filter(|s| self.is_enabled(*s))
            .collect()
    }
}
