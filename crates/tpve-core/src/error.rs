//! Error taxonomy for the deployment engine.
//!
//! Provisioning stages are fail-fast and surface a [`DeployError`] naming the
//! stage. Lifecycle stages are best-effort and only log per-node failures, so
//! they rarely produce an error at all.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::descriptor::Role;
use crate::stage::Stage;

/// Malformed or missing descriptor content.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read descriptor {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse descriptor {}: {reason}", .path.display())]
    Parse { path: PathBuf, reason: String },

    #[error("{0} must not be empty")]
    MissingField(&'static str),

    #[error("invalid cluster name {name:?}: {reason}")]
    InvalidClusterName { name: String, reason: &'static str },

    #[error("invalid Talos version {version:?}: {reason}")]
    InvalidTalosVersion {
        version: String,
        reason: &'static str,
    },

    #[error("at least one control-plane node is required")]
    NoControlPlane,

    #[error("node {node:?} is invalid: {reason}")]
    InvalidNode { node: String, reason: &'static str },

    #[error("node {node:?} is declared as {declared} but listed under {expected} nodes")]
    RoleMismatch {
        node: String,
        declared: Role,
        expected: Role,
    },

    #[error("VM ID {vm_id} is used by both {first:?} and {second:?}")]
    DuplicateVmId {
        vm_id: u32,
        first: String,
        second: String,
    },

    #[error("node {node:?} reuses the template VM ID {vm_id}")]
    TemplateVmIdConflict { vm_id: u32, node: String },

    #[error("registry mirror for {registry:?} has no endpoints")]
    EmptyMirror { registry: String },
}

/// An external tool could not be spawned or exited unsuccessfully.
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("failed to run `{command}`")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("`{command}` exited with status {}", exit_status(.code))]
    Exit { command: String, code: Option<i32> },
}

fn exit_status(code: &Option<i32>) -> String {
    match code {
        Some(c) => c.to_string(),
        None => "signal".to_string(),
    }
}

/// Failure inside one stage, before it is tagged with the stage name.
#[derive(Error, Debug)]
pub enum StageError {
    #[error("image download failed")]
    Download(#[source] CommandError),

    #[error("image decompression failed")]
    Decompress(#[source] CommandError),

    #[error("image conversion failed")]
    Convert(#[source] CommandError),

    #[error("{step} failed")]
    Step {
        step: &'static str,
        #[source]
        source: CommandError,
    },

    #[error("node {node} failed")]
    Node {
        node: String,
        #[source]
        source: Box<StageError>,
    },

    #[error("failed to patch {}", .path.display())]
    Patch {
        path: PathBuf,
        #[source]
        source: Box<StageError>,
    },

    #[error("filesystem operation on {} failed", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to encode registry patch")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl StageError {
    pub fn step(step: &'static str) -> impl FnOnce(CommandError) -> StageError {
        move |source| StageError::Step { step, source }
    }

    pub fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> StageError {
        let path = path.into();
        move |source| StageError::Io { path, source }
    }
}

/// Terminal error of a pipeline run.
#[derive(Error, Debug)]
pub enum DeployError {
    #[error("invalid cluster descriptor")]
    Config(#[from] ConfigError),

    #[error("stage {stage} failed")]
    Stage {
        stage: Stage,
        #[source]
        source: StageError,
    },
}

impl DeployError {
    /// Stage the run stopped at, if it got past validation.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            DeployError::Config(_) => None,
            DeployError::Stage { stage, .. } => Some(*stage),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_exit_error_reports_code_or_signal() {
        let err = CommandError::Exit {
            command: "qm start 101".to_string(),
            code: Some(2),
        };
        assert_eq!(err.to_string(), "`qm start 101` exited with status 2");

        let err = CommandError::Exit {
            command: "qm start 101".to_string(),
            code: None,
        };
        assert!(err.to_string().ends_with("status signal"));
    }

    #[test]
    fn test_node_error_chains_to_command() {
        let inner = StageError::step("clone")(CommandError::Exit {
            command: "qm clone 9000 101".to_string(),
            code: Some(1),
        });
        let err = DeployError::Stage {
            stage: Stage::CreateNodes,
            source: StageError::Node {
                node: "cp1".to_string(),
                source: Box::new(inner),
            },
        };

        assert_eq!(err.stage(), Some(Stage::CreateNodes));
        let mut chain = Vec::new();
        let mut cur: Option<&dyn std::error::Error> = Some(&err);
        while let Some(e) = cur {
            chain.push(e.to_string());
            cur = e.source();
        }
        assert_eq!(
            chain,
            vec![
                "stage node-create failed",
                "node cp1 failed",
                "clone failed",
                "`qm clone 9000 101` exited with status 1",
            ]
        );
    }
}
