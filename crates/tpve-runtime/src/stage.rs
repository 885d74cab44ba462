use tpve_core::descriptor::NodeSpec;
use tpve_core::error::StageError;
use tracing::warn;

/// How a per-node stage reacts to a failing node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecPolicy {
    /// Stop at the first failure and return it, tagged with the node name.
    FailFast,
    /// Log the failure, remember it and move on to the next node.
    ContinueOnError,
}

/// A node that failed under [`ExecPolicy::ContinueOnError`].
#[derive(Debug)]
pub struct NodeFailure {
    pub node: String,
    pub vm_id: u32,
    pub error: StageError,
}

/// Run `op` for each node in order under `policy`.
pub fn for_each_node<'n, I, F>(
    policy: ExecPolicy,
    nodes: I,
    mut op: F,
) -> Result<Vec<NodeFailure>, StageError>
where
    I: IntoIterator<Item = &'n NodeSpec>,
    F: FnMut(&NodeSpec) -> Result<(), StageError>,
{
    let mut failures = Vec::new();
    for node in nodes {
        let Err(error) = op(node) else { continue };
        match policy {
            ExecPolicy::FailFast => {
                return Err(StageError::Node {
                    node: node.name.clone(),
                    source: Box::new(error),
                });
            }
            ExecPolicy::ContinueOnError => {
                warn!(
                    node = %node.name,
                    vm_id = node.vm_id,
                    error = %error,
                    "node operation failed, continuing"
                );
                failures.push(NodeFailure {
                    node: node.name.clone(),
                    vm_id: node.vm_id,
                    error,
                });
            }
        }
    }
    Ok(failures)
}
