use ai_core::VariableError;
use thiserror::Error;

use crate::{NodeFault, NodeId};

/// Errors surfaced to the host by building or driving a tree.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TreeError {
    #[error("duplicate node id {0}")]
    DuplicateNode(NodeId),

    #[error("tree has no resolvable root node")]
    MissingRoot,

    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    #[error("node {0} is not an action")]
    NotAnAction(NodeId),

    #[error("node {node} faulted: {fault}")]
    Fault { node: NodeId, fault: NodeFault },

    #[error(transparent)]
    Variable(#[from] VariableError),
}
