use ai_core::VariableError;
use thiserror::Error;

use crate::NodeId;

/// Result vocabulary of a single node invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    Success,
    Failed,
    /// The node delegated to a child and has no value yet.
    NoReturnYet,
    /// Suspend; re-enter the same node on the next tick.
    Yield,
    /// Suspend until the node's action handle is completed from outside.
    WaitOnAsyncAction,
    /// Unrecoverable; handled by the tree's error policy.
    Error,
}

impl State {
    pub fn from_bool(success: bool) -> Self {
        if success {
            State::Success
        } else {
            State::Failed
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, State::Success | State::Failed)
    }

    pub fn as_bool(self) -> Option<bool> {
        match self {
            State::Success => Some(true),
            State::Failed => Some(false),
            _ => None,
        }
    }
}

/// A fault raised while executing a node or while its async work was in flight.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NodeFault {
    #[error(transparent)]
    Variable(#[from] VariableError),

    #[error("node {node}: required reference `{field}` is unresolved")]
    Unresolved { node: NodeId, field: &'static str },

    #[error("node {0} is already running on another call stack")]
    AlreadyRunning(NodeId),

    #[error("node {0} returned NoReturnYet without delegating")]
    MissingDelegation(NodeId),

    #[error("node {node}: negative weight {weight}")]
    NegativeWeight { node: NodeId, weight: i32 },

    #[error("node {node}: rollback target {target} is not on the call stack")]
    RollbackTarget { node: NodeId, target: NodeId },

    #[error("{} parallel branch fault(s), first: {}", .0.len(), .0.first().map(|f| f.to_string()).unwrap_or_default())]
    Parallel(Vec<NodeFault>),

    #[error("node {0} reported an error state")]
    Reported(NodeId),

    #[error("{0}")]
    Action(String),
}

impl NodeFault {
    pub fn action(message: impl Into<String>) -> Self {
        NodeFault::Action(message.into())
    }
}

pub type NodeResult = Result<State, NodeFault>;
