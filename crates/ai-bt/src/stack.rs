use std::fmt;

use crate::nodes::ParallelMode;
use crate::{NodeFault, NodeHandle};

/// Identifier of one call stack inside an instance. Ids grow in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StackId(pub(crate) u64);

impl fmt::Display for StackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct GroupId(pub(crate) u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StackRole {
    Main,
    /// Runs service `entry` for as long as `host` is active.
    Service { host: NodeHandle, entry: NodeHandle },
    /// One branch of a parallel group.
    Branch { group: GroupId, index: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Suspension {
    Yield,
    Async,
    Parallel(GroupId),
}

/// What a call stack does next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Cursor {
    /// Execute a node from scratch.
    Enter(NodeHandle),
    Suspended {
        node: NodeHandle,
        on: Suspension,
        /// Host call in which the node suspended.
        since: u64,
    },
    /// Deliver a result to the top frame.
    Return(bool),
    /// Re-enter `entry` on a later tick (finished services, looping main stacks).
    Restart { entry: NodeHandle, since: u64 },
    /// Halted on a fault, waiting for the host to resume or reset.
    Faulted(NodeHandle),
}

impl Cursor {
    /// Node that is currently active at the top of the stack, if any.
    pub(crate) fn active_node(&self) -> Option<NodeHandle> {
        match *self {
            Cursor::Suspended { node, .. } | Cursor::Faulted(node) => Some(node),
            Cursor::Enter(_) | Cursor::Return(_) | Cursor::Restart { .. } => None,
        }
    }
}

/// Frames of interrupted ancestors plus a cursor for the node on top.
#[derive(Debug, Clone)]
pub(crate) struct CallStack {
    pub(crate) role: StackRole,
    pub(crate) frames: Vec<NodeHandle>,
    pub(crate) cursor: Cursor,
    steps: u32,
    steps_serial: u64,
}

impl CallStack {
    pub(crate) fn new(role: StackRole, entry: NodeHandle) -> Self {
        Self {
            role,
            frames: Vec::new(),
            cursor: Cursor::Enter(entry),
            steps: 0,
            steps_serial: 0,
        }
    }

    pub(crate) fn has_budget(&self, serial: u64, budget: u32) -> bool {
        self.steps_serial != serial || self.steps < budget
    }

    /// Count one trampoline step for host call `serial`; false once `budget` is used up.
    pub(crate) fn take_step(&mut self, serial: u64, budget: u32) -> bool {
        if self.steps_serial != serial {
            self.steps_serial = serial;
            self.steps = 0;
        }
        if self.steps >= budget {
            return false;
        }
        self.steps += 1;
        true
    }

    /// Active frames plus the active top node, bottom first.
    pub(crate) fn active_nodes(&self) -> impl Iterator<Item = NodeHandle> + '_ {
        self.frames.iter().copied().chain(self.cursor.active_node())
    }

    pub(crate) fn depth(&self) -> usize {
        self.active_nodes().count()
    }
}

/// Branch stacks started by one parallel node.
#[derive(Debug, Clone)]
pub(crate) struct ParallelGroup {
    pub(crate) owner: NodeHandle,
    pub(crate) owner_stack: StackId,
    pub(crate) mode: ParallelMode,
    pub(crate) branches: Vec<StackId>,
    pub(crate) results: Vec<Option<bool>>,
    pub(crate) faults: Vec<NodeFault>,
}

impl ParallelGroup {
    pub(crate) fn new(owner: NodeHandle, owner_stack: StackId, mode: ParallelMode) -> Self {
        Self {
            owner,
            owner_stack,
            mode,
            branches: Vec::new(),
            results: Vec::new(),
            faults: Vec::new(),
        }
    }

    /// Record a branch result; returns the group result once it is decided.
    pub(crate) fn record(&mut self, index: usize, success: bool) -> Option<bool> {
        if let Some(slot) = self.results.get_mut(index) {
            *slot = Some(success);
        }
        match self.mode {
            ParallelMode::WaitAny => Some(success),
            ParallelMode::WaitAll => {
                if self.results.iter().all(Option::is_some) {
                    Some(self.results.iter().all(|r| *r == Some(true)))
                } else {
                    None
                }
            }
        }
    }
}
