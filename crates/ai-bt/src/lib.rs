//! Behaviour-graph interpreter built on `ai-core`.
//!
//! A [`Prototype`] is authored once with a [`TreeBuilder`] and instantiated per agent. Each
//! [`TreeInstance`] owns its nodes, local variables and call stacks, and is driven by the host
//! through `update` / `fixed_update` / `late_update`.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod config;
mod ctx;
pub mod error;
mod interpreter;
pub mod node;
pub mod nodes;
mod policy;
mod stack;
pub mod state;
pub mod tree;

pub use config::{ConfigError, ErrorPolicy, TreeConfig};
pub use ctx::NodeCtx;
pub use error::TreeError;
pub use node::{Node, NodeHandle, NodeId, NodeRef, Origin, RawNodeRef, RefVisitor, WeightedRef};
pub use nodes::{
    Action, ActionHandle, ActionNode, ActionStatus, CancelToken, Compare, CompareOp, Decision,
    Determine, DetermineNode, Loop, LoopMode, NodeKind, Parallel, ParallelMode, Probability,
    PseudoProbability, Rollback, RollbackScope, Sequence, SetVariable, Wait, WaitCondition,
};
pub use stack::StackId;
pub use state::{NodeFault, NodeResult, State};
pub use tree::{GraphFault, Halt, Missing, Prototype, TreeBuilder, TreeInstance, TreeStatus};
