use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use ai_core::{VarField, WorldMut};
use serde::{Deserialize, Serialize};

use crate::nodes::NodeKind;
use crate::stack::StackId;

/// Stable, serialisable node identifier, unique within a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

impl From<u64> for NodeId {
    fn from(value: u64) -> Self {
        NodeId(value)
    }
}

/// Index of a live node in one instance's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeHandle(pub(crate) usize);

impl NodeHandle {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Structural edge to a child node: resolved to a handle once per instance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeRef {
    id: Option<NodeId>,
    handle: Option<NodeHandle>,
}

impl NodeRef {
    pub fn new(id: u64) -> Self {
        Self {
            id: Some(NodeId(id)),
            handle: None,
        }
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn id(&self) -> Option<NodeId> {
        self.id
    }

    pub fn handle(&self) -> Option<NodeHandle> {
        self.handle
    }

    pub fn is_set(&self) -> bool {
        self.id.is_some()
    }

    pub(crate) fn resolve(&mut self, index: &BTreeMap<NodeId, NodeHandle>) -> bool {
        self.handle = self.id.and_then(|id| index.get(&id).copied());
        self.handle.is_some()
    }
}

/// Lookup-only edge (e.g. a rollback target); never a structural child.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawNodeRef(NodeRef);

impl RawNodeRef {
    pub fn new(id: u64) -> Self {
        Self(NodeRef::new(id))
    }

    pub fn id(&self) -> Option<NodeId> {
        self.0.id()
    }

    pub fn handle(&self) -> Option<NodeHandle> {
        self.0.handle()
    }

    pub(crate) fn resolve(&mut self, index: &BTreeMap<NodeId, NodeHandle>) -> bool {
        self.0.resolve(index)
    }
}

/// Child edge with a selection weight (int, constant or variable-bound).
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedRef {
    pub node: NodeRef,
    pub weight: VarField,
}

impl WeightedRef {
    pub fn new(id: u64, weight: impl Into<VarField>) -> Self {
        Self {
            node: NodeRef::new(id),
            weight: weight.into(),
        }
    }
}

/// Walks the reference-bearing fields of a node kind.
///
/// Resolution, parent derivation and diagnostics all go through this one descriptor instead of
/// inspecting node payloads ad hoc.
pub trait RefVisitor {
    fn child(&mut self, field: &'static str, node: &mut NodeRef);
    fn raw(&mut self, field: &'static str, node: &mut RawNodeRef);
    fn var(&mut self, field: &'static str, var: &mut VarField);
}

/// Diagnostic back-reference from an instance node to the prototype it was cloned from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    pub tree: Rc<str>,
    pub node: NodeId,
}

/// One node of a behaviour graph: identity, attached services and kind payload.
pub struct Node<W>
where
    W: WorldMut + 'static,
{
    pub(crate) id: NodeId,
    pub(crate) name: String,
    pub(crate) services: Vec<NodeRef>,
    pub(crate) kind: NodeKind<W>,
    pub(crate) parent: Option<NodeHandle>,
    pub(crate) origin: Option<Origin>,
    pub(crate) active_on: Option<StackId>,
    pub(crate) service_stacks: Vec<StackId>,
}

impl<W> Node<W>
where
    W: WorldMut + 'static,
{
    pub fn new(id: u64, name: impl Into<String>, kind: impl Into<NodeKind<W>>) -> Self {
        Self {
            id: NodeId(id),
            name: name.into(),
            services: Vec::new(),
            kind: kind.into(),
            parent: None,
            origin: None,
            active_on: None,
            service_stacks: Vec::new(),
        }
    }

    /// Attach service nodes that tick alongside this node while it is active.
    pub fn with_services(mut self, services: impl IntoIterator<Item = u64>) -> Self {
        self.services = services.into_iter().map(NodeRef::new).collect();
        self
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &NodeKind<W> {
        &self.kind
    }

    pub fn parent(&self) -> Option<NodeHandle> {
        self.parent
    }

    pub fn origin(&self) -> Option<&Origin> {
        self.origin.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.active_on.is_some()
    }
}

impl<W> Clone for Node<W>
where
    W: WorldMut + 'static,
{
    /// Structural copy of the definition. Runtime bookkeeping (active stack, services) starts
    /// empty in the copy.
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            name: self.name.clone(),
            services: self.services.clone(),
            kind: self.kind.clone(),
            parent: self.parent,
            origin: self.origin.clone(),
            active_on: None,
            service_stacks: Vec::new(),
        }
    }
}

impl<W> fmt::Debug for Node<W>
where
    W: WorldMut + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind.kind_name())
            .field("active", &self.active_on.is_some())
            .finish()
    }
}
