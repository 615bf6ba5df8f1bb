//! Prototype graphs and the per-agent instances cloned from them.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;
use std::rc::Rc;

use ai_core::{
    GlobalVariables, SplitMix64, Value, VarField, VarId, Variable, VariableTable, WorldMut,
};
use ai_tools::{TraceLog, TraceSink, Tracer};

use crate::stack::{CallStack, GroupId, ParallelGroup, StackId};
use crate::{Node, NodeFault, NodeHandle, NodeId, NodeRef, Origin, RawNodeRef, RefVisitor, TreeConfig, TreeError};

/// Lifecycle of one instance, as seen by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TreeStatus {
    /// Not started, or stopped with `end`.
    Idle,
    Running,
    /// Paused by the host; ticks are no-ops.
    Paused,
    /// Stopped on a fault under `ErrorPolicy::PauseForInspection`.
    Halted,
    /// Torn down by a fault under `ErrorPolicy::Propagate`.
    Faulted,
    /// The main stack returned this result.
    Completed(bool),
}

/// What a reference or binding failed to resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Missing {
    Node(NodeId),
    Variable(VarId),
}

/// A reference that could not be resolved when the instance was initialised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphFault {
    pub node: NodeId,
    pub field: &'static str,
    pub missing: Missing,
}

/// Fault an instance halted on under `ErrorPolicy::PauseForInspection`.
#[derive(Debug, Clone, PartialEq)]
pub struct Halt {
    pub node: NodeId,
    pub fault: NodeFault,
    pub(crate) stack: StackId,
}

/// Assembles a [`Prototype`] from nodes and local variable declarations.
pub struct TreeBuilder<W>
where
    W: WorldMut + 'static,
{
    name: String,
    nodes: Vec<Node<W>>,
    ids: BTreeSet<NodeId>,
    locals: VariableTable,
    root: Option<NodeId>,
    config: TreeConfig,
    error: Option<TreeError>,
}

impl<W> TreeBuilder<W>
where
    W: WorldMut + 'static,
{
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
            ids: BTreeSet::new(),
            locals: VariableTable::new(),
            root: None,
            config: TreeConfig::default(),
            error: None,
        }
    }

    pub fn node(mut self, node: Node<W>) -> Self {
        if !self.ids.insert(node.id) {
            self.error.get_or_insert(TreeError::DuplicateNode(node.id));
            return self;
        }
        self.nodes.push(node);
        self
    }

    pub fn variable(mut self, variable: Variable) -> Self {
        if let Err(err) = self.locals.declare(variable) {
            self.error.get_or_insert(err.into());
        }
        self
    }

    pub fn root(mut self, id: u64) -> Self {
        self.root = Some(NodeId(id));
        self
    }

    pub fn config(mut self, config: TreeConfig) -> Self {
        self.config = config;
        self
    }

    /// The first node added becomes the root unless [`TreeBuilder::root`] says otherwise.
    pub fn build(self) -> Result<Prototype<W>, TreeError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let root = self
            .root
            .or_else(|| self.nodes.first().map(|n| n.id))
            .ok_or(TreeError::MissingRoot)?;
        if !self.ids.contains(&root) {
            return Err(TreeError::MissingRoot);
        }

        Ok(Prototype {
            name: Rc::from(self.name),
            nodes: self.nodes,
            root,
            locals: self.locals,
            config: self.config,
        })
    }
}

/// Authored graph, shared by every agent that runs it.
///
/// A prototype is never ticked; [`Prototype::instantiate`] produces an isolated copy.
pub struct Prototype<W>
where
    W: WorldMut + 'static,
{
    name: Rc<str>,
    nodes: Vec<Node<W>>,
    root: NodeId,
    locals: VariableTable,
    config: TreeConfig,
}

impl<W> Prototype<W>
where
    W: WorldMut + 'static,
{
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node<W>> {
        self.nodes.iter()
    }

    pub fn locals(&self) -> &VariableTable {
        &self.locals
    }

    /// Structural copy for one agent, resolved against its own tables.
    ///
    /// Globals must be declared before instantiating for bound fields to resolve.
    pub fn instantiate(&self, globals: &GlobalVariables) -> TreeInstance<W> {
        let nodes: Vec<Node<W>> = self
            .nodes
            .iter()
            .map(|n| {
                let mut node = n.clone();
                node.parent = None;
                node.origin = Some(Origin {
                    tree: self.name.clone(),
                    node: n.id,
                });
                node
            })
            .collect();
        let index: BTreeMap<NodeId, NodeHandle> = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id, NodeHandle(i)))
            .collect();

        let mut instance = TreeInstance {
            name: self.name.clone(),
            config: self.config.clone(),
            nodes,
            index,
            root: NodeRef::new(self.root.0),
            locals: self.locals.clone(),
            initial_locals: self.locals.clone(),
            globals: globals.clone(),
            rng: SplitMix64::new(self.config.seed),
            stacks: BTreeMap::new(),
            next_stack: 0,
            groups: BTreeMap::new(),
            next_group: 0,
            main: None,
            status: TreeStatus::Idle,
            halt: None,
            serial: 0,
            now: 0,
            queue: VecDeque::new(),
            tracer: Tracer::new(),
            initialized: false,
            graph_faults: Vec::new(),
        };
        instance.initialize();
        instance
    }
}

impl<W> Clone for Prototype<W>
where
    W: WorldMut + 'static,
{
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            nodes: self.nodes.clone(),
            root: self.root,
            locals: self.locals.clone(),
            config: self.config.clone(),
        }
    }
}

/// One agent's running copy of a [`Prototype`].
///
/// Owns its nodes, local variables, RNG and call stacks; only the [`GlobalVariables`] handle is
/// shared with other instances.
pub struct TreeInstance<W>
where
    W: WorldMut + 'static,
{
    pub(crate) name: Rc<str>,
    pub(crate) config: TreeConfig,
    pub(crate) nodes: Vec<Node<W>>,
    pub(crate) index: BTreeMap<NodeId, NodeHandle>,
    pub(crate) root: NodeRef,
    pub(crate) locals: VariableTable,
    pub(crate) initial_locals: VariableTable,
    pub(crate) globals: GlobalVariables,
    pub(crate) rng: SplitMix64,
    pub(crate) stacks: BTreeMap<StackId, CallStack>,
    pub(crate) next_stack: u64,
    pub(crate) groups: BTreeMap<GroupId, ParallelGroup>,
    pub(crate) next_group: u64,
    pub(crate) main: Option<StackId>,
    pub(crate) status: TreeStatus,
    pub(crate) halt: Option<Halt>,
    /// Incremented once per host call.
    pub(crate) serial: u64,
    /// `TickContext::tick` of the current host call, for trace events.
    pub(crate) now: u64,
    pub(crate) queue: VecDeque<StackId>,
    pub(crate) tracer: Tracer,
    initialized: bool,
    graph_faults: Vec<GraphFault>,
}

struct Resolver<'a> {
    index: &'a BTreeMap<NodeId, NodeHandle>,
    locals: &'a VariableTable,
    globals: &'a GlobalVariables,
    node: NodeId,
    children: Vec<NodeHandle>,
    faults: &'a mut Vec<GraphFault>,
}

impl Resolver<'_> {
    fn missing(&mut self, field: &'static str, missing: Missing) {
        tracing::warn!(node = %self.node, field, ?missing, "unresolved reference");
        self.faults.push(GraphFault {
            node: self.node,
            field,
            missing,
        });
    }
}

impl RefVisitor for Resolver<'_> {
    fn child(&mut self, field: &'static str, node: &mut NodeRef) {
        let Some(id) = node.id() else {
            return;
        };
        if node.resolve(self.index) {
            self.children.extend(node.handle());
        } else {
            self.missing(field, Missing::Node(id));
        }
    }

    fn raw(&mut self, field: &'static str, node: &mut RawNodeRef) {
        let Some(id) = node.id() else {
            return;
        };
        if !node.resolve(self.index) {
            self.missing(field, Missing::Node(id));
        }
    }

    fn var(&mut self, field: &'static str, var: &mut VarField) {
        if let Some(id) = var.binding().map(|b| b.id) {
            if !var.resolve(self.locals, self.globals) {
                self.missing(field, Missing::Variable(id));
            }
        }
    }
}

impl<W> TreeInstance<W>
where
    W: WorldMut + 'static,
{
    /// Resolve every reference and binding once and derive parent edges.
    ///
    /// Runs as part of [`Prototype::instantiate`]; calling it again is a no-op.
    pub fn initialize(&mut self) {
        if self.initialized {
            return;
        }
        self.initialized = true;

        let Self {
            nodes,
            index,
            root,
            locals,
            globals,
            graph_faults,
            ..
        } = self;

        if !root.resolve(index) {
            if let Some(id) = root.id() {
                tracing::warn!(node = %id, "root node is missing");
                graph_faults.push(GraphFault {
                    node: id,
                    field: "root",
                    missing: Missing::Node(id),
                });
            }
        }

        for i in 0..nodes.len() {
            let node = &mut nodes[i];
            let mut resolver = Resolver {
                index,
                locals,
                globals,
                node: node.id,
                children: Vec::new(),
                faults: &mut *graph_faults,
            };
            node.kind.visit_refs(&mut resolver);
            let children = resolver.children;

            for service in node.services.iter_mut() {
                if let Some(id) = service.id() {
                    if !service.resolve(index) {
                        tracing::warn!(node = %node.id, service = %id, "unresolved service");
                        graph_faults.push(GraphFault {
                            node: node.id,
                            field: "services",
                            missing: Missing::Node(id),
                        });
                    }
                }
            }

            for child in children {
                let child = &mut nodes[child.0];
                if child.parent.is_none() {
                    child.parent = Some(NodeHandle(i));
                }
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    pub fn status(&self) -> TreeStatus {
        self.status
    }

    /// Fault the instance is halted on, if any.
    pub fn halt(&self) -> Option<&Halt> {
        self.halt.as_ref()
    }

    pub fn graph_faults(&self) -> &[GraphFault] {
        &self.graph_faults
    }

    pub fn handle_of(&self, id: NodeId) -> Option<NodeHandle> {
        self.index.get(&id).copied()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node<W>> {
        self.handle_of(id).map(|h| &self.nodes[h.0])
    }

    pub fn node_origin(&self, id: NodeId) -> Option<&Origin> {
        self.node(id).and_then(Node::origin)
    }

    /// Node at the top of the main stack.
    pub fn current_node(&self) -> Option<NodeId> {
        let stack = self.stacks.get(&self.main?)?;
        stack
            .cursor
            .active_node()
            .or_else(|| stack.frames.last().copied())
            .map(|h| self.nodes[h.0].id)
    }

    /// Active nodes on the main stack.
    pub fn stack_depth(&self) -> usize {
        self.main
            .and_then(|sid| self.stacks.get(&sid))
            .map_or(0, CallStack::depth)
    }

    /// Number of live call stacks (main, services and parallel branches).
    pub fn stack_count(&self) -> usize {
        self.stacks.len()
    }

    pub fn variables(&self) -> &VariableTable {
        &self.locals
    }

    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.locals.get_by_name(name).map(Variable::value)
    }

    pub fn global_variables(&self) -> &GlobalVariables {
        &self.globals
    }

    pub fn set_variable(&mut self, name: &str, value: impl Into<Value>) -> Result<(), TreeError> {
        Ok(self.locals.set_by_name(name, value)?)
    }

    pub fn set_global_variable(&self, name: &str, value: impl Into<Value>) -> Result<(), TreeError> {
        Ok(self.globals.set_by_name(name, value)?)
    }

    /// Restart the weighted-selection RNG from `seed`.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = SplitMix64::new(seed);
    }

    pub fn enable_trace_log(&mut self) {
        self.tracer.enable_log();
    }

    pub fn trace_log(&self) -> Option<&TraceLog> {
        self.tracer.log()
    }

    pub fn take_trace_log(&mut self) -> Option<TraceLog> {
        self.tracer.take_log()
    }

    pub fn set_trace_sink(&mut self, sink: Box<dyn TraceSink>) {
        self.tracer.set_sink(sink);
    }
}

impl<W> fmt::Debug for TreeInstance<W>
where
    W: WorldMut + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeInstance")
            .field("name", &self.name)
            .field("status", &self.status)
            .field("nodes", &self.nodes.len())
            .field("stacks", &self.stacks.len())
            .finish()
    }
}
