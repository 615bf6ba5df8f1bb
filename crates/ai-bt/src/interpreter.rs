//! Host entry points and the per-stack trampoline.
//!
//! Every tick drains a run queue of call stacks in creation order. A stack steps its cursor
//! until the node on top suspends, the stack finishes, or its step budget runs out. Stopping
//! anything (end of a node, rollback, parallel resolution, teardown) goes through one worklist
//! so nested services and branches are released without recursion.

use std::collections::VecDeque;

use ai_core::{TickContext, TickPhase, WorldMut};
use ai_tools::TraceEvent;

use crate::config::ErrorPolicy;
use crate::ctx::Request;
use crate::nodes::{ActionHandle, NodeKind, ParallelMode, RollbackScope};
use crate::stack::{CallStack, Cursor, GroupId, ParallelGroup, StackId, StackRole, Suspension};
use crate::tree::{Halt, TreeStatus};
use crate::{NodeCtx, NodeFault, NodeHandle, NodeId, NodeRef, NodeResult, State, TreeError, TreeInstance};

struct Host<'a, W>
where
    W: WorldMut + 'static,
{
    tick: &'a TickContext,
    phase: TickPhase,
    agent: W::Agent,
    world: &'a mut W,
}

#[derive(Debug, Clone, Copy)]
enum Call {
    Execute,
    Resume,
    Receive(bool),
}

#[derive(Debug, Clone, Copy)]
enum Stop {
    Stack(StackId),
    /// Stop a node if it is still active on the given stack.
    Node(NodeHandle, StackId),
}

type Outcome = (NodeResult, Option<Request>);

impl<W> TreeInstance<W>
where
    W: WorldMut + 'static,
{
    /// Begin executing from the root on the next tick.
    ///
    /// No-op while running, paused or halted.
    pub fn start(&mut self) -> Result<(), TreeError> {
        match self.status {
            TreeStatus::Running | TreeStatus::Paused | TreeStatus::Halted => return Ok(()),
            TreeStatus::Idle | TreeStatus::Completed(_) | TreeStatus::Faulted => {}
        }
        self.initialize();
        let root = self.root.handle().ok_or(TreeError::MissingRoot)?;

        let sid = self.spawn(StackRole::Main, root);
        self.main = Some(sid);
        self.status = TreeStatus::Running;
        self.halt = None;
        tracing::debug!(tree = %self.name, "started");
        Ok(())
    }

    pub fn update(&mut self, tick: &TickContext, agent: W::Agent, world: &mut W) -> Result<TreeStatus, TreeError> {
        self.tick_phase(TickPhase::Update, tick, agent, world)
    }

    pub fn fixed_update(
        &mut self,
        tick: &TickContext,
        agent: W::Agent,
        world: &mut W,
    ) -> Result<TreeStatus, TreeError> {
        self.tick_phase(TickPhase::FixedUpdate, tick, agent, world)
    }

    pub fn late_update(
        &mut self,
        tick: &TickContext,
        agent: W::Agent,
        world: &mut W,
    ) -> Result<TreeStatus, TreeError> {
        self.tick_phase(TickPhase::LateUpdate, tick, agent, world)
    }

    /// One host callback. Returns the status after the run queue drained.
    ///
    /// Fails only under `ErrorPolicy::Propagate`, after every stack has been torn down.
    pub fn tick_phase(
        &mut self,
        phase: TickPhase,
        tick: &TickContext,
        agent: W::Agent,
        world: &mut W,
    ) -> Result<TreeStatus, TreeError> {
        self.serial += 1;
        self.now = tick.tick;
        if self.status != TreeStatus::Running {
            return Ok(self.status);
        }

        let mut host = Host {
            tick,
            phase,
            agent,
            world,
        };
        self.queue = self.stacks.keys().copied().collect();

        loop {
            while let Some(sid) = self.queue.pop_front() {
                self.run_stack(sid, &mut host)?;
                if self.status != TreeStatus::Running {
                    self.queue.clear();
                    return Ok(self.status);
                }
            }

            // Completions delivered by another stack's callbacks during this tick.
            let ready = self.ready_async();
            if ready.is_empty() {
                break;
            }
            self.queue.extend(ready);
        }
        Ok(self.status)
    }

    /// Suspend ticking and forward `on_pause` to running actions.
    pub fn pause(&mut self, tick: &TickContext, agent: W::Agent, world: &mut W) {
        if self.status != TreeStatus::Running {
            return;
        }
        self.status = TreeStatus::Paused;
        self.now = tick.tick;

        let mut host = Host {
            tick,
            phase: TickPhase::Update,
            agent,
            world,
        };
        for h in self.active_handles() {
            self.with_ctx(h, &mut host, |kind, ctx| kind.pause(ctx));
        }
    }

    /// Continue after `pause`, or after a halt on a fault.
    ///
    /// A halted fault is delivered to the faulting node's parent as `Failed`.
    pub fn resume(&mut self, tick: &TickContext, agent: W::Agent, world: &mut W) {
        self.now = tick.tick;
        let mut host = Host {
            tick,
            phase: TickPhase::Update,
            agent,
            world,
        };

        match self.status {
            TreeStatus::Paused => {
                self.status = TreeStatus::Running;
                for h in self.active_handles() {
                    self.with_ctx(h, &mut host, |kind, ctx| kind.unpause(ctx));
                }
            }
            TreeStatus::Halted => {
                self.status = TreeStatus::Running;
                let Some(halt) = self.halt.take() else {
                    return;
                };
                let faulted = self.stacks.get(&halt.stack).and_then(|s| match s.cursor {
                    Cursor::Faulted(h) => Some(h),
                    _ => None,
                });
                if let Some(h) = faulted {
                    self.finish_node(halt.stack, h, false, &mut host);
                }
            }
            _ => {}
        }
    }

    /// Stop every stack, interrupting running actions, and go idle.
    pub fn end(&mut self, tick: &TickContext, agent: W::Agent, world: &mut W) {
        self.now = tick.tick;
        let mut host = Host {
            tick,
            phase: TickPhase::Update,
            agent,
            world,
        };
        self.teardown(&mut host);
        self.status = TreeStatus::Idle;
        tracing::debug!(tree = %self.name, "ended");
    }

    /// `end`, then restore local variables and the RNG to their initial state.
    pub fn reset(&mut self, tick: &TickContext, agent: W::Agent, world: &mut W) {
        self.end(tick, agent, world);
        self.locals = self.initial_locals.clone();
        self.rng = ai_core::SplitMix64::new(self.config.seed);
    }

    /// Completion handle of the action node `id`'s current run.
    pub fn action_handle(&self, id: NodeId) -> Result<ActionHandle, TreeError> {
        let node = self.node(id).ok_or(TreeError::UnknownNode(id))?;
        match node.kind() {
            NodeKind::Action(action) => Ok(action.handle().clone()),
            _ => Err(TreeError::NotAnAction(id)),
        }
    }

    /// Complete a waiting action from the host. Picked up on the next tick.
    pub fn end_action(&self, id: NodeId, success: bool) -> Result<(), TreeError> {
        self.action_handle(id)?.end(success);
        Ok(())
    }

    /// Fault a waiting action from the host. Picked up on the next tick.
    pub fn fail_action(&self, id: NodeId, fault: NodeFault) -> Result<(), TreeError> {
        self.action_handle(id)?.set_exception(fault);
        Ok(())
    }

    fn run_stack(&mut self, sid: StackId, host: &mut Host<'_, W>) -> Result<(), TreeError> {
        let budget = self.config.max_steps_per_tick.max(1);

        loop {
            if self.status != TreeStatus::Running {
                return Ok(());
            }
            let serial = self.serial;
            let Some(stack) = self.stacks.get_mut(&sid) else {
                return Ok(());
            };

            let cursor = stack.cursor;
            let runnable = match cursor {
                Cursor::Enter(_) | Cursor::Return(_) => true,
                Cursor::Suspended {
                    node,
                    on: Suspension::Yield,
                    since,
                } => since != serial && self.nodes[node.0].kind.resume_phase() == host.phase,
                Cursor::Suspended {
                    node,
                    on: Suspension::Async,
                    ..
                } => self.nodes[node.0].kind.async_ready(),
                Cursor::Suspended {
                    on: Suspension::Parallel(_),
                    ..
                }
                | Cursor::Faulted(_) => false,
                Cursor::Restart { since, .. } => since != serial,
            };
            if !runnable {
                return Ok(());
            }

            if !stack.take_step(serial, budget) {
                tracing::warn!(tree = %self.name, stack = %sid, budget, "step budget exhausted, resuming next tick");
                return Ok(());
            }
            self.step(sid, cursor, host)?;
        }
    }

    fn step(&mut self, sid: StackId, cursor: Cursor, host: &mut Host<'_, W>) -> Result<(), TreeError> {
        match cursor {
            Cursor::Enter(h) => self.enter(sid, h, host),
            Cursor::Suspended {
                node,
                on: Suspension::Yield,
                ..
            } => {
                let outcome = self.call(node, Call::Resume, host);
                self.apply(sid, node, outcome, host)
            }
            Cursor::Suspended {
                node,
                on: Suspension::Async,
                ..
            } => match self.nodes[node.0].kind.poll_async() {
                Some(done) => self.apply(sid, node, (done.map(State::from_bool), None), host),
                None => Ok(()),
            },
            Cursor::Return(success) => {
                let parent = self.stacks.get_mut(&sid).and_then(|s| s.frames.pop());
                match parent {
                    Some(parent) => {
                        let outcome = self.call(parent, Call::Receive(success), host);
                        self.apply(sid, parent, outcome, host)
                    }
                    None => self.finish_stack(sid, success, host),
                }
            }
            Cursor::Restart { entry, .. } => {
                self.set_cursor(sid, Cursor::Enter(entry));
                Ok(())
            }
            Cursor::Suspended {
                on: Suspension::Parallel(_),
                ..
            }
            | Cursor::Faulted(_) => Ok(()),
        }
    }

    fn enter(&mut self, sid: StackId, h: NodeHandle, host: &mut Host<'_, W>) -> Result<(), TreeError> {
        let node = &mut self.nodes[h.0];
        if node.active_on.is_some() {
            let fault = NodeFault::AlreadyRunning(node.id);
            return self.fault(sid, h, fault, host);
        }
        node.active_on = Some(sid);

        let id = node.id;
        let services: Vec<NodeHandle> = node.services.iter().filter_map(NodeRef::handle).collect();
        tracing::debug!(tree = %self.name, node = %id, kind = node.kind.kind_name(), "enter");
        self.trace("bt.enter", id.0, 0);

        let outcome = self.call(h, Call::Execute, host);

        // Services only exist while the host is pending.
        let pending = matches!(&outcome.0, Ok(state) if !state.is_terminal() && *state != State::Error);
        if pending {
            for entry in services {
                self.start_service(h, entry);
            }
        }
        self.apply(sid, h, outcome, host)
    }

    fn start_service(&mut self, h: NodeHandle, entry: NodeHandle) {
        let service = self.spawn(StackRole::Service { host: h, entry }, entry);
        self.nodes[h.0].service_stacks.push(service);
        self.queue.push_back(service);

        let (host_id, entry_id) = (self.nodes[h.0].id, self.nodes[entry.0].id);
        tracing::debug!(tree = %self.name, host = %host_id, service = %entry_id, "service started");
        self.trace("bt.service.start", entry_id.0, host_id.0);
    }

    fn apply(&mut self, sid: StackId, h: NodeHandle, outcome: Outcome, host: &mut Host<'_, W>) -> Result<(), TreeError> {
        let (result, request) = outcome;
        let state = match result {
            Ok(state) => state,
            Err(fault) => return self.fault(sid, h, fault, host),
        };

        let id = self.nodes[h.0].id;
        match state {
            State::Success | State::Failed => {
                self.finish_node(sid, h, state == State::Success, host);
                Ok(())
            }
            State::Yield => {
                self.suspend(sid, h, Suspension::Yield);
                self.trace("bt.yield", id.0, 0);
                Ok(())
            }
            State::WaitOnAsyncAction => {
                self.suspend(sid, h, Suspension::Async);
                self.trace("bt.wait", id.0, 0);
                Ok(())
            }
            State::Error => self.fault(sid, h, NodeFault::Reported(id), host),
            State::NoReturnYet => match request {
                Some(Request::Descend(child)) => {
                    if let Some(stack) = self.stacks.get_mut(&sid) {
                        stack.frames.push(h);
                        stack.cursor = Cursor::Enter(child);
                    }
                    Ok(())
                }
                Some(Request::Parallel { branches, mode }) => {
                    self.fork(sid, h, branches, mode);
                    Ok(())
                }
                Some(Request::Rollback { target, scope }) => self.rollback(sid, h, target, scope, host),
                None => self.fault(sid, h, NodeFault::MissingDelegation(id), host),
            },
        }
    }

    /// `h` produced a result: release it and hand the result to its parent frame.
    fn finish_node(&mut self, sid: StackId, h: NodeHandle, success: bool, host: &mut Host<'_, W>) {
        let id = self.nodes[h.0].id;
        tracing::debug!(tree = %self.name, node = %id, success, "return");
        self.trace("bt.return", id.0, u64::from(success));

        self.stop(vec![Stop::Node(h, sid)], host);
        self.set_cursor(sid, Cursor::Return(success));
    }

    fn finish_stack(&mut self, sid: StackId, success: bool, host: &mut Host<'_, W>) -> Result<(), TreeError> {
        let Some(role) = self.stacks.get(&sid).map(|s| s.role) else {
            return Ok(());
        };

        match role {
            StackRole::Main => {
                let root = self.root.id().map_or(0, |id| id.0);
                tracing::debug!(tree = %self.name, success, "completed");
                self.trace("bt.complete", root, u64::from(success));

                match self.root.handle() {
                    Some(entry) if self.config.restart_on_complete => {
                        let since = self.serial;
                        self.set_cursor(sid, Cursor::Restart { entry, since });
                    }
                    _ => {
                        self.stacks.remove(&sid);
                        self.main = None;
                        self.status = TreeStatus::Completed(success);
                    }
                }
                Ok(())
            }
            StackRole::Service { entry, .. } => {
                let since = self.serial;
                self.set_cursor(sid, Cursor::Restart { entry, since });
                Ok(())
            }
            StackRole::Branch { group, index } => {
                self.stacks.remove(&sid);
                self.branch_done(group, index, success, host)
            }
        }
    }

    fn fork(&mut self, sid: StackId, h: NodeHandle, branches: Vec<NodeHandle>, mode: ParallelMode) {
        let gid = GroupId(self.next_group);
        self.next_group += 1;

        let mut group = ParallelGroup::new(h, sid, mode);
        for (index, entry) in branches.into_iter().enumerate() {
            let branch = self.spawn(StackRole::Branch { group: gid, index }, entry);
            group.branches.push(branch);
            group.results.push(None);
            self.queue.push_back(branch);
        }
        tracing::debug!(tree = %self.name, node = %self.nodes[h.0].id, branches = group.branches.len(), ?mode, "parallel");

        self.groups.insert(gid, group);
        self.suspend(sid, h, Suspension::Parallel(gid));
    }

    fn branch_done(
        &mut self,
        gid: GroupId,
        index: usize,
        success: bool,
        host: &mut Host<'_, W>,
    ) -> Result<(), TreeError> {
        let Some(group) = self.groups.get_mut(&gid) else {
            return Ok(());
        };
        let Some(result) = group.record(index, success) else {
            return Ok(());
        };
        let Some(group) = self.groups.remove(&gid) else {
            return Ok(());
        };

        let owner = self.nodes[group.owner.0].id;
        tracing::debug!(tree = %self.name, node = %owner, result, "parallel resolved");
        self.trace("bt.parallel.resolve", owner.0, u64::from(result));

        let survivors: Vec<Stop> = group
            .branches
            .iter()
            .copied()
            .filter(|b| self.stacks.contains_key(b))
            .map(Stop::Stack)
            .collect();
        self.stop(survivors, host);

        let owner_stack = group.owner_stack;
        if !self.stacks.contains_key(&owner_stack) {
            return Ok(());
        }
        self.queue.push_back(owner_stack);

        if !group.faults.is_empty() {
            return self.fault(owner_stack, group.owner, NodeFault::Parallel(group.faults), host);
        }
        if let Some(stack) = self.stacks.get_mut(&owner_stack) {
            stack.frames.push(group.owner);
            stack.cursor = Cursor::Return(result);
        }
        Ok(())
    }

    fn rollback(
        &mut self,
        sid: StackId,
        h: NodeHandle,
        target: NodeHandle,
        scope: RollbackScope,
        host: &mut Host<'_, W>,
    ) -> Result<(), TreeError> {
        let node = self.nodes[h.0].id;
        let target_id = self.nodes[target.0].id;
        let bad_target = NodeFault::RollbackTarget {
            node,
            target: target_id,
        };

        let on = match scope {
            RollbackScope::Current => Some(sid),
            RollbackScope::Main => self.main,
        };
        let Some(on) = on else {
            return self.fault(sid, h, bad_target, host);
        };

        let discarded = if on == sid {
            // `h` is the top of this stack; the target must be one of its frames.
            let unwound: Vec<NodeHandle> = match self.stacks.get_mut(&sid) {
                Some(stack) => match stack.frames.iter().rposition(|&f| f == target) {
                    Some(at) => stack.frames.drain(at..).collect(),
                    None => return self.fault(sid, h, bad_target, host),
                },
                None => return Ok(()),
            };

            let mut stops = vec![Stop::Node(h, sid)];
            stops.extend(unwound.iter().skip(1).rev().map(|&f| Stop::Node(f, sid)));
            stops.push(Stop::Node(target, sid));
            self.stop(stops, host);
            self.set_cursor(sid, Cursor::Enter(target));
            unwound.len() - 1
        } else {
            let active: Vec<NodeHandle> = match self.stacks.get(&on) {
                Some(stack) => stack.active_nodes().collect(),
                None => return self.fault(sid, h, bad_target, host),
            };
            let Some(at) = active.iter().rposition(|&n| n == target) else {
                return self.fault(sid, h, bad_target, host);
            };

            // The rollback itself succeeds on its own stack.
            self.finish_node(sid, h, true, host);

            if let Some(stack) = self.stacks.get_mut(&on) {
                stack.frames.truncate(at);
            }
            let mut stops: Vec<Stop> = active[at + 1..].iter().rev().map(|&n| Stop::Node(n, on)).collect();
            stops.push(Stop::Node(target, on));
            self.stop(stops, host);
            self.set_cursor(on, Cursor::Enter(target));
            self.queue.push_back(on);
            active.len() - at - 1
        };

        tracing::debug!(tree = %self.name, node = %node, target = %target_id, discarded, "rollback");
        self.trace("bt.rollback", target_id.0, discarded as u64);
        Ok(())
    }

    fn fault(&mut self, sid: StackId, h: NodeHandle, fault: NodeFault, host: &mut Host<'_, W>) -> Result<(), TreeError> {
        let id = self.nodes[h.0].id;
        tracing::error!(tree = %self.name, node = %id, stack = %sid, %fault, "node fault");
        self.trace("bt.fault", id.0, 0);

        let policy = self.config.error_policy;
        if policy != ErrorPolicy::Propagate {
            // Branch faults are gathered and reported once by the parallel node.
            if let Some(StackRole::Branch { group, index }) = self.stacks.get(&sid).map(|s| s.role) {
                if let Some(g) = self.groups.get_mut(&group) {
                    g.faults.push(fault);
                }
                self.stop(vec![Stop::Node(h, sid), Stop::Stack(sid)], host);
                return self.branch_done(group, index, false, host);
            }
        }

        match policy {
            ErrorPolicy::TreatAsFailure => {
                self.finish_node(sid, h, false, host);
                Ok(())
            }
            ErrorPolicy::PauseForInspection => {
                self.set_cursor(sid, Cursor::Faulted(h));
                self.status = TreeStatus::Halted;
                self.halt = Some(Halt {
                    node: id,
                    fault,
                    stack: sid,
                });
                tracing::warn!(tree = %self.name, node = %id, "halted for inspection");
                Ok(())
            }
            ErrorPolicy::Propagate => {
                // A node that faulted while entering is not yet visible through its cursor.
                self.stop(vec![Stop::Node(h, sid)], host);
                self.teardown(host);
                self.status = TreeStatus::Faulted;
                Err(TreeError::Fault { node: id, fault })
            }
        }
    }

    fn teardown(&mut self, host: &mut Host<'_, W>) {
        let all: Vec<Stop> = self.stacks.keys().copied().map(Stop::Stack).collect();
        self.stop(all, host);
        self.groups.clear();
        self.queue.clear();
        self.main = None;
        self.halt = None;
    }

    /// The single stop path. Idempotent: a node is only stopped while active on the stack named
    /// in its work item.
    fn stop(&mut self, items: Vec<Stop>, host: &mut Host<'_, W>) {
        let mut work: VecDeque<Stop> = items.into();

        while let Some(item) = work.pop_front() {
            match item {
                Stop::Stack(sid) => {
                    let Some(stack) = self.stacks.remove(&sid) else {
                        continue;
                    };
                    if self.main == Some(sid) {
                        self.main = None;
                    }
                    if let StackRole::Service { host: owner, entry } = stack.role {
                        let (entry, owner) = (self.nodes[entry.0].id, self.nodes[owner.0].id);
                        tracing::debug!(tree = %self.name, host = %owner, service = %entry, "service stopped");
                        self.trace("bt.service.stop", entry.0, owner.0);
                    }
                    let active: Vec<NodeHandle> = stack.active_nodes().collect();
                    work.extend(active.into_iter().rev().map(|h| Stop::Node(h, sid)));
                }
                Stop::Node(h, sid) => {
                    let node = &mut self.nodes[h.0];
                    if node.active_on != Some(sid) {
                        continue;
                    }
                    node.active_on = None;
                    work.extend(node.service_stacks.drain(..).map(Stop::Stack));

                    let owned: Vec<GroupId> = self
                        .groups
                        .iter()
                        .filter(|(_, g)| g.owner == h)
                        .map(|(gid, _)| *gid)
                        .collect();
                    for gid in owned {
                        if let Some(group) = self.groups.remove(&gid) {
                            work.extend(group.branches.into_iter().map(Stop::Stack));
                        }
                    }

                    self.with_ctx(h, host, |kind, ctx| kind.stop(ctx));
                }
            }
        }
    }

    fn call(&mut self, h: NodeHandle, call: Call, host: &mut Host<'_, W>) -> Outcome {
        self.with_ctx(h, host, |kind, ctx| match call {
            Call::Execute => kind.execute(ctx),
            Call::Resume => kind.resume(ctx),
            Call::Receive(success) => kind.receive_return_from_child(ctx, success),
        })
    }

    /// Run `f` on node `h` with a context borrowed from this instance and the host.
    fn with_ctx<R>(
        &mut self,
        h: NodeHandle,
        host: &mut Host<'_, W>,
        f: impl FnOnce(&mut NodeKind<W>, &mut NodeCtx<'_, W>) -> R,
    ) -> (R, Option<Request>) {
        let Self {
            nodes,
            locals,
            globals,
            rng,
            ..
        } = self;
        let node = &mut nodes[h.0];

        let mut ctx = NodeCtx {
            node: node.id,
            tick: host.tick,
            phase: host.phase,
            agent: host.agent,
            world: &mut *host.world,
            locals,
            globals: &*globals,
            rng,
            request: None,
            action: None,
        };
        let out = f(&mut node.kind, &mut ctx);
        (out, ctx.request)
    }

    fn spawn(&mut self, role: StackRole, entry: NodeHandle) -> StackId {
        let sid = StackId(self.next_stack);
        self.next_stack += 1;
        self.stacks.insert(sid, CallStack::new(role, entry));
        sid
    }

    fn set_cursor(&mut self, sid: StackId, cursor: Cursor) {
        if let Some(stack) = self.stacks.get_mut(&sid) {
            stack.cursor = cursor;
        }
    }

    fn suspend(&mut self, sid: StackId, h: NodeHandle, on: Suspension) {
        let since = self.serial;
        self.set_cursor(sid, Cursor::Suspended { node: h, on, since });
    }

    fn ready_async(&self) -> Vec<StackId> {
        let budget = self.config.max_steps_per_tick.max(1);
        self.stacks
            .iter()
            .filter(|(_, s)| s.has_budget(self.serial, budget))
            .filter(|(_, s)| {
                matches!(
                    s.cursor,
                    Cursor::Suspended { node, on: Suspension::Async, .. }
                        if self.nodes[node.0].kind.async_ready()
                )
            })
            .map(|(sid, _)| *sid)
            .collect()
    }

    fn active_handles(&self) -> Vec<NodeHandle> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.active_on.is_some())
            .map(|(i, _)| NodeHandle(i))
            .collect()
    }

    fn trace(&mut self, tag: &'static str, a: u64, b: u64) {
        if self.tracer.is_enabled() {
            self.tracer.emit(TraceEvent::new(self.now, tag).with_a(a).with_b(b));
        }
    }
}
