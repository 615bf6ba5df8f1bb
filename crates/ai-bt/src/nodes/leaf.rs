use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use ai_core::{TickPhase, VarField, WorldMut};

use crate::{NodeCtx, NodeFault, NodeResult, State};

/// What an action hook reports back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionStatus {
    /// Keep ticking at the action's cadence.
    Running,
    /// Stop ticking; wait for `ActionHandle::end` / `set_exception`.
    Pending,
    Success,
    Failure,
}

#[derive(Debug, Default)]
struct HandleState {
    completion: RefCell<Option<Result<bool, NodeFault>>>,
    cancelled: Cell<bool>,
}

/// Completion slot and cancellation flag for one run of an action.
///
/// A fresh handle is created every time the action starts. Clones share the same slot, so async
/// work can hold one and finish the action later, from anywhere on the tick thread.
#[derive(Clone, Default)]
pub struct ActionHandle(Rc<HandleState>);

impl ActionHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Complete the action. The first completion wins; completions after cancellation are
    /// dropped.
    pub fn end(&self, success: bool) {
        self.complete(Ok(success));
    }

    /// Fault the action.
    pub fn set_exception(&self, fault: NodeFault) {
        self.complete(Err(fault));
    }

    pub fn is_complete(&self) -> bool {
        self.0.completion.borrow().is_some()
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.cancelled.get()
    }

    pub fn cancel_token(&self) -> CancelToken {
        CancelToken(self.0.clone())
    }

    pub(crate) fn cancel(&self) {
        self.0.cancelled.set(true);
    }

    pub(crate) fn take(&self) -> Option<Result<bool, NodeFault>> {
        self.0.completion.borrow_mut().take()
    }

    fn complete(&self, result: Result<bool, NodeFault>) {
        if self.is_cancelled() {
            return;
        }
        let mut slot = self.0.completion.borrow_mut();
        if slot.is_none() {
            *slot = Some(result);
        }
    }
}

impl fmt::Debug for ActionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionHandle")
            .field("complete", &self.is_complete())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Read-only view of an action's cancellation flag, for in-flight async work.
#[derive(Clone)]
pub struct CancelToken(Rc<HandleState>);

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        self.0.cancelled.get()
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CancelToken").field(&self.is_cancelled()).finish()
    }
}

/// Host-provided long-running leaf behaviour.
///
/// `start` may finish immediately. Otherwise the action keeps getting the hook matching its
/// cadence every tick (`Running`) or waits for its handle (`Pending`). When the action is
/// interrupted before finishing, the cancel token fires and `on_stop` runs exactly once.
pub trait Action<W>: ActionClone<W>
where
    W: WorldMut + 'static,
{
    /// Called once per instance, before the first `start`.
    fn awake(&mut self, _ctx: &mut NodeCtx<'_, W>) -> Result<(), NodeFault> {
        Ok(())
    }

    fn start(&mut self, ctx: &mut NodeCtx<'_, W>) -> Result<ActionStatus, NodeFault>;

    fn update(&mut self, _ctx: &mut NodeCtx<'_, W>) -> Result<ActionStatus, NodeFault> {
        Ok(ActionStatus::Running)
    }

    fn fixed_update(&mut self, _ctx: &mut NodeCtx<'_, W>) -> Result<ActionStatus, NodeFault> {
        Ok(ActionStatus::Running)
    }

    fn late_update(&mut self, _ctx: &mut NodeCtx<'_, W>) -> Result<ActionStatus, NodeFault> {
        Ok(ActionStatus::Running)
    }

    fn on_stop(&mut self, _ctx: &mut NodeCtx<'_, W>) {}

    fn on_pause(&mut self, _ctx: &mut NodeCtx<'_, W>) {}

    fn on_resume(&mut self, _ctx: &mut NodeCtx<'_, W>) {}

    /// Expose variable-bound fields for resolution.
    fn visit_fields(&mut self, _visit: &mut dyn FnMut(&'static str, &mut VarField)) {}
}

/// Host-provided synchronous condition.
pub trait Determine<W>: DetermineClone<W>
where
    W: WorldMut + 'static,
{
    fn evaluate(&mut self, ctx: &mut NodeCtx<'_, W>) -> Result<bool, NodeFault>;

    fn visit_fields(&mut self, _visit: &mut dyn FnMut(&'static str, &mut VarField)) {}
}

pub trait ActionClone<W>
where
    W: WorldMut + 'static,
{
    fn clone_box(&self) -> Box<dyn Action<W>>;
}

impl<W, T> ActionClone<W> for T
where
    W: WorldMut + 'static,
    T: Action<W> + Clone + 'static,
{
    fn clone_box(&self) -> Box<dyn Action<W>> {
        Box::new(self.clone())
    }
}

pub trait DetermineClone<W>
where
    W: WorldMut + 'static,
{
    fn clone_box(&self) -> Box<dyn Determine<W>>;
}

impl<W, T> DetermineClone<W> for T
where
    W: WorldMut + 'static,
    T: Determine<W> + Clone + 'static,
{
    fn clone_box(&self) -> Box<dyn Determine<W>> {
        Box::new(self.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ActionPhase {
    Idle,
    Ticking,
    Waiting,
}

/// Runs an [`Action`] through its awake/start/tick lifecycle.
pub struct ActionNode<W>
where
    W: WorldMut + 'static,
{
    behavior: Box<dyn Action<W>>,
    cadence: TickPhase,
    phase: ActionPhase,
    awoken: bool,
    handle: ActionHandle,
}

impl<W> ActionNode<W>
where
    W: WorldMut + 'static,
{
    pub fn new(behavior: impl Action<W> + 'static) -> Self {
        Self {
            behavior: Box::new(behavior),
            cadence: TickPhase::Update,
            phase: ActionPhase::Idle,
            awoken: false,
            handle: ActionHandle::new(),
        }
    }

    pub fn with_cadence(mut self, cadence: TickPhase) -> Self {
        self.cadence = cadence;
        self
    }

    pub fn cadence(&self) -> TickPhase {
        self.cadence
    }

    pub fn handle(&self) -> &ActionHandle {
        &self.handle
    }

    pub fn is_running(&self) -> bool {
        self.phase != ActionPhase::Idle
    }

    pub(crate) fn execute(&mut self, ctx: &mut NodeCtx<'_, W>) -> NodeResult {
        if !self.awoken {
            self.behavior.awake(ctx)?;
            self.awoken = true;
        }

        self.handle = ActionHandle::new();
        ctx.action = Some(self.handle.clone());
        let status = self.behavior.start(ctx)?;
        self.settle(status)
    }

    pub(crate) fn resume(&mut self, ctx: &mut NodeCtx<'_, W>) -> NodeResult {
        if let Some(done) = self.poll() {
            return done.map(State::from_bool);
        }
        ctx.action = Some(self.handle.clone());
        let status = match self.cadence {
            TickPhase::Update => self.behavior.update(ctx),
            TickPhase::FixedUpdate => self.behavior.fixed_update(ctx),
            TickPhase::LateUpdate => self.behavior.late_update(ctx),
        }?;
        self.settle(status)
    }

    /// Completion delivered through the handle, if any.
    pub(crate) fn poll(&mut self) -> Option<Result<bool, NodeFault>> {
        let done = self.handle.take()?;
        self.phase = ActionPhase::Idle;
        Some(done)
    }

    pub(crate) fn is_ready(&self) -> bool {
        self.phase == ActionPhase::Waiting && self.handle.is_complete()
    }

    pub(crate) fn stop(&mut self, ctx: &mut NodeCtx<'_, W>) {
        if self.phase == ActionPhase::Idle {
            return;
        }
        self.phase = ActionPhase::Idle;
        self.handle.cancel();
        ctx.action = Some(self.handle.clone());
        self.behavior.on_stop(ctx);
    }

    pub(crate) fn pause(&mut self, ctx: &mut NodeCtx<'_, W>) {
        if self.phase != ActionPhase::Idle {
            ctx.action = Some(self.handle.clone());
            self.behavior.on_pause(ctx);
        }
    }

    pub(crate) fn unpause(&mut self, ctx: &mut NodeCtx<'_, W>) {
        if self.phase != ActionPhase::Idle {
            ctx.action = Some(self.handle.clone());
            self.behavior.on_resume(ctx);
        }
    }

    pub(crate) fn visit_fields(&mut self, visit: &mut dyn FnMut(&'static str, &mut VarField)) {
        self.behavior.visit_fields(visit);
    }

    fn settle(&mut self, status: ActionStatus) -> NodeResult {
        if let Some(done) = self.handle.take() {
            self.phase = ActionPhase::Idle;
            return done.map(State::from_bool);
        }

        match status {
            ActionStatus::Running => {
                self.phase = ActionPhase::Ticking;
                Ok(State::Yield)
            }
            ActionStatus::Pending => {
                self.phase = ActionPhase::Waiting;
                Ok(State::WaitOnAsyncAction)
            }
            ActionStatus::Success => {
                self.phase = ActionPhase::Idle;
                Ok(State::Success)
            }
            ActionStatus::Failure => {
                self.phase = ActionPhase::Idle;
                Ok(State::Failed)
            }
        }
    }
}

impl<W> Clone for ActionNode<W>
where
    W: WorldMut + 'static,
{
    fn clone(&self) -> Self {
        Self {
            behavior: self.behavior.clone_box(),
            cadence: self.cadence,
            phase: ActionPhase::Idle,
            awoken: false,
            handle: ActionHandle::new(),
        }
    }
}

/// Runs a [`Determine`] condition.
pub struct DetermineNode<W>
where
    W: WorldMut + 'static,
{
    behavior: Box<dyn Determine<W>>,
}

impl<W> DetermineNode<W>
where
    W: WorldMut + 'static,
{
    pub fn new(behavior: impl Determine<W> + 'static) -> Self {
        Self {
            behavior: Box::new(behavior),
        }
    }

    pub(crate) fn execute(&mut self, ctx: &mut NodeCtx<'_, W>) -> NodeResult {
        self.behavior.evaluate(ctx).map(State::from_bool)
    }

    pub(crate) fn visit_fields(&mut self, visit: &mut dyn FnMut(&'static str, &mut VarField)) {
        self.behavior.visit_fields(visit);
    }
}

impl<W> Clone for DetermineNode<W>
where
    W: WorldMut + 'static,
{
    fn clone(&self) -> Self {
        Self {
            behavior: self.behavior.clone_box(),
        }
    }
}
