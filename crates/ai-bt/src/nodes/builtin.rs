//! Leaves that only touch variables, usable without any host capability.

use std::cmp::Ordering;

use ai_core::{Value, VarField, VarType, VariableError, WorldMut};
use serde::{Deserialize, Serialize};

use super::{Action, ActionStatus, Determine};
use crate::{NodeCtx, NodeFault};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    fn accepts(self, ord: Ordering) -> bool {
        match self {
            CompareOp::Eq => ord == Ordering::Equal,
            CompareOp::Ne => ord != Ordering::Equal,
            CompareOp::Lt => ord == Ordering::Less,
            CompareOp::Le => ord != Ordering::Greater,
            CompareOp::Gt => ord == Ordering::Greater,
            CompareOp::Ge => ord != Ordering::Less,
        }
    }
}

/// `left <op> right`. Numbers (and bools) compare numerically; other values only support
/// `Eq`/`Ne`.
#[derive(Debug, Clone, PartialEq)]
pub struct Compare {
    pub left: VarField,
    pub op: CompareOp,
    pub right: VarField,
}

impl Compare {
    pub fn new(left: impl Into<VarField>, op: CompareOp, right: impl Into<VarField>) -> Self {
        Self {
            left: left.into(),
            op,
            right: right.into(),
        }
    }
}

fn is_numeric(v: &Value) -> bool {
    matches!(v, Value::Int(_) | Value::Float(_) | Value::Bool(_))
}

fn compare_values(op: CompareOp, left: &Value, right: &Value) -> Result<bool, VariableError> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Ok(op.accepts(a.cmp(b))),
        (a, b) if is_numeric(a) && is_numeric(b) => {
            let ord = a.to_float()?.partial_cmp(&b.to_float()?);
            Ok(ord.map(|o| op.accepts(o)).unwrap_or(op == CompareOp::Ne))
        }
        (a, b) => match op {
            CompareOp::Eq => Ok(a == b),
            CompareOp::Ne => Ok(a != b),
            _ => Err(VariableError::TypeMismatch {
                expected: VarType::Float,
                found: if is_numeric(a) { b.type_name() } else { a.type_name() },
            }),
        },
    }
}

impl<W> Determine<W> for Compare
where
    W: WorldMut + 'static,
{
    fn evaluate(&mut self, ctx: &mut NodeCtx<'_, W>) -> Result<bool, NodeFault> {
        let left = ctx.read(&self.left)?;
        let right = ctx.read(&self.right)?;
        Ok(compare_values(self.op, &left, &right)?)
    }

    fn visit_fields(&mut self, visit: &mut dyn FnMut(&'static str, &mut VarField)) {
        visit("left", &mut self.left);
        visit("right", &mut self.right);
    }
}

/// Copies `value` into `target`, with the target's coercion rules.
#[derive(Debug, Clone, PartialEq)]
pub struct SetVariable {
    pub target: VarField,
    pub value: VarField,
}

impl SetVariable {
    pub fn new(target: VarField, value: impl Into<VarField>) -> Self {
        Self {
            target,
            value: value.into(),
        }
    }
}

impl<W> Action<W> for SetVariable
where
    W: WorldMut + 'static,
{
    fn start(&mut self, ctx: &mut NodeCtx<'_, W>) -> Result<ActionStatus, NodeFault> {
        let value = ctx.read(&self.value)?;
        ctx.write(&self.target, value)?;
        Ok(ActionStatus::Success)
    }

    fn visit_fields(&mut self, visit: &mut dyn FnMut(&'static str, &mut VarField)) {
        visit("target", &mut self.target);
        visit("value", &mut self.value);
    }
}

/// Succeeds once `seconds` of tick time have passed.
#[derive(Debug, Clone, PartialEq)]
pub struct Wait {
    pub seconds: VarField,
    remaining: f32,
}

impl Wait {
    pub fn new(seconds: impl Into<VarField>) -> Self {
        Self {
            seconds: seconds.into(),
            remaining: 0.0,
        }
    }

    fn count_down(&mut self, dt: f32) -> ActionStatus {
        self.remaining -= dt;
        if self.remaining <= 0.0 {
            ActionStatus::Success
        } else {
            ActionStatus::Running
        }
    }
}

impl<W> Action<W> for Wait
where
    W: WorldMut + 'static,
{
    fn start(&mut self, ctx: &mut NodeCtx<'_, W>) -> Result<ActionStatus, NodeFault> {
        self.remaining = ctx.read_float(&self.seconds)?;
        if self.remaining <= 0.0 {
            return Ok(ActionStatus::Success);
        }
        Ok(ActionStatus::Running)
    }

    fn update(&mut self, ctx: &mut NodeCtx<'_, W>) -> Result<ActionStatus, NodeFault> {
        Ok(self.count_down(ctx.tick().dt_seconds))
    }

    fn fixed_update(&mut self, ctx: &mut NodeCtx<'_, W>) -> Result<ActionStatus, NodeFault> {
        Ok(self.count_down(ctx.tick().dt_seconds))
    }

    fn late_update(&mut self, ctx: &mut NodeCtx<'_, W>) -> Result<ActionStatus, NodeFault> {
        Ok(self.count_down(ctx.tick().dt_seconds))
    }

    fn visit_fields(&mut self, visit: &mut dyn FnMut(&'static str, &mut VarField)) {
        visit("seconds", &mut self.seconds);
    }
}
