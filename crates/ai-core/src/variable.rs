use std::cell::{Ref, RefCell, RefMut};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Value, VarType, VariableError};

/// Stable variable identifier, unique within one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VarId(pub u64);

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A named, typed, mutable slot.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    id: VarId,
    name: String,
    var_type: VarType,
    value: Value,
}

impl Variable {
    pub fn new(id: VarId, name: impl Into<String>, var_type: VarType) -> Self {
        Self {
            id,
            name: name.into(),
            var_type,
            value: var_type.default_value(),
        }
    }

    pub fn with_value(mut self, value: impl Into<Value>) -> Result<Self, VariableError> {
        self.set(value)?;
        Ok(self)
    }

    pub fn id(&self) -> VarId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn var_type(&self) -> VarType {
        self.var_type
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Store `value`, coercing it to this slot's type.
    pub fn set(&mut self, value: impl Into<Value>) -> Result<(), VariableError> {
        self.value = value.into().coerce(self.var_type)?;
        Ok(())
    }
}

/// Id- and name-indexed store of variables.
///
/// Variables live in a dense arena so resolved bindings can hold a plain slot index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableTable {
    slots: Vec<Variable>,
    by_id: BTreeMap<VarId, usize>,
    by_name: BTreeMap<String, usize>,
}

impl VariableTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Add a variable and return its slot.
    pub fn declare(&mut self, variable: Variable) -> Result<usize, VariableError> {
        if self.by_id.contains_key(&variable.id) {
            return Err(VariableError::DuplicateId(variable.id));
        }
        if self.by_name.contains_key(&variable.name) {
            return Err(VariableError::DuplicateName(variable.name));
        }

        let slot = self.slots.len();
        self.by_id.insert(variable.id, slot);
        self.by_name.insert(variable.name.clone(), slot);
        self.slots.push(variable);
        Ok(slot)
    }

    pub fn slot_of(&self, id: VarId) -> Option<usize> {
        self.by_id.get(&id).copied()
    }

    pub fn slot_by_name(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    pub fn slot(&self, slot: usize) -> Option<&Variable> {
        self.slots.get(slot)
    }

    pub fn slot_mut(&mut self, slot: usize) -> Option<&mut Variable> {
        self.slots.get_mut(slot)
    }

    pub fn get(&self, id: VarId) -> Option<&Variable> {
        self.slot_of(id).and_then(|s| self.slots.get(s))
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Variable> {
        self.slot_by_name(name).and_then(|s| self.slots.get(s))
    }

    pub fn set(&mut self, id: VarId, value: impl Into<Value>) -> Result<(), VariableError> {
        let slot = self.slot_of(id).ok_or(VariableError::UnknownId(id))?;
        self.slots[slot].set(value)
    }

    pub fn set_by_name(&mut self, name: &str, value: impl Into<Value>) -> Result<(), VariableError> {
        let slot = self
            .slot_by_name(name)
            .ok_or_else(|| VariableError::UnknownName(name.to_string()))?;
        self.slots[slot].set(value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Variable> {
        self.slots.iter()
    }
}

/// Process-wide variable table.
///
/// An explicit shared handle rather than ambient global state: the host creates one and hands it
/// to every instance that should see it. Cloning the handle shares the table. Single-threaded by
/// design of the tick loop, so there is no locking.
#[derive(Debug, Clone, Default)]
pub struct GlobalVariables(Rc<RefCell<VariableTable>>);

impl GlobalVariables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_table(table: VariableTable) -> Self {
        Self(Rc::new(RefCell::new(table)))
    }

    pub fn declare(&self, variable: Variable) -> Result<usize, VariableError> {
        self.0.borrow_mut().declare(variable)
    }

    pub fn get_by_name(&self, name: &str) -> Option<Value> {
        self.0.borrow().get_by_name(name).map(|v| v.value().clone())
    }

    pub fn set_by_name(&self, name: &str, value: impl Into<Value>) -> Result<(), VariableError> {
        self.0.borrow_mut().set_by_name(name, value)
    }

    pub fn borrow(&self) -> Ref<'_, VariableTable> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, VariableTable> {
        self.0.borrow_mut()
    }

    pub fn same_table(&self, other: &GlobalVariables) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum VarScope {
    Local,
    Global,
}

/// Binding to a variable by id, plus its slot once resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarRef {
    pub scope: VarScope,
    pub id: VarId,
    slot: Option<usize>,
}

impl VarRef {
    pub fn new(scope: VarScope, id: VarId) -> Self {
        Self {
            scope,
            id,
            slot: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.slot.is_some()
    }

    /// Look the id up in the table for this binding's scope. Unknown ids leave the binding
    /// unresolved.
    pub fn resolve(&mut self, locals: &VariableTable, globals: &GlobalVariables) -> bool {
        self.slot = match self.scope {
            VarScope::Local => locals.slot_of(self.id),
            VarScope::Global => globals.borrow().slot_of(self.id),
        };
        self.slot.is_some()
    }

    fn slot(&self) -> Result<usize, VariableError> {
        self.slot.ok_or(VariableError::Unbound(self.id))
    }
}

/// A node field: either a constant or a binding to a variable.
#[derive(Debug, Clone, PartialEq)]
pub enum VarField {
    Const(Value),
    Bound(VarRef),
}

impl VarField {
    pub fn constant(value: impl Into<Value>) -> Self {
        VarField::Const(value.into())
    }

    pub fn local(id: u64) -> Self {
        VarField::Bound(VarRef::new(VarScope::Local, VarId(id)))
    }

    pub fn global(id: u64) -> Self {
        VarField::Bound(VarRef::new(VarScope::Global, VarId(id)))
    }

    pub fn is_constant(&self) -> bool {
        matches!(self, VarField::Const(_))
    }

    /// Resolve a binding. Constants are always resolved.
    pub fn resolve(&mut self, locals: &VariableTable, globals: &GlobalVariables) -> bool {
        match self {
            VarField::Const(_) => true,
            VarField::Bound(r) => r.resolve(locals, globals),
        }
    }

    pub fn binding(&self) -> Option<&VarRef> {
        match self {
            VarField::Const(_) => None,
            VarField::Bound(r) => Some(r),
        }
    }

    pub fn read(&self, locals: &VariableTable, globals: &GlobalVariables) -> Result<Value, VariableError> {
        match self {
            VarField::Const(v) => Ok(v.clone()),
            VarField::Bound(r) => {
                let slot = r.slot()?;
                let value = match r.scope {
                    VarScope::Local => locals.slot(slot).map(|v| v.value().clone()),
                    VarScope::Global => globals.borrow().slot(slot).map(|v| v.value().clone()),
                };
                value.ok_or(VariableError::UnknownId(r.id))
            }
        }
    }

    pub fn write(
        &self,
        locals: &mut VariableTable,
        globals: &GlobalVariables,
        value: impl Into<Value>,
    ) -> Result<(), VariableError> {
        match self {
            VarField::Const(_) => Err(VariableError::ConstantField),
            VarField::Bound(r) => {
                let slot = r.slot()?;
                match r.scope {
                    VarScope::Local => locals
                        .slot_mut(slot)
                        .ok_or(VariableError::UnknownId(r.id))?
                        .set(value),
                    VarScope::Global => globals
                        .borrow_mut()
                        .slot_mut(slot)
                        .ok_or(VariableError::UnknownId(r.id))?
                        .set(value),
                }
            }
        }
    }
}

macro_rules! const_field_from {
    ($($t:ty),*) => {
        $(
            impl From<$t> for VarField {
                fn from(value: $t) -> Self {
                    VarField::Const(value.into())
                }
            }
        )*
    };
}

const_field_from!(Value, i32, f32, bool, &str, String, crate::Vec2, crate::Vec3);
