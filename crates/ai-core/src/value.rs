use std::any::Any;
use std::fmt;
use std::rc::Rc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::VariableError;

/// Declared type of a variable slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum VarType {
    Int,
    Float,
    Bool,
    String,
    Vector2,
    Vector3,
    /// Opaque host object.
    Object,
    /// Untyped slot; adopts whatever is written.
    Generic,
}

impl VarType {
    pub fn default_value(self) -> Value {
        match self {
            VarType::Int => Value::Int(0),
            VarType::Float => Value::Float(0.0),
            VarType::Bool => Value::Bool(false),
            VarType::String => Value::String(String::new()),
            VarType::Vector2 => Value::Vector2(Vec2::ZERO),
            VarType::Vector3 => Value::Vector3(Vec3::ZERO),
            VarType::Object | VarType::Generic => Value::Null,
        }
    }
}

impl fmt::Display for VarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VarType::Int => "int",
            VarType::Float => "float",
            VarType::Bool => "bool",
            VarType::String => "string",
            VarType::Vector2 => "vector2",
            VarType::Vector3 => "vector3",
            VarType::Object => "object",
            VarType::Generic => "generic",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn extend(self, z: f32) -> Vec3 {
        Vec3::new(self.x, self.y, z)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn truncate(self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

/// Reference to a host-owned object (entity handle, component, asset, ...).
///
/// Equality is identity. Cloning shares the same object; the interpreter treats it as immutable.
#[derive(Clone)]
pub struct HostObject(Rc<dyn Any>);

impl HostObject {
    pub fn new<T: Any>(value: T) -> Self {
        Self(Rc::new(value))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }
}

impl PartialEq for HostObject {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for HostObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostObject({:p})", Rc::as_ptr(&self.0))
    }
}

/// A typed scalar or vector value held by a variable or a constant field.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Value {
    #[default]
    Null,
    Int(i32),
    Float(f32),
    Bool(bool),
    String(String),
    Vector2(Vec2),
    Vector3(Vec3),
    #[cfg_attr(feature = "serde", serde(skip))]
    Object(HostObject),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::String(_) => "string",
            Value::Vector2(_) => "vector2",
            Value::Vector3(_) => "vector3",
            Value::Object(_) => "object",
        }
    }

    /// Convert `self` for storage in a slot of type `target`.
    ///
    /// Numeric and bool values convert into each other (`true` is 1, any nonzero number is
    /// `true`, floats truncate toward zero), vectors project between 2D and 3D (z is dropped or
    /// zero-filled). Everything else must already match.
    pub fn coerce(self, target: VarType) -> Result<Value, VariableError> {
        let mismatch = |v: &Value| VariableError::TypeMismatch {
            expected: target,
            found: v.type_name(),
        };

        let out = match (target, self) {
            (VarType::Generic, v) => v,

            (VarType::Int, Value::Int(i)) => Value::Int(i),
            (VarType::Int, Value::Float(f)) => Value::Int(f as i32),
            (VarType::Int, Value::Bool(b)) => Value::Int(b as i32),

            (VarType::Float, Value::Float(f)) => Value::Float(f),
            (VarType::Float, Value::Int(i)) => Value::Float(i as f32),
            (VarType::Float, Value::Bool(b)) => Value::Float(if b { 1.0 } else { 0.0 }),

            (VarType::Bool, Value::Bool(b)) => Value::Bool(b),
            (VarType::Bool, Value::Int(i)) => Value::Bool(i != 0),
            (VarType::Bool, Value::Float(f)) => Value::Bool(f != 0.0),

            (VarType::String, Value::String(s)) => Value::String(s),

            (VarType::Vector2, Value::Vector2(v)) => Value::Vector2(v),
            (VarType::Vector2, Value::Vector3(v)) => Value::Vector2(v.truncate()),

            (VarType::Vector3, Value::Vector3(v)) => Value::Vector3(v),
            (VarType::Vector3, Value::Vector2(v)) => Value::Vector3(v.extend(0.0)),

            (VarType::Object, Value::Object(o)) => Value::Object(o),
            (VarType::Object, Value::Null) => Value::Null,

            (_, v) => return Err(mismatch(&v)),
        };
        Ok(out)
    }

    pub fn to_int(&self) -> Result<i32, VariableError> {
        match self.clone().coerce(VarType::Int)? {
            Value::Int(i) => Ok(i),
            other => Err(VariableError::TypeMismatch {
                expected: VarType::Int,
                found: other.type_name(),
            }),
        }
    }

    pub fn to_float(&self) -> Result<f32, VariableError> {
        match self.clone().coerce(VarType::Float)? {
            Value::Float(f) => Ok(f),
            other => Err(VariableError::TypeMismatch {
                expected: VarType::Float,
                found: other.type_name(),
            }),
        }
    }

    pub fn to_bool(&self) -> Result<bool, VariableError> {
        match self.clone().coerce(VarType::Bool)? {
            Value::Bool(b) => Ok(b),
            other => Err(VariableError::TypeMismatch {
                expected: VarType::Bool,
                found: other.type_name(),
            }),
        }
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<Vec2> for Value {
    fn from(value: Vec2) -> Self {
        Value::Vector2(value)
    }
}

impl From<Vec3> for Value {
    fn from(value: Vec3) -> Self {
        Value::Vector3(value)
    }
}

impl From<HostObject> for Value {
    fn from(value: HostObject) -> Self {
        Value::Object(value)
    }
}
