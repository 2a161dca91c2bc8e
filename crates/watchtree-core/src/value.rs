//! Dynamic values stored in observed trees.
//!
//! A [`Value`] is either a leaf (null, boolean, number, string, function)
//! or a [`Container`]. Containers are shared handles, so cloning a
//! `Value::Container` clones the handle, never the contents.

use std::fmt;
use std::rc::Rc;

use crate::container::Container;

/// Name of an own property on a container.
///
/// Sequences use decimal index keys (`"0"`, `"1"`, ...).
pub type Key = String;

/// An opaque callable leaf.
///
/// Functions are never traversed into by the flattener. Two functions
/// compare equal only if they share the same underlying closure.
#[derive(Clone)]
pub struct Function {
    name: Rc<str>,
    call: Rc<dyn Fn(&[Value]) -> Value>,
}

impl Function {
    /// Wrap a closure as a function value.
    pub fn new(name: impl Into<Rc<str>>, call: impl Fn(&[Value]) -> Value + 'static) -> Self {
        Self {
            name: name.into(),
            call: Rc::new(call),
        }
    }

    /// Name given at construction, used only for display.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invoke the function.
    pub fn call(&self, args: &[Value]) -> Value {
        (self.call)(args)
    }

    /// Returns `true` if both handles share the same closure.
    pub fn ptr_eq(&self, other: &Function) -> bool {
        Rc::ptr_eq(&self.call, &other.call)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Function({})", self.name)
    }
}

/// A node value in an observed tree.
#[derive(Clone, Default)]
pub enum Value {
    /// Absent value.
    #[default]
    Null,
    /// Boolean leaf.
    Bool(bool),
    /// Numeric leaf.
    Number(f64),
    /// String leaf.
    String(String),
    /// Callable leaf. Not traversed.
    Function(Function),
    /// Mapping or sequence. Traversed by the flattener.
    Container(Container),
}

impl Value {
    /// Returns `true` for mappings and sequences.
    pub fn is_container(&self) -> bool {
        matches!(self, Self::Container(_))
    }

    /// Borrow the container handle, if this value is one.
    pub fn as_container(&self) -> Option<&Container> {
        match self {
            Self::Container(c) => Some(c),
            _ => None,
        }
    }

    /// Numeric payload, if this value is a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// String payload, if this value is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Short type name, for diagnostics and logs.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Function(_) => "function",
            Self::Container(c) => c.kind().as_str(),
        }
    }
}

/// Leaves compare by value; containers and functions compare by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Function(a), Self::Function(b)) => a.ptr_eq(b),
            (Self::Container(a), Self::Container(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "Null"),
            Self::Bool(b) => write!(f, "Bool({b})"),
            Self::Number(n) => write!(f, "Number({n})"),
            Self::String(s) => write!(f, "String({s:?})"),
            Self::Function(func) => func.fmt(f),
            // Shallow: containers may be cyclic.
            Self::Container(c) => c.fmt(f),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Number(f64::from(v))
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::Number(f64::from(v))
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Function> for Value {
    fn from(v: Function) -> Self {
        Self::Function(v)
    }
}

impl From<Container> for Value {
    fn from(v: Container) -> Self {
        Self::Container(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaves_compare_by_value() {
        assert_eq!(Value::from(1), Value::Number(1.0));
        assert_eq!(Value::from("x"), Value::String("x".into()));
        assert_ne!(Value::from(0), Value::from(false));
        assert_eq!(Value::from(None::<i32>), Value::Null);
    }

    #[test]
    fn containers_compare_by_identity() {
        let a = Container::map();
        let b = Container::map();
        assert_eq!(Value::from(a.clone()), Value::from(a));
        assert_ne!(Value::from(Container::map()), Value::from(b));
    }

    #[test]
    fn functions_compare_by_identity() {
        let f = Function::new("noop", |_| Value::Null);
        let g = Function::new("noop", |_| Value::Null);
        assert_eq!(Value::from(f.clone()), Value::from(f.clone()));
        assert_ne!(Value::from(f), Value::from(g));
    }

    #[test]
    fn function_call_and_debug() {
        let double = Function::new("double", |args| {
            Value::from(args[0].as_f64().unwrap_or(0.0) * 2.0)
        });
        assert_eq!(double.call(&[Value::from(4)]), Value::from(8));
        assert_eq!(format!("{:?}", Value::from(double)), "Function(double)");
    }

    #[test]
    fn type_names() {
        assert_eq!(Value::Null.type_name(), "null");
        assert_eq!(Value::from(Container::seq()).type_name(), "seq");
        assert_eq!(Value::from(Container::map()).type_name(), "map");
    }
}
