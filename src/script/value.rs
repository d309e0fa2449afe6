//! Script-side values.

use std::fmt;
use std::rc::Rc;

use crate::bridge::Bridge;
use crate::error::BridgeResult;
use crate::types::WrapperTypeId;
use crate::wrapper::Wrapper;

type CallableFn = dyn Fn(&mut Bridge, &[ScriptValue]) -> BridgeResult<ScriptValue>;

/// A script function value.
///
/// Clones share the same function; equality is identity.
#[derive(Clone)]
pub struct ScriptCallable {
    name: Rc<str>,
    func: Rc<CallableFn>,
}

impl ScriptCallable {
    pub fn new(
        name: &str,
        func: impl Fn(&mut Bridge, &[ScriptValue]) -> BridgeResult<ScriptValue> + 'static,
    ) -> Self {
        Self {
            name: Rc::from(name),
            func: Rc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, bridge: &mut Bridge, args: &[ScriptValue]) -> BridgeResult<ScriptValue> {
        (self.func)(bridge, args)
    }

    pub fn ptr_eq(&self, other: &ScriptCallable) -> bool {
        Rc::ptr_eq(&self.func, &other.func)
    }
}

impl fmt::Debug for ScriptCallable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<function {}>", self.name)
    }
}

/// A value owned by the script runtime.
#[derive(Debug, Clone, Default)]
pub enum ScriptValue {
    #[default]
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Tuple(Vec<ScriptValue>),
    List(Vec<ScriptValue>),
    /// Key/value pairs in insertion order.
    Dict(Vec<(ScriptValue, ScriptValue)>),
    /// Wrapper around native storage.
    Wrapper(Wrapper),
    /// A wrapper type object.
    Type(WrapperTypeId),
    Callable(ScriptCallable),
}

impl ScriptValue {
    /// Script type name used in diagnostics.
    pub fn type_name(&self) -> String {
        match self {
            ScriptValue::None => "NoneType".to_string(),
            ScriptValue::Bool(_) => "bool".to_string(),
            ScriptValue::Int(_) => "int".to_string(),
            ScriptValue::Float(_) => "float".to_string(),
            ScriptValue::Str(_) => "str".to_string(),
            ScriptValue::Tuple(_) => "tuple".to_string(),
            ScriptValue::List(_) => "list".to_string(),
            ScriptValue::Dict(_) => "dict".to_string(),
            ScriptValue::Wrapper(w) => w.type_name(),
            ScriptValue::Type(_) => "type".to_string(),
            ScriptValue::Callable(_) => "function".to_string(),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, ScriptValue::None)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            ScriptValue::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match *self {
            ScriptValue::Int(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match *self {
            ScriptValue::Float(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScriptValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_wrapper(&self) -> Option<&Wrapper> {
        match self {
            ScriptValue::Wrapper(w) => Some(w),
            _ => None,
        }
    }

    /// Items of a list or tuple.
    pub fn as_sequence(&self) -> Option<&[ScriptValue]> {
        match self {
            ScriptValue::List(v) | ScriptValue::Tuple(v) => Some(v),
            _ => None,
        }
    }

    /// Script truthiness.
    pub fn truthy(&self) -> bool {
        match self {
            ScriptValue::None => false,
            ScriptValue::Bool(b) => *b,
            ScriptValue::Int(i) => *i != 0,
            ScriptValue::Float(f) => *f != 0.0,
            ScriptValue::Str(s) => !s.is_empty(),
            ScriptValue::Tuple(v) | ScriptValue::List(v) => !v.is_empty(),
            ScriptValue::Dict(d) => !d.is_empty(),
            _ => true,
        }
    }
}

impl PartialEq for ScriptValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ScriptValue::None, ScriptValue::None) => true,
            (ScriptValue::Bool(a), ScriptValue::Bool(b)) => a == b,
            (ScriptValue::Int(a), ScriptValue::Int(b)) => a == b,
            (ScriptValue::Float(a), ScriptValue::Float(b)) => a == b,
            (ScriptValue::Str(a), ScriptValue::Str(b)) => a == b,
            (ScriptValue::Tuple(a), ScriptValue::Tuple(b)) | (ScriptValue::List(a), ScriptValue::List(b)) => a == b,
            (ScriptValue::Dict(a), ScriptValue::Dict(b)) => a == b,
            (ScriptValue::Wrapper(a), ScriptValue::Wrapper(b)) => a.ptr_eq(b),
            (ScriptValue::Type(a), ScriptValue::Type(b)) => a == b,
            (ScriptValue::Callable(a), ScriptValue::Callable(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

/// Script `repr` form, used in key errors.
impl fmt::Display for ScriptValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, items: &[ScriptValue]) -> fmt::Result {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{item}")?;
            }
            Ok(())
        }

        match self {
            ScriptValue::None => f.write_str("None"),
            ScriptValue::Bool(true) => f.write_str("True"),
            ScriptValue::Bool(false) => f.write_str("False"),
            ScriptValue::Int(i) => write!(f, "{i}"),
            ScriptValue::Float(v) if v.fract() == 0.0 && v.is_finite() => write!(f, "{v:.1}"),
            ScriptValue::Float(v) => write!(f, "{v}"),
            ScriptValue::Str(s) => write!(f, "'{s}'"),
            ScriptValue::Tuple(items) => {
                f.write_str("(")?;
                join(f, items)?;
                if items.len() == 1 {
                    f.write_str(",")?;
                }
                f.write_str(")")
            }
            ScriptValue::List(items) => {
                f.write_str("[")?;
                join(f, items)?;
                f.write_str("]")
            }
            ScriptValue::Dict(entries) => {
                f.write_str("{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_str("}")
            }
            ScriptValue::Wrapper(w) => match (w.name_value(), w.text_value()) {
                (Some(name), _) => write!(f, "'{name}'"),
                (_, Some(text)) => write!(f, "'{text}'"),
                _ => write!(f, "<{} wrapper>", w.type_name()),
            },
            ScriptValue::Type(id) => write!(f, "<type {id}>"),
            ScriptValue::Callable(c) => write!(f, "{c:?}"),
        }
    }
}

impl From<bool> for ScriptValue {
    fn from(v: bool) -> Self {
        ScriptValue::Bool(v)
    }
}

impl From<i64> for ScriptValue {
    fn from(v: i64) -> Self {
        ScriptValue::Int(v)
    }
}

impl From<i32> for ScriptValue {
    fn from(v: i32) -> Self {
        ScriptValue::Int(i64::from(v))
    }
}

impl From<f64> for ScriptValue {
    fn from(v: f64) -> Self {
        ScriptValue::Float(v)
    }
}

impl From<&str> for ScriptValue {
    fn from(v: &str) -> Self {
        ScriptValue::Str(v.to_string())
    }
}

impl From<String> for ScriptValue {
    fn from(v: String) -> Self {
        ScriptValue::Str(v)
    }
}

impl From<Wrapper> for ScriptValue {
    fn from(v: Wrapper) -> Self {
        ScriptValue::Wrapper(v)
    }
}

impl From<Vec<ScriptValue>> for ScriptValue {
    fn from(v: Vec<ScriptValue>) -> Self {
        ScriptValue::List(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_names() {
        assert_eq!(ScriptValue::None.type_name(), "NoneType");
        assert_eq!(ScriptValue::from(3).type_name(), "int");
        assert_eq!(ScriptValue::from("x").type_name(), "str");
        assert_eq!(ScriptValue::Dict(Vec::new()).type_name(), "dict");
    }

    #[test]
    fn truthiness() {
        assert!(!ScriptValue::None.truthy());
        assert!(!ScriptValue::from(0).truthy());
        assert!(ScriptValue::from(vec![ScriptValue::None]).truthy());
        assert!(!ScriptValue::from("").truthy());
    }

    #[test]
    fn repr_form() {
        let value = ScriptValue::Dict(vec![("a".into(), ScriptValue::Tuple(vec![1.into()]))]);
        assert_eq!(value.to_string(), "{'a': (1,)}");
        assert_eq!(ScriptValue::List(vec![2.0.into(), true.into(), ScriptValue::None]).to_string(), "[2.0, True, None]");
    }

    #[test]
    fn callables_compare_by_identity() {
        let a = ScriptCallable::new("a", |_, _| Ok(ScriptValue::None));
        let b = ScriptCallable::new("a", |_, _| Ok(ScriptValue::None));
        assert_eq!(ScriptValue::Callable(a.clone()), ScriptValue::Callable(a.clone()));
        assert_ne!(ScriptValue::Callable(a), ScriptValue::Callable(b));
    }
}
