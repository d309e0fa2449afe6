//! Operators on struct wrappers.
//!
//! A struct type gains an operator through static functions tagged with
//! [`SCRIPT_OPERATOR_KEY`] metadata, for example `"+"` or `"*;/"`. The first
//! input parameter must be the struct itself and the second is the right
//! operand. The candidates of one operator form a stack: the right operand
//! is tried silently against each candidate's second parameter in turn and
//! the first that accepts it is called.
//!
//! Equality falls back to a field-wise comparison when no function claims
//! it. In-place forms apply the plain operator and write the result back
//! into the left operand's storage.

use std::fmt;

use scriptbridge_core::{FunctionEntry, PropertyDescriptor, PropertyKind, TypeFlags, TypeHash};

use crate::bridge::Bridge;
use crate::convert::ErrorMode;
use crate::error::{BridgeError, BridgeResult};
use crate::script::ScriptValue;
use crate::types::SCRIPT_OPERATOR_KEY;

use super::Wrapper;

/// Binary operators a struct type can provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptOperator {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl ScriptOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            ScriptOperator::Add => "+",
            ScriptOperator::Sub => "-",
            ScriptOperator::Mul => "*",
            ScriptOperator::Div => "/",
            ScriptOperator::Eq => "==",
            ScriptOperator::Ne => "!=",
            ScriptOperator::Lt => "<",
            ScriptOperator::Le => "<=",
            ScriptOperator::Gt => ">",
            ScriptOperator::Ge => ">=",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        let op = match symbol.trim() {
            "+" => ScriptOperator::Add,
            "-" => ScriptOperator::Sub,
            "*" => ScriptOperator::Mul,
            "/" => ScriptOperator::Div,
            "==" => ScriptOperator::Eq,
            "!=" => ScriptOperator::Ne,
            "<" => ScriptOperator::Lt,
            "<=" => ScriptOperator::Le,
            ">" => ScriptOperator::Gt,
            ">=" => ScriptOperator::Ge,
            _ => return None,
        };
        Some(op)
    }

    /// Comparison operators have no in-place form.
    pub fn is_comparison(self) -> bool {
        !matches!(
            self,
            ScriptOperator::Add | ScriptOperator::Sub | ScriptOperator::Mul | ScriptOperator::Div
        )
    }
}

impl fmt::Display for ScriptOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Check if `function` is tagged as implementing `op` for `struct_type`.
fn implements(function: &FunctionEntry, struct_type: TypeHash, op: ScriptOperator) -> bool {
    let tagged = function
        .metadata(SCRIPT_OPERATOR_KEY)
        .is_some_and(|ops| ops.split(';').any(|s| ScriptOperator::from_symbol(s) == Some(op)));
    if !tagged || !function.is_static() {
        return false;
    }
    let inputs: Vec<_> = function.input_params().collect();
    inputs.len() == 2 && inputs[0].1.kind == PropertyKind::Struct { struct_type }
}

impl Bridge {
    /// Every function implementing `op` for `struct_type`, ordered by
    /// declaring class name then declaration order.
    pub fn operator_functions(&self, struct_type: TypeHash, op: ScriptOperator) -> Vec<FunctionEntry> {
        let mut owners: Vec<_> = self
            .reflection
            .all_types()
            .filter_map(|hash| self.reflection.class(hash))
            .filter(|class| !class.flags.contains(TypeFlags::STALE))
            .collect();
        owners.sort_by(|a, b| a.name.cmp(&b.name));
        owners
            .into_iter()
            .flat_map(|class| class.functions.iter())
            .filter(|function| implements(function, struct_type, op))
            .cloned()
            .collect()
    }

    /// Evaluate `lhs op rhs` where `lhs` is a struct wrapper.
    pub fn binary_op(&mut self, lhs: &ScriptValue, op: ScriptOperator, rhs: &ScriptValue) -> BridgeResult<ScriptValue> {
        let Some(struct_type) = lhs.as_wrapper().and_then(Wrapper::struct_type) else {
            return Err(self.unsupported_operands(lhs, op, rhs));
        };
        for function in self.operator_functions(struct_type, op) {
            let Some((_, operand)) = function.input_params().nth(1) else {
                continue;
            };
            let operand = operand.kind.clone();
            if self.nativize(rhs, &operand, ErrorMode::Silent).is_err() {
                continue;
            }
            tracing::trace!(op = %op, function = %function.name, "operator dispatch");
            return self.call_function(None, &function, &[lhs.clone(), rhs.clone()]);
        }
        match op {
            ScriptOperator::Eq => Ok(ScriptValue::Bool(self.values_identical(lhs, rhs)?)),
            ScriptOperator::Ne => Ok(ScriptValue::Bool(!self.values_identical(lhs, rhs)?)),
            _ => Err(self.unsupported_operands(lhs, op, rhs)),
        }
    }

    /// Evaluate `lhs op= rhs`, updating the struct behind `lhs` in place.
    ///
    /// The write goes through the property layer, so a struct nested in an
    /// object notifies its owner. Returns `lhs`.
    pub fn inplace_op(&mut self, lhs: &ScriptValue, op: ScriptOperator, rhs: &ScriptValue) -> BridgeResult<ScriptValue> {
        if op.is_comparison() {
            return Err(self.unsupported_operands(lhs, op, rhs));
        }
        let result = self.binary_op(lhs, op, rhs)?;
        let Some(wrapper) = lhs.as_wrapper().cloned() else {
            return Err(self.unsupported_operands(lhs, op, rhs));
        };
        let Some(struct_type) = wrapper.struct_type() else {
            return Err(self.unsupported_operands(lhs, op, rhs));
        };
        if result.as_wrapper().and_then(Wrapper::struct_type) != Some(struct_type) {
            return Err(self.report(BridgeError::Call {
                function: format!("{}.{op}=", wrapper.type_name()),
                detail: format!("result '{}' cannot be assigned in place", result.type_name()),
            }));
        }
        let property = PropertyDescriptor::editable(wrapper.type_name(), PropertyKind::Struct { struct_type });
        let addr = wrapper.storage()?;
        self.nativize_property(&result, &property, &addr, &wrapper.owner())?;
        Ok(lhs.clone())
    }

    fn unsupported_operands(&mut self, lhs: &ScriptValue, op: ScriptOperator, rhs: &ScriptValue) -> BridgeError {
        self.report(BridgeError::Call {
            function: format!("operator {op}"),
            detail: format!(
                "unsupported operand type(s): '{}' and '{}'",
                lhs.type_name(),
                rhs.type_name()
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbols_round_trip() {
        for op in [
            ScriptOperator::Add,
            ScriptOperator::Sub,
            ScriptOperator::Mul,
            ScriptOperator::Div,
            ScriptOperator::Eq,
            ScriptOperator::Ne,
            ScriptOperator::Lt,
            ScriptOperator::Le,
            ScriptOperator::Gt,
            ScriptOperator::Ge,
        ] {
            assert_eq!(ScriptOperator::from_symbol(op.symbol()), Some(op));
        }
        assert_eq!(ScriptOperator::from_symbol(" * "), Some(ScriptOperator::Mul));
        assert_eq!(ScriptOperator::from_symbol("%"), None);
        assert!(ScriptOperator::Lt.is_comparison());
        assert!(!ScriptOperator::Div.is_comparison());
    }

    #[test]
    fn tags_must_match_shape() {
        let vector = TypeHash::from_name("Vector");
        let kind = PropertyKind::Struct { struct_type: vector };
        let add = FunctionEntry::new(TypeHash::from_name("VectorMath"), "Add")
            .with_flags(scriptbridge_core::FunctionFlags::STATIC)
            .with_metadata(SCRIPT_OPERATOR_KEY, "+;-")
            .with_param(PropertyDescriptor::param("A", kind.clone()))
            .with_param(PropertyDescriptor::param("B", kind.clone()))
            .with_return(kind.clone());
        assert!(implements(&add, vector, ScriptOperator::Add));
        assert!(implements(&add, vector, ScriptOperator::Sub));
        assert!(!implements(&add, vector, ScriptOperator::Mul));
        assert!(!implements(&add, TypeHash::from_name("Rotator"), ScriptOperator::Add));

        let unary = FunctionEntry::new(TypeHash::from_name("VectorMath"), "Negate")
            .with_flags(scriptbridge_core::FunctionFlags::STATIC)
            .with_metadata(SCRIPT_OPERATOR_KEY, "-")
            .with_param(PropertyDescriptor::param("A", kind.clone()))
            .with_return(kind);
        assert!(!implements(&unary, vector, ScriptOperator::Sub));
    }
}
