//! Calling reflected functions with script arguments.
//!
//! Arguments are bound to the function's input parameters in signature
//! order; missing trailing arguments come from the `CPP_Default_<Param>`
//! metadata. After the call the return slot and the output parameters are
//! packed into one script value: nothing gives `None`, one value is
//! returned as is, more become a tuple.
//!
//! When the first result is a bool and further results follow, the bool
//! gates the call: `false` yields `None`, `true` yields the remaining
//! results. Script implementations are unpacked by the reverse rule.

use scriptbridge_core::layout::default_property_value;
use scriptbridge_core::text::import_text;
use scriptbridge_core::{CallFrame, FunctionEntry, FunctionImpl, NativeError, NativeValue, PropertyDescriptor, PropertyKind};

use crate::bridge::Bridge;
use crate::convert::ErrorMode;
use crate::error::{BridgeError, BridgeResult};
use crate::script::ScriptValue;

use super::Wrapper;

/// Result slots of a function and whether the leading bool gates them.
fn result_slots(function: &FunctionEntry) -> (Vec<(usize, PropertyDescriptor)>, bool) {
    let results: Vec<_> = function
        .result_params()
        .into_iter()
        .map(|(i, p)| (i, p.clone()))
        .collect();
    let gated = results.len() > 1 && results[0].1.kind == PropertyKind::Bool;
    (results, gated)
}

impl Bridge {
    /// Call `function` with script arguments.
    ///
    /// `this` must be an object wrapper unless the function is static.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn call_function(
        &mut self,
        this: Option<&ScriptValue>,
        function: &FunctionEntry,
        args: &[ScriptValue],
    ) -> BridgeResult<ScriptValue> {
        self.call_function_inner(this, function, args).map_err(|e| {
            self.raise_layer(ErrorMode::Set, "Call", format!("Failed to call '{}'", function.name), e)
        })
    }

    fn call_function_inner(
        &mut self,
        this: Option<&ScriptValue>,
        function: &FunctionEntry,
        args: &[ScriptValue],
    ) -> BridgeResult<ScriptValue> {
        let this_handle = if function.is_static() {
            None
        } else {
            let handle = this.and_then(ScriptValue::as_wrapper).and_then(Wrapper::object_handle);
            Some(handle.ok_or_else(|| NativeError::MissingThis {
                function: function.name.clone(),
            })?)
        };

        let mut params = self.bind_arguments(function, args)?;
        match &function.implementation {
            FunctionImpl::Native(native) => {
                let native = native.clone();
                let mut frame = CallFrame::new(params, function.return_index(), this_handle, &mut self.heap);
                native.call(&mut frame)?;
                params = frame.into_params();
            }
            FunctionImpl::Script { slot } => {
                let callable = self
                    .generator
                    .callable(*slot)
                    .ok_or_else(|| BridgeError::internal(format!("no script callable in slot {slot}")))?;
                let mut script_args = Vec::with_capacity(params.len() + 1);
                if let Some(handle) = this_handle {
                    script_args.push(self.wrap_object(handle)?);
                }
                for (index, param) in function.input_params() {
                    script_args.push(self.scriptize_owned(params[index].clone(), &param.kind, ErrorMode::Set)?);
                }
                let result = callable.call(self, &script_args)?;
                self.unpack_return_values(function, &result, &mut params)?;
            }
            FunctionImpl::Abstract => {
                return Err(BridgeError::internal(format!(
                    "function '{}' has no implementation",
                    function.name
                )));
            }
        }
        self.pack_return_values(function, params)
    }

    /// Build the parameter block of a call from positional arguments.
    fn bind_arguments(&mut self, function: &FunctionEntry, args: &[ScriptValue]) -> BridgeResult<Vec<NativeValue>> {
        let inputs: Vec<(usize, PropertyDescriptor)> =
            function.input_params().map(|(i, p)| (i, p.clone())).collect();
        if args.len() > inputs.len() {
            return Err(BridgeError::Call {
                function: function.name.clone(),
                detail: format!("takes {} arguments but {} were given", inputs.len(), args.len()),
            });
        }

        let mut params: Vec<NativeValue> = function
            .params
            .iter()
            .map(|p| default_property_value(p, &self.reflection))
            .collect();
        for (position, (index, param)) in inputs.iter().enumerate() {
            params[*index] = match args.get(position) {
                Some(arg) => self.nativize(arg, &param.kind, ErrorMode::Set).map_err(|e| {
                    self.raise_layer(
                        ErrorMode::Set,
                        "Call",
                        format!("Failed to convert parameter '{}' ({})", param.name, param.kind.kind_name()),
                        e,
                    )
                })?,
                None => match function.metadata(&self.config.default_key(&param.name)) {
                    Some(text) => import_text(text, &param.kind, &self.reflection)?,
                    None => {
                        return Err(BridgeError::Call {
                            function: function.name.clone(),
                            detail: format!("missing required argument '{}'", param.name),
                        });
                    }
                },
            };
        }
        Ok(params)
    }

    /// Pack the return slot and output parameters of a finished call.
    pub fn pack_return_values(&mut self, function: &FunctionEntry, mut params: Vec<NativeValue>) -> BridgeResult<ScriptValue> {
        let (results, gated) = result_slots(function);
        let mut slots = results.as_slice();
        if gated {
            if !matches!(params.get(slots[0].0), Some(NativeValue::Bool(true))) {
                return Ok(ScriptValue::None);
            }
            slots = &slots[1..];
        }

        let mut values = Vec::with_capacity(slots.len());
        for (index, param) in slots {
            let Some(slot) = params.get_mut(*index) else {
                return Err(BridgeError::internal(format!("missing result slot {index}")));
            };
            let value = std::mem::replace(slot, NativeValue::Bool(false));
            values.push(self.scriptize_owned(value, &param.kind, ErrorMode::Set)?);
        }
        Ok(match values.len() {
            0 => ScriptValue::None,
            1 => values.remove(0),
            _ => ScriptValue::Tuple(values),
        })
    }

    /// Write the result of a script implementation back into the return
    /// slot and output parameters.
    pub fn unpack_return_values(
        &mut self,
        function: &FunctionEntry,
        result: &ScriptValue,
        params: &mut [NativeValue],
    ) -> BridgeResult<()> {
        let (results, gated) = result_slots(function);
        let mut slots = results.as_slice();
        if gated {
            let found = !result.is_none();
            params[slots[0].0] = NativeValue::Bool(found);
            if !found {
                return Ok(());
            }
            slots = &slots[1..];
        }

        match slots {
            [] => Ok(()),
            [(index, param)] => {
                params[*index] = self.nativize(result, &param.kind, ErrorMode::Set)?;
                Ok(())
            }
            many => {
                let items = result
                    .as_sequence()
                    .filter(|items| items.len() == many.len())
                    .ok_or_else(|| BridgeError::Call {
                        function: function.name.clone(),
                        detail: format!("expected {} results but got '{}'", many.len(), result.type_name()),
                    })?;
                for ((index, param), item) in many.iter().zip(items) {
                    params[*index] = self.nativize(item, &param.kind, ErrorMode::Set)?;
                }
                Ok(())
            }
        }
    }
}
