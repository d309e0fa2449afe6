//! Script runtime state the bridge talks to: the pending error slot and
//! module attribute tables.

use rustc_hash::FxHashMap;

use super::{ScriptError, ScriptErrorKind, ScriptValue};

/// Attribute table of one script module.
#[derive(Debug, Clone, Default)]
pub struct ScriptModule {
    name: String,
    attributes: FxHashMap<String, ScriptValue>,
}

impl ScriptModule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: FxHashMap::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, attribute: &str) -> Option<&ScriptValue> {
        self.attributes.get(attribute)
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Attribute names, sorted.
    pub fn attribute_names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.attributes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Error slot and module tables of the script runtime.
///
/// # Error Slot
///
/// At most one error is pending. Raising an error while one is pending
/// chains the pending error as the cause of the new one, so the head is
/// always the outermost context.
///
/// # Module Tables
///
/// Generated wrapper types are published as module attributes. Every
/// change marks the module dirty; the host drains the dirty set with
/// [`take_dirty_modules`](Self::take_dirty_modules) to refresh its own
/// view of the module.
#[derive(Debug)]
pub struct ScriptRuntime {
    error: Option<ScriptError>,
    modules: FxHashMap<String, ScriptModule>,
    dirty: Vec<String>,
    max_error_chain: usize,
}

impl ScriptRuntime {
    pub fn new(max_error_chain: usize) -> Self {
        Self {
            error: None,
            modules: FxHashMap::default(),
            dirty: Vec::new(),
            max_error_chain: max_error_chain.max(1),
        }
    }

    // ==========================================================================
    // Error slot
    // ==========================================================================

    /// Raise an error, chaining any pending error as its cause.
    pub fn set_error(&mut self, kind: ScriptErrorKind, message: impl Into<String>) {
        let mut error = ScriptError::new(kind, message);
        error.cause = self.error.take().map(Box::new);
        error.truncate(self.max_error_chain);
        self.error = Some(error);
    }

    pub fn error(&self) -> Option<&ScriptError> {
        self.error.as_ref()
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn take_error(&mut self) -> Option<ScriptError> {
        self.error.take()
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    /// Log the pending error line by line and clear it.
    ///
    /// Returns the formatted error, if one was pending.
    pub fn log_error(&mut self) -> Option<String> {
        let error = self.error.take()?;
        let formatted = format!("{}: {}", error.kind, error);
        for line in formatted.lines() {
            tracing::error!("{line}");
        }
        Some(formatted)
    }

    // ==========================================================================
    // Module tables
    // ==========================================================================

    pub fn module(&self, name: &str) -> Option<&ScriptModule> {
        self.modules.get(name)
    }

    /// Look up a module attribute.
    pub fn attribute(&self, module: &str, attribute: &str) -> Option<&ScriptValue> {
        self.modules.get(module)?.get(attribute)
    }

    /// Set a module attribute, creating the module if needed.
    pub fn set_attribute(&mut self, module: &str, attribute: impl Into<String>, value: ScriptValue) {
        self.modules
            .entry(module.to_string())
            .or_insert_with(|| ScriptModule::new(module))
            .attributes
            .insert(attribute.into(), value);
        self.mark_dirty(module);
    }

    /// Remove a module attribute.
    pub fn remove_attribute(&mut self, module: &str, attribute: &str) -> Option<ScriptValue> {
        let removed = self.modules.get_mut(module)?.attributes.remove(attribute);
        if removed.is_some() {
            self.mark_dirty(module);
        }
        removed
    }

    pub fn mark_dirty(&mut self, module: &str) {
        if !self.dirty.iter().any(|m| m == module) {
            self.dirty.push(module.to_string());
        }
    }

    /// Drain modules changed since the last call, in first-change order.
    pub fn take_dirty_modules(&mut self) -> Vec<String> {
        std::mem::take(&mut self.dirty)
    }
}

impl Default for ScriptRuntime {
    fn default() -> Self {
        Self::new(16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_chain_outermost_first() {
        let mut runtime = ScriptRuntime::default();
        runtime.set_error(ScriptErrorKind::TypeError, "Nativize: Cannot nativize 'str' as 'IntProperty'");
        runtime.set_error(ScriptErrorKind::TypeError, "SetAttr: Failed to convert property 'Speed'");

        let err = runtime.error().unwrap();
        assert_eq!(err.depth(), 2);
        assert_eq!(
            err.to_string(),
            "SetAttr: Failed to convert property 'Speed'\n  Nativize: Cannot nativize 'str' as 'IntProperty'"
        );
    }

    #[test]
    fn chain_depth_is_bounded() {
        let mut runtime = ScriptRuntime::new(3);
        for i in 0..10 {
            runtime.set_error(ScriptErrorKind::RuntimeError, format!("level {i}"));
        }
        assert_eq!(runtime.error().unwrap().depth(), 3);
        assert_eq!(runtime.error().unwrap().message, "level 9");
    }

    #[test]
    fn log_error_clears_slot() {
        let mut runtime = ScriptRuntime::default();
        assert!(runtime.log_error().is_none());
        runtime.set_error(ScriptErrorKind::ValueError, "bad value");
        assert_eq!(runtime.log_error().as_deref(), Some("ValueError: bad value"));
        assert!(!runtime.has_error());
    }

    #[test]
    fn attribute_changes_mark_dirty() {
        let mut runtime = ScriptRuntime::default();
        runtime.set_attribute("Game", "Car", ScriptValue::Int(1));
        runtime.set_attribute("Game", "Road", ScriptValue::Int(2));
        runtime.set_attribute("Other", "X", ScriptValue::None);
        assert_eq!(runtime.take_dirty_modules(), vec!["Game".to_string(), "Other".to_string()]);
        assert!(runtime.take_dirty_modules().is_empty());

        assert!(runtime.remove_attribute("Game", "Missing").is_none());
        assert!(runtime.take_dirty_modules().is_empty());
        assert_eq!(runtime.remove_attribute("Game", "Car"), Some(ScriptValue::Int(1)));
        assert_eq!(runtime.take_dirty_modules(), vec!["Game".to_string()]);
        assert_eq!(runtime.module("Game").unwrap().attribute_names(), vec!["Road"]);
    }
}
