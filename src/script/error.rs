//! Script-visible errors.

use std::fmt;

/// Category of a script error, mirroring the runtime's exception classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptErrorKind {
    TypeError,
    ValueError,
    IndexError,
    KeyError,
    AttributeError,
    RuntimeError,
}

impl ScriptErrorKind {
    pub fn name(self) -> &'static str {
        match self {
            ScriptErrorKind::TypeError => "TypeError",
            ScriptErrorKind::ValueError => "ValueError",
            ScriptErrorKind::IndexError => "IndexError",
            ScriptErrorKind::KeyError => "KeyError",
            ScriptErrorKind::AttributeError => "AttributeError",
            ScriptErrorKind::RuntimeError => "RuntimeError",
        }
    }
}

impl fmt::Display for ScriptErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A pending script error with its chain of causes.
///
/// The most recent (outermost) error is the head; each cause is the error
/// that was pending when it was raised. Displayed as the head message
/// followed by one indented line per cause:
///
/// ```text
/// SetAttr: Failed to convert property 'Speed' (IntProperty)
///   Nativize: Cannot nativize 'str' as 'IntProperty'
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptError {
    pub kind: ScriptErrorKind,
    pub message: String,
    pub cause: Option<Box<ScriptError>>,
}

impl ScriptError {
    pub fn new(kind: ScriptErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            cause: None,
        }
    }

    /// Number of errors in the chain, this one included.
    pub fn depth(&self) -> usize {
        self.causes().count() + 1
    }

    /// Causes, innermost last.
    pub fn causes(&self) -> impl Iterator<Item = &ScriptError> {
        std::iter::successors(self.cause.as_deref(), |e| e.cause.as_deref())
    }

    /// The innermost error of the chain.
    pub fn root(&self) -> &ScriptError {
        self.causes().last().unwrap_or(self)
    }

    /// Drop causes beyond `max` chain entries.
    pub(crate) fn truncate(&mut self, max: usize) {
        let mut remaining = max.saturating_sub(1);
        let mut current = self;
        loop {
            if remaining == 0 {
                current.cause = None;
                return;
            }
            match current.cause.as_deref_mut() {
                Some(next) => current = next,
                None => return,
            }
            remaining -= 1;
        }
    }
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        for cause in self.causes() {
            write!(f, "\n  {}", cause.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ScriptError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> ScriptError {
        let inner = ScriptError::new(ScriptErrorKind::TypeError, "Nativize: bad");
        let mut outer = ScriptError::new(ScriptErrorKind::TypeError, "SetAttr: failed");
        outer.cause = Some(Box::new(inner));
        outer
    }

    #[test]
    fn display_indents_causes() {
        assert_eq!(chain().to_string(), "SetAttr: failed\n  Nativize: bad");
        assert_eq!(chain().depth(), 2);
        assert_eq!(chain().root().message, "Nativize: bad");
    }

    #[test]
    fn truncate_keeps_head() {
        let mut err = chain();
        err.truncate(1);
        assert_eq!(err.depth(), 1);
        assert_eq!(err.message, "SetAttr: failed");
    }
}
