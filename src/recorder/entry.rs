//! What a caller hands to the recorder for one entry
//!
//! Values are rendered to JSON when they are attached, so a value that cannot
//! be rendered fails at the call site with `GrumbleError::Render`.

use serde::Serialize;
use serde_json::Value;
use std::backtrace::Backtrace;
use std::collections::BTreeMap;

use crate::errors::GrumbleResult;

/// Marker for names that stay out of the locals snapshot
pub const INTERNAL_NAME_PREFIX: &str = "__";

// =============================================================================
// ENTRY
// =============================================================================

/// One grumble: message plus whatever context the caller wants on file
#[derive(Debug, Clone, Default)]
pub struct Grumble {
    pub message: Option<String>,
    pub category: Option<String>,
    pub tag: Option<String>,
    pub state: Option<Value>,
    pub error: Option<ErrorSnapshot>,
    pub context: Option<CallContext>,
}

impl Grumble {
    pub fn new(message: impl Into<String>) -> Self {
        Self::default().message(message)
    }

    /// Entry without a message; the context still gets written
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into()).filter(|m| !m.is_empty());
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into()).filter(|c| !c.is_empty());
        self
    }

    /// Extra file name segment, to split or diff related logs
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into()).filter(|t| !t.is_empty());
        self
    }

    /// Attach state; null and empty strings, arrays or objects leave no section
    pub fn state<S: Serialize + ?Sized>(mut self, state: &S) -> GrumbleResult<Self> {
        self.state = Some(serde_json::to_value(state)?).filter(|value| !is_blank(value));
        Ok(self)
    }

    /// Attach an error the caller is currently handling
    pub fn error(mut self, error: ErrorSnapshot) -> Self {
        self.error = Some(error);
        self
    }

    pub fn context(mut self, context: CallContext) -> Self {
        self.context = Some(context);
        self
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

// =============================================================================
// ERROR SNAPSHOT
// =============================================================================

/// Description of an in-flight error
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorSnapshot {
    pub type_name: String,
    /// `Debug` rendering
    pub value: String,
    /// `Display` rendering
    pub text: String,
    /// Structured extras; by default the `source()` chain
    pub attributes: Value,
}

impl ErrorSnapshot {
    pub fn capture<E>(error: &E) -> Self
    where
        E: std::error::Error + 'static,
    {
        let mut snapshot = Self::from_dyn(error);
        snapshot.type_name = std::any::type_name::<E>().to_string();
        snapshot
    }

    /// Snapshot of a type-erased error; the type name is not recoverable
    pub fn from_dyn(error: &(dyn std::error::Error + 'static)) -> Self {
        let mut sources = Vec::new();
        let mut current = error.source();
        while let Some(source) = current {
            sources.push(Value::String(source.to_string()));
            current = source.source();
        }

        let mut attributes = serde_json::Map::new();
        attributes.insert("sources".to_string(), Value::Array(sources));

        Self {
            type_name: "dyn std::error::Error".to_string(),
            value: format!("{:?}", error),
            text: error.to_string(),
            attributes: Value::Object(attributes),
        }
    }

    pub fn with_attribute<S: Serialize + ?Sized>(
        mut self,
        name: &str,
        value: &S,
    ) -> GrumbleResult<Self> {
        let value = serde_json::to_value(value)?;
        if let Value::Object(map) = &mut self.attributes {
            map.insert(name.to_string(), value);
        }
        Ok(self)
    }
}

// =============================================================================
// CALL CONTEXT
// =============================================================================

/// Named values visible to the caller, in name order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextSnapshot {
    values: BTreeMap<String, Value>,
}

impl ContextSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<S: Serialize + ?Sized>(&mut self, name: &str, value: &S) -> GrumbleResult<()> {
        self.values.insert(name.to_string(), serde_json::to_value(value)?);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values that belong in the log (internal names dropped)
    pub fn visible(&self) -> BTreeMap<&str, &Value> {
        self.values
            .iter()
            .filter(|(name, _)| !name.starts_with(INTERNAL_NAME_PREFIX))
            .map(|(name, value)| (name.as_str(), value))
            .collect()
    }
}

/// Where the call came from: stack text plus a locals snapshot
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallContext {
    pub traceback: String,
    pub locals: ContextSnapshot,
}

impl CallContext {
    /// Capture the current stack, regardless of `RUST_BACKTRACE`
    pub fn capture() -> Self {
        Self::with_traceback(Backtrace::force_capture().to_string())
    }

    pub fn with_traceback(traceback: impl Into<String>) -> Self {
        Self {
            traceback: traceback.into(),
            locals: ContextSnapshot::new(),
        }
    }

    pub fn local<S: Serialize + ?Sized>(mut self, name: &str, value: &S) -> GrumbleResult<Self> {
        self.locals.insert(name, value)?;
        Ok(self)
    }
}

/// Capture a `CallContext` with the named locals
///
/// ```rust
/// let retries = 3;
/// let host = "db-1";
/// let ctx = grumble::call_context!(retries, host).unwrap();
/// assert_eq!(ctx.locals.len(), 2);
/// ```
#[macro_export]
macro_rules! call_context {
    ($($name:ident),* $(,)?) => {{
        let context = $crate::recorder::CallContext::capture();
        (|| -> $crate::errors::GrumbleResult<$crate::recorder::CallContext> {
            #[allow(unused_mut)]
            let mut context = context;
            $( context = context.local(stringify!($name), &$name)?; )*
            Ok(context)
        })()
    }};
}
