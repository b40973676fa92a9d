use serde::{Deserialize, Serialize};

/// The awaitable type a method declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Wrapper {
    Task,
    ValueTask,
}

impl Wrapper {
    pub fn type_name(self) -> &'static str {
        match self {
            Wrapper::Task => "Task",
            Wrapper::ValueTask => "ValueTask",
        }
    }

    /// Expression for an awaitable that already finished without a value.
    pub fn completed(self) -> &'static str {
        match self {
            Wrapper::Task => "Task.CompletedTask",
            Wrapper::ValueTask => "ValueTask.CompletedTask",
        }
    }
}

/// Declared return shape of a flagged method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReturnShape {
    /// A synchronous value (`void`, `int`, `IAsyncEnumerable<T>`, ...).
    PlainValue,

    /// `Task<T>` or `ValueTask<T>`; `inner` is the generic argument text.
    WrappedValue { wrapper: Wrapper, inner: String },

    /// `Task` or `ValueTask`.
    WrappedVoid { wrapper: Wrapper },

    /// The declaration could not be read; flag for manual review.
    Unknown,
}

impl ReturnShape {
    pub fn label(&self) -> &'static str {
        match self {
            ReturnShape::PlainValue => "plain_value",
            ReturnShape::WrappedValue { .. } => "wrapped_value",
            ReturnShape::WrappedVoid { .. } => "wrapped_void",
            ReturnShape::Unknown => "unknown",
        }
    }

    pub fn wrapper(&self) -> Option<Wrapper> {
        match self {
            ReturnShape::WrappedValue { wrapper, .. } | ReturnShape::WrappedVoid { wrapper } => {
                Some(*wrapper)
            }
            ReturnShape::PlainValue | ReturnShape::Unknown => None,
        }
    }
}
