use serde::{Deserialize, Serialize};

/// What the engine does at a flagged location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FixMode {
    /// Remove the `async` modifier and rewrite every method-scope return.
    #[default]
    #[serde(rename = "rewrite")]
    RemoveAsyncAndWrap,

    /// Leave the method alone and fence it with a scoped `#pragma warning disable`.
    #[serde(rename = "suppress")]
    SuppressOnly,
}

impl FixMode {
    pub fn as_str(self) -> &'static str {
        match self {
            FixMode::RemoveAsyncAndWrap => "rewrite",
            FixMode::SuppressOnly => "suppress",
        }
    }
}

/// Which `return` statements inside a flagged method are rewritten.
///
/// Control-flow blocks (`if`, `for`, `try`, ...) always belong to the method's own scope. The
/// policy only decides what happens to lambdas, anonymous methods and local functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NestedReturns {
    #[default]
    TopLevel,
    All,
}
