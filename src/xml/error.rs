/// Why tokenizing stopped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseErrorKind {
    #[error("empty document")]
    Empty,
    #[error("document is not UTF-8")]
    NotUtf8,
    #[error("malformed XML, expecting <")]
    ExpectedOpen,
    #[error("expecting <")]
    ExpectedTag,
    #[error("unexpected <")]
    UnexpectedLt,
    #[error("unclosed comment")]
    UnclosedComment,
    #[error("unclosed processing tag")]
    UnclosedProcessing,
    #[error("unexpected close of tag")]
    UnexpectedClose,
    #[error("missing tag name")]
    MissingName,
    #[error("</{close}> mismatches <{open}>")]
    TagMismatch { close: String, open: String },
    #[error("unclosed close tag {0}")]
    UnclosedCloseTag(String),
    #[error("not expecting {found} after {tag}")]
    BadSelfClose { found: String, tag: String },
    #[error("was not expecting = after {0}")]
    UnexpectedEquals(String),
    #[error("was expecting \" after {0}")]
    ExpectedQuote(String),
    #[error("unclosed attribute {0}")]
    UnclosedAttribute(String),
    #[error("stray > found outside tag")]
    StrayGt,
    #[error("{0} cannot contain both text and tags")]
    MixedContent(String),
    #[error("unexpected content at top level: {0}")]
    TopLevelContent(String),
    #[error("document has no root tag")]
    NoRoot,
    #[error("internal error: no progress parsing {0}")]
    NoProgress(String),
}

/// Fatal tokenizer error: where in which document, and why.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Error parsing {title} @{offset}: {kind}")]
pub struct ParseError {
    pub title: String,
    pub offset: usize,
    pub kind: ParseErrorKind,
}

/// Target type of a typed attribute read, for error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Float,
    Int,
    Bool,
    Hex,
}

impl std::fmt::Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ValueType::Float => "a float",
            ValueType::Int => "an int",
            ValueType::Bool => "boolean",
            ValueType::Hex => "a hex uint64",
        })
    }
}

/// Failed navigation or extraction. `path` is the slash-joined chain of tag
/// names leading to the offending tag or key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WalkError {
    #[error("expecting {expected} tag, got {path}")]
    UnexpectedTag { expected: String, path: String },
    #[error("{path} tag has no child tag called {child}")]
    NoChild { path: String, child: String },
    #[error("cannot go up from root {path}")]
    AtRoot { path: String },
    #[error("{key} not found in {path} tag")]
    KeyNotFound { key: String, path: String },
    #[error("expecting key {path} to have a value")]
    MissingValue { path: String },
    #[error("{path} is not {expected}: {value:?}")]
    BadValue {
        path: String,
        value: String,
        expected: ValueType,
    },
    #[error("expecting tag {path} to have data")]
    NoData { path: String },
    #[error("tag {path} has nested tags, cannot extract data")]
    NestedData { path: String },
}

impl WalkError {
    pub fn path(&self) -> &str {
        match self {
            WalkError::UnexpectedTag { path, .. }
            | WalkError::NoChild { path, .. }
            | WalkError::AtRoot { path }
            | WalkError::KeyNotFound { path, .. }
            | WalkError::MissingValue { path }
            | WalkError::BadValue { path, .. }
            | WalkError::NoData { path }
            | WalkError::NestedData { path } => path,
        }
    }
}
