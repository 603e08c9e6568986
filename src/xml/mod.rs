//! Minimal XML tokenizer and a read-only cursor over its token tree.
//!
//! Supports tags, attributes with double-quoted values, comments and
//! processing instructions (both skipped), and per-tag content that is either
//! text or nested tags, never both. No DTDs, namespaces or entity expansion;
//! entities stay as literal text.
//!
//! Known gap: when the input ends right after a token, the parser does not
//! check that the root tag (or any other open tag) was closed.

pub mod error;
pub mod parser;
pub mod token;
pub mod walker;

pub use error::{ParseError, ParseErrorKind, ValueType, WalkError};
pub use parser::Document;
pub use token::{TokenId, TokenKind, TokenRef};
pub use walker::{DEFAULT_KEY, Traversal, Walker};
