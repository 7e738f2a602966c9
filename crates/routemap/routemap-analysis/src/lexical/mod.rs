//! Lexical classification: every byte of a source file is code, comment, or
//! string, and the resulting spans tile the file exactly.

pub mod classifier;
pub mod lines;
pub mod span;

pub use classifier::LexicalClassifier;
pub use lines::LineIndex;
pub use span::{Classification, CommentStyle, Span, SpanKind};
