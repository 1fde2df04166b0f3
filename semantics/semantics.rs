//! Answer set semantics for knowledge bases with non-stratifiable
//! negation: over-approximate, ground, solve, and read back.

mod compiler;

pub use compiler::{format_answer, AnswerResult, AspError, AspifCompiler};
