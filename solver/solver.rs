//! Drive an external answer set solver (clasp) over a ground program,
//! and read its answer sets back.

mod answer;
mod clasp;

use std::io;

use thiserror::Error;

pub use answer::{AnswerSet, AnswerSetStream, ReasoningState};
pub use clasp::{ClaspConfig, ClaspProcess, Outcome, SolveMode, SolverInput, SolverOutput};

#[derive(Debug, Error)]
pub enum SolverError {
    #[error("unable to start solver `{program}`: {source}")]
    Spawn { program: String, source: io::Error },
    #[error("solver I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("the solver's input has already been closed")]
    InputClosed,
    #[error("the solver output reader panicked")]
    ReaderPanicked,
    #[error("the solver input writer panicked")]
    WriterPanicked,
    #[error("malformed atom `{0}` in solver output")]
    MalformedId(String),
    #[error("solver output ended after an `Answer:` line")]
    TruncatedAnswer,
    #[error("unknown atom identifier {0} in solver output")]
    UnknownId(i32),
}
