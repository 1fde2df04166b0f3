//! The interface to a bottom-up reasoner for positive programs.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use aspify_syntax::*;

#[derive(Debug, Error)]
pub enum ReasonerError {
    #[error("unable to read data source `{}`: {source}", path.display())]
    DataSource { path: PathBuf, source: io::Error },
    #[error("line {line} of `{}` does not have {arity} columns", path.display())]
    MalformedRow {
        path: PathBuf,
        line: usize,
        arity: usize,
    },
    #[error("predicate `{0}` depends negatively on itself")]
    Unstratifiable(Predicate),
    #[error("existential variable `{0}` can not be materialized")]
    Existential(Symbol),
    #[error("unsafe variable `{0}`")]
    UnsafeVariable(Symbol),
    #[error("{0}")]
    Other(String),
}

/// A reasoner materializes the consequences of a (stratifiable)
/// knowledge base, and answers queries against them. The grounder
/// only ever calls [`reason`](Reasoner::reason) once, on the
/// over-approximating program, before it starts asking questions.
pub trait Reasoner {
    /// Load `kb` and compute its consequences, replacing any that
    /// were computed before.
    fn reason(&mut self, kb: &KnowledgeBase) -> Result<(), ReasonerError>;

    /// All tuples of constants that match `query`, one per answer,
    /// with one constant for each argument of `query`. Constant
    /// arguments must match exactly; a variable that occurs more than
    /// once must be bound to the same constant each time.
    fn answer_query(&self, query: &Application<Term>) -> Result<Vec<Vec<Constant>>, ReasonerError>;
}

impl<R: Reasoner + ?Sized> Reasoner for Box<R> {
    fn reason(&mut self, kb: &KnowledgeBase) -> Result<(), ReasonerError> {
        (**self).reason(kb)
    }

    fn answer_query(&self, query: &Application<Term>) -> Result<Vec<Vec<Constant>>, ReasonerError> {
        (**self).answer_query(query)
    }
}
