//! Ground the non-stratifiable part of a knowledge base into the
//! ASPIF exchange format read by an external answer set solver.
//!
//! The pipeline is: find the predicates that bottom-up reasoning
//! cannot decide ([`Analysis`]), rewrite the rules that define them
//! into a monotone over-approximation ([`Approximation`]), let a
//! positive [`Reasoner`] materialize that, and finally instantiate the
//! original rules with the over-approximated bindings
//! ([`GroundingTemplate`]) into a ground program ([`AspifGrounder`]).

mod approximate;
mod aspif;
mod groundable;
mod materialize;
mod precedence;
mod reasoner;
mod registry;
mod safety;
mod template;

use std::collections::{BTreeMap, BTreeSet};
use std::io;

use thiserror::Error;

use aspify_syntax::*;

// Re-exports.
pub use approximate::Approximation;
pub use aspif::{AspifGrounder, AspifWriter};
pub use groundable::Groundable;
pub use materialize::{Materializer, Model};
pub use precedence::{Analysis, PrecedenceGraph};
pub use reasoner::{Reasoner, ReasonerError};
pub use registry::{IdMap, Registry};
pub use safety::Safety;
pub use template::{GroundRule, GroundingTemplate};

/// Map variable names to constant values (in order to ground them).
pub type Bindings = BTreeMap<Symbol, Constant>;

/// A set of variable names.
pub type Names = BTreeSet<Symbol>;

/// Things that may go wrong during grounding.
#[derive(Debug, Error)]
pub enum GroundingError {
    #[error("unsafe variable: `{0}` does not appear in any positive body literal of `{1}`")]
    UnsafeVariable(Symbol, Rule<Term>),
    #[error("unbound variable `{0}`")]
    UnboundVariable(Symbol),
    #[error("variable `{variable}` of `{literal}` is not bound by the driving query `{query}`")]
    UncoveredVariable {
        variable: Symbol,
        literal: Literal<Term>,
        query: Application<Term>,
    },
    #[error("answer {answer:?} does not fit the driving query `{query}`")]
    AnswerArity {
        answer: Vec<Constant>,
        query: Application<Term>,
    },
    #[error("ran out of atom identifiers after {0} atoms")]
    IdsExhausted(usize),
    #[error("unable to write ground program: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Reasoner(#[from] ReasonerError),
}
