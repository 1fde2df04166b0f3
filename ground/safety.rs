//! Check that all (universal) variables in a rule are _safe_,
//! i.e., occur in at least one positive body literal.
//!
//! This is totally unrelated to Rust's `unsafe` keyword.

use aspify_syntax::*;

use super::{GroundingError, Names};

pub trait Safety {
    fn check_safety(&self) -> Result<(), GroundingError>;
}

/// Existential head variables are exempt: they are, by definition,
/// not bound by the body.
impl Safety for Rule<Term> {
    fn check_safety(&self) -> Result<(), GroundingError> {
        let bound = self
            .body
            .iter()
            .filter(|l| l.is_positive())
            .flat_map(|l| l.atom().variables())
            .cloned()
            .collect::<Names>();
        let head = self.head.iter().flat_map(|l| {
            l.atom().arguments.iter().filter_map(|t| match t {
                Term::Variable(v) => Some(v),
                _ => None,
            })
        });
        let negative = self
            .body
            .iter()
            .filter(|l| l.is_negative())
            .flat_map(|l| l.atom().variables());
        match head.chain(negative).find(|v| !bound.contains(*v)) {
            Some(v) => Err(GroundingError::UnsafeVariable(v.clone(), self.clone())),
            None => Ok(()),
        }
    }
}
