//! A trait to describe elements that may be grounded.

use aspify_syntax::*;

use super::{Bindings, GroundingError};

/// Syntactic elements that contain variables can be _grounded_, where we
/// replace variables with the values that they are bound to. This trait
/// performs the replacements for a particular set of [`Bindings`]; it does
/// _not_ attempt to describe how to choose them. That is the job of a
/// [`Reasoner`](crate::Reasoner) or a [`GroundingTemplate`](crate::GroundingTemplate).
pub trait Groundable {
    type Ground;
    type Error;

    /// Perform the bindings in [`Bindings`] and return a grounded element.
    fn ground_with(&self, bindings: &Bindings) -> Result<Self::Ground, Self::Error>;

    /// Convenience method: ground with an empty set of bindings.
    fn ground(&self) -> Result<Self::Ground, Self::Error> {
        self.ground_with(&Bindings::new())
    }
}

impl Groundable for Term {
    type Ground = Constant;
    type Error = GroundingError;

    fn ground_with(&self, bindings: &Bindings) -> Result<Self::Ground, Self::Error> {
        match self {
            Term::Constant(c) => Ok(c.clone()),
            Term::Variable(name) | Term::Existential(name) => bindings
                .get(name)
                .cloned()
                .ok_or_else(|| GroundingError::UnboundVariable(name.clone())),
        }
    }
}

impl Groundable for Application<Term> {
    type Ground = GroundAtom;
    type Error = GroundingError;

    fn ground_with(&self, bindings: &Bindings) -> Result<Self::Ground, Self::Error> {
        Ok(Self::Ground {
            predicate: self.predicate.clone(),
            arguments: self
                .arguments
                .iter()
                .map(|arg| arg.ground_with(bindings))
                .collect::<Result<_, _>>()?,
        })
    }
}

impl Groundable for Literal<Term> {
    type Ground = Literal<Constant>;
    type Error = GroundingError;

    fn ground_with(&self, bindings: &Bindings) -> Result<Self::Ground, Self::Error> {
        use Literal::*;
        match self {
            Positive(a) => Ok(Positive(a.ground_with(bindings)?)),
            Negative(a) => Ok(Negative(a.ground_with(bindings)?)),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ground_literal() {
        let bindings = Bindings::from([(sym!(X), Constant::from("d"))]);
        let literal: Literal<Term> = neg!(p(var!(X), "c"));
        assert_eq!(
            literal.ground_with(&bindings).ok(),
            Some(Literal::Negative(atom!(p("d", "c"))))
        );
    }

    #[test]
    fn unbound() {
        let literal: Literal<Term> = pos!(p(var!(Y)));
        assert!(matches!(
            literal.ground(),
            Err(GroundingError::UnboundVariable(v)) if v == sym!(Y)
        ));
        let atom: Application<Term> = atom!(q(1, "a"));
        assert_eq!(atom.ground().ok(), Some(atom!(q(1, "a"))));
    }
}
