//! Compiled plans for instantiating a rule from the answers to its
//! frontier query.

use std::fmt;

use aspify_syntax::*;

use super::{GroundingError, Registry};

/// Where an argument of a ground literal comes from.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Slot {
    /// The rule's own constant.
    Constant(Constant),
    /// A position in the answer tuple.
    Answer(usize),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LiteralTemplate {
    literal: Literal<Term>,
    slots: Vec<Slot>,
}

impl LiteralTemplate {
    fn new(literal: &Literal<Term>, query: &Application<Term>) -> Result<Self, GroundingError> {
        let slots = literal
            .atom()
            .arguments
            .iter()
            .map(|term| match term {
                Term::Constant(c) => Ok(Slot::Constant(c.clone())),
                Term::Variable(v) | Term::Existential(v) => query
                    .arguments
                    .iter()
                    .position(|t| t.variable() == Some(v))
                    .map(Slot::Answer)
                    .ok_or_else(|| GroundingError::UncoveredVariable {
                        variable: v.clone(),
                        literal: literal.clone(),
                        query: query.clone(),
                    }),
            })
            .collect::<Result<_, _>>()?;
        Ok(Self {
            literal: literal.clone(),
            slots,
        })
    }

    fn terms(&self, answer: &[Constant]) -> Vec<Constant> {
        self.slots
            .iter()
            .map(|slot| match slot {
                Slot::Constant(c) => c.clone(),
                Slot::Answer(i) => answer[*i].clone(),
            })
            .collect()
    }

    /// The signed identifier of this literal under `answer`.
    fn instantiate(
        &self,
        answer: &[Constant],
        registry: &mut Registry,
    ) -> Result<i32, GroundingError> {
        registry.id_for(&self.literal, self.terms(answer))
    }
}

/// A normal (non-disjunctive) ground rule over atom identifiers.
#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct GroundRule {
    pub head: i32,
    pub body: Vec<i32>,
}

/// ASPIF rule record: normal head with one atom, normal body.
impl fmt::Display for GroundRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "1 0 1 {} 0 {}", self.head, self.body.len())?;
        for lit in &self.body {
            write!(f, " {lit}")?;
        }
        Ok(())
    }
}

/// For one rule and its driving (frontier) query: a template for every
/// head literal and every body literal whose predicate is
/// over-approximated. The rest of the body is already known to hold
/// for each answer, and is left out.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GroundingTemplate {
    query: Application<Term>,
    heads: Vec<LiteralTemplate>,
    body: Vec<LiteralTemplate>,
}

impl GroundingTemplate {
    pub fn new(
        rule: &Rule<Term>,
        query: &Application<Term>,
        is_approximated: impl Fn(&Predicate) -> bool,
    ) -> Result<Self, GroundingError> {
        let heads = rule
            .head
            .iter()
            .map(|l| LiteralTemplate::new(l, query))
            .collect::<Result<_, _>>()?;
        let body = rule
            .body
            .iter()
            .filter(|l| is_approximated(&l.predicate()))
            .map(|l| LiteralTemplate::new(l, query))
            .collect::<Result<_, _>>()?;
        Ok(Self {
            query: query.clone(),
            heads,
            body,
        })
    }

    /// One ground rule per head literal; a disjunctive head is split
    /// into independent rules that share a body. Identifiers are
    /// registered head first, then body, in rule order.
    pub fn instantiate(
        &self,
        answer: &[Constant],
        registry: &mut Registry,
    ) -> Result<Vec<GroundRule>, GroundingError> {
        if answer.len() != self.query.arguments.len() {
            return Err(GroundingError::AnswerArity {
                answer: answer.to_vec(),
                query: self.query.clone(),
            });
        }
        let heads = self
            .heads
            .iter()
            .map(|t| t.instantiate(answer, registry))
            .collect::<Result<Vec<_>, _>>()?;
        let body = self
            .body
            .iter()
            .map(|t| t.instantiate(answer, registry))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(heads
            .into_iter()
            .map(|head| GroundRule {
                head,
                body: body.clone(),
            })
            .collect())
    }
}
