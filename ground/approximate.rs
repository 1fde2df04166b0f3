//! Rewrite a knowledge base into a monotone over-approximation.
//!
//! Every rule with an over-approximated head predicate is split in two:
//!
//! ```text
//! __frontier_n(X1, ..., Xk) :- <the rule's body, less negated approximated literals>.
//! <the rule's head> :- __frontier_n(X1, ..., Xk).
//! ```
//!
//! where `n` is the rule's position in the knowledge base and the `Xi`
//! are its distinct body variables. Dropping negated literals can only
//! make the frontier larger, so its materialized extension contains
//! every binding under which the rule might fire in any stable model.
//! Negated literals over predicates that are _not_ approximated are
//! already decided exactly by the reasoner, and so are kept.

use std::collections::BTreeMap;

use aspify_syntax::*;
use aspify_tracer::*;

use super::{Analysis, GroundingError, Safety};

#[derive(Clone, Debug)]
pub struct Approximation {
    program: KnowledgeBase,
    frontiers: BTreeMap<usize, Application<Term>>,
}

impl Approximation {
    pub fn new(
        kb: &KnowledgeBase,
        analysis: &Analysis,
        trace: Trace,
    ) -> Result<Self, GroundingError> {
        let mut program = KnowledgeBase::default();
        let mut frontiers = BTreeMap::new();
        for (i, statement) in kb.iter().enumerate() {
            let rule = match statement {
                Statement::Rule(rule)
                    if rule
                        .head
                        .iter()
                        .any(|l| analysis.is_approximated(&l.predicate())) =>
                {
                    rule
                }
                _ => {
                    program.push(statement.clone());
                    continue;
                }
            };
            rule.check_safety()?;

            let frontier = Application::new(
                Symbol::new(format!("__frontier_{i}")),
                rule.body_variables().into_iter().map(Term::Variable),
            );
            let body = rule
                .body
                .iter()
                .filter(|l| l.is_positive() || !analysis.is_approximated(&l.predicate()))
                .cloned()
                .collect::<Vec<_>>();
            if body.is_empty() {
                // No body variables either, since the rule is safe.
                program.push(GroundAtom::new(frontier.predicate.clone(), []));
            } else {
                program.push(Rule::new([Literal::Positive(frontier.clone())], body));
            }
            program.push(Rule::new(
                rule.head.iter().cloned(),
                [Literal::Positive(frontier.clone())],
            ));
            frontiers.insert(i, frontier);
        }

        trace!(trace, Rewrite, "Over-approximation:\n{program}");
        Ok(Self { program, frontiers })
    }

    /// The rewritten knowledge base, to be materialized by a reasoner.
    pub fn program(&self) -> &KnowledgeBase {
        &self.program
    }

    /// The frontier atom for the `i`-th statement of the original
    /// knowledge base, if that statement was rewritten.
    pub fn frontier(&self, i: usize) -> Option<&Application<Term>> {
        self.frontiers.get(&i)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn rewrite(text: &str) -> Approximation {
        let kb = parse_program(text).expect("parse");
        let analysis = Analysis::new(&kb, Trace::none());
        Approximation::new(&kb, &analysis, Trace::none()).expect("rewrite")
    }

    #[test]
    fn untouched() {
        let text = "p1 :- p2.\np2 :- p1.\nt(1).\n";
        let approximation = rewrite(text);
        assert_eq!(approximation.program().to_string(), text);
        assert_eq!(approximation.frontier(0), None);
    }

    #[test]
    fn frontier_rules() {
        let approximation = rewrite(
            "d(1). d(2). e(1).
             a(X) :- d(X), not b(X), not e(X).
             b(X) :- d(X), not a(X).",
        );
        assert_eq!(
            approximation.program().to_string(),
            "d(1).\nd(2).\ne(1).\n\
             __frontier_3(X) :- d(X), not e(X).\n\
             a(X) :- __frontier_3(X).\n\
             __frontier_4(X) :- d(X).\n\
             b(X) :- __frontier_4(X).\n"
        );
        let frontier: Application<Term> = atom!(__frontier_3(var!(X)));
        assert_eq!(approximation.frontier(3), Some(&frontier));
    }

    #[test]
    fn variable_order() {
        let approximation = rewrite("h(Y) :- p(X, Y), q(Z, X), not h(Z).");
        let frontier: Application<Term> = atom!(__frontier_0(var!(X), var!(Y), var!(Z)));
        assert_eq!(approximation.frontier(0), Some(&frontier));
    }

    #[test]
    fn nullary_frontier() {
        let approximation = rewrite("a :- not b. b :- not a.");
        assert_eq!(
            approximation.program().to_string(),
            "__frontier_0.\na :- __frontier_0.\n__frontier_1.\nb :- __frontier_1.\n"
        );
    }

    #[test]
    fn unsafe_rule() {
        let kb = parse_program("a(X) :- not a(X).").expect("parse");
        let analysis = Analysis::new(&kb, Trace::none());
        assert!(matches!(
            Approximation::new(&kb, &analysis, Trace::none()),
            Err(GroundingError::UnsafeVariable(..))
        ));
    }
}
